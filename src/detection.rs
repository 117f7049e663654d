use crate::config::DetectionRules;
use crate::schema::{RawItem, Source};
use crate::utils::resolve;
use serde_json::Value;

/// Classifies a raw item into one of the three domains.
///
/// An explicit tag always wins. Without a usable tag, the sale total is
/// checked first, then invoice/counterparty fields, and shrinkage needs both
/// a product and an amount.
pub fn detect_source(raw: RawItem<'_>, rules: &DetectionRules) -> Option<Source> {
    if let Some(source) = resolve(raw, &rules.tag_aliases).and_then(|tag| source_from_tag(tag, rules)) {
        return Some(source);
    }

    if resolve(raw, &rules.sale_total).is_some() {
        return Some(Source::Sales);
    }

    if resolve(raw, &rules.invoice_total).is_some() || resolve(raw, &rules.counterparty).is_some() {
        return Some(Source::Expenses);
    }

    if resolve(raw, &rules.product).is_some() && resolve(raw, &rules.shrinkage_amount).is_some() {
        return Some(Source::Shrinkage);
    }

    None
}

/// Substring-matches a tag value against each domain's tokens, case-insensitively.
pub fn source_from_tag(tag: &Value, rules: &DetectionRules) -> Option<Source> {
    let text = match tag {
        Value::String(s) => s.to_lowercase(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    Source::ALL.into_iter().find(|source| {
        rules
            .tokens_for(*source)
            .iter()
            .filter(|token| !token.is_empty())
            .any(|token| text.contains(&token.to_lowercase()))
    })
}
