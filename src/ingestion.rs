use crate::config::{AdapterConfig, PayloadKeys};
use crate::detection::detect_source;
use crate::normalizers::{normalize, Normalized, UnrecognizedDate};
use crate::schema::{
    AdapterResult, NormalizedRecord, RawItem, RejectedRecord, RejectionKind, Source,
    ValidationWarning,
};
use log::{debug, info, warn};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `{ventas: [...], gastos: [...], merma: [...]}`; the array names the domain.
    Separated,
    /// A bare array of self-identifying items.
    Unified,
    /// `{data: [...]}` wrapping a unified array.
    Wrapped,
}

pub fn detect_shape(payload: &Value, keys: &PayloadKeys) -> Option<PayloadShape> {
    match payload {
        Value::Array(_) => Some(PayloadShape::Unified),
        Value::Object(fields) => {
            let separated = Source::ALL
                .iter()
                .flat_map(|source| keys.keys_for(*source))
                .any(|key| fields.get(key).is_some_and(Value::is_array));

            if separated {
                Some(PayloadShape::Separated)
            } else if fields.get(&keys.wrapped).is_some_and(Value::is_array) {
                Some(PayloadShape::Wrapped)
            } else {
                None
            }
        }
        _ => None,
    }
}

struct FlatItem<'a> {
    value: &'a Value,
    tagged: Option<Source>,
}

fn untagged(items: &[Value]) -> Vec<FlatItem<'_>> {
    items
        .iter()
        .map(|value| FlatItem {
            value,
            tagged: None,
        })
        .collect()
}

/// Flattens the payload into one sequence: sales, then expenses, then shrinkage
/// for the separated shape; input order otherwise. A domain present under several
/// alias keys contributes every one of its arrays, in alias order.
fn flatten<'a>(payload: &'a Value, shape: PayloadShape, keys: &PayloadKeys) -> Vec<FlatItem<'a>> {
    match shape {
        PayloadShape::Separated => Source::ALL
            .iter()
            .flat_map(move |source| {
                let aliases = keys.keys_for(*source);
                aliases
                    .iter()
                    .enumerate()
                    .filter(move |(i, key)| !aliases[..*i].contains(key))
                    .filter_map(move |(_, key)| payload.get(key).and_then(Value::as_array))
                    .map(move |items| (*source, items))
            })
            .flat_map(|(source, items)| {
                items.iter().map(move |value| FlatItem {
                    value,
                    tagged: Some(source),
                })
            })
            .collect(),
        PayloadShape::Unified => payload.as_array().map(|a| untagged(a)).unwrap_or_default(),
        PayloadShape::Wrapped => payload
            .get(&keys.wrapped)
            .and_then(Value::as_array)
            .map(|a| untagged(a))
            .unwrap_or_default(),
    }
}

enum ItemOutcome {
    Accepted(NormalizedRecord),
    Rejected(RejectedRecord),
}

fn reject(
    index: usize,
    raw: &Value,
    detected_source: Option<Source>,
    kind: RejectionKind,
    reason: String,
) -> ItemOutcome {
    warn!("Record #{}: {}", index + 1, reason);
    ItemOutcome::Rejected(RejectedRecord {
        index,
        raw: raw.clone(),
        detected_source,
        kind,
        reason,
    })
}

/// Turns any supported payload into accepted records, rejections and warnings.
///
/// Never fails: a payload that cannot be processed at all, or an invalid
/// configuration, yields one error-level warning and nothing else.
#[derive(Debug, Clone, Default)]
pub struct PayloadAdapter {
    config: AdapterConfig,
}

impl PayloadAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    pub fn with_default_local(default_local: impl Into<String>) -> Self {
        Self::new(AdapterConfig::default().with_default_local(default_local))
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn adapt_str(&self, payload: &str) -> AdapterResult {
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => self.adapt(&value),
            Err(e) => {
                warn!("Payload is not valid JSON: {}", e);
                AdapterResult::fatal(format!("Payload is not valid JSON: {}", e))
            }
        }
    }

    pub fn adapt(&self, payload: &Value) -> AdapterResult {
        if let Err(e) = self.config.validate() {
            warn!("Refusing to adapt payload: {}", e);
            return AdapterResult::fatal(e.to_string());
        }

        if payload.is_null() {
            warn!("Payload is null");
            return AdapterResult::fatal("Payload is null");
        }

        let Some(shape) = detect_shape(payload, &self.config.payload_keys) else {
            warn!("Unknown payload format");
            return AdapterResult::fatal(
                "Unknown payload format. Expected an array, an object with sales/expenses/shrinkage arrays, or an object with a data array.",
            );
        };

        let items = flatten(payload, shape, &self.config.payload_keys);
        info!("Detected {:?} payload with {} item(s)", shape, items.len());

        if items.is_empty() {
            return AdapterResult {
                warnings: vec![ValidationWarning::warning("Payload contained no records", None)],
                ..AdapterResult::default()
            };
        }

        let (records, rejected) = items
            .iter()
            .enumerate()
            .map(|(index, item)| self.process_item(index, item))
            .fold(
                (Vec::new(), Vec::new()),
                |(mut records, mut rejected), outcome| {
                    match outcome {
                        ItemOutcome::Accepted(record) => records.push(record),
                        ItemOutcome::Rejected(rejection) => rejected.push(rejection),
                    }
                    (records, rejected)
                },
            );

        let warnings = summarize_rejections(&rejected);
        let result = AdapterResult {
            records,
            warnings,
            rejected,
        };

        info!(
            "Normalized {} record(s): {} sales, {} expenses, {} shrinkage; {} rejected",
            result.records.len(),
            result.count_for(Source::Sales),
            result.count_for(Source::Expenses),
            result.count_for(Source::Shrinkage),
            result.rejected.len()
        );

        result
    }

    fn process_item(&self, index: usize, item: &FlatItem<'_>) -> ItemOutcome {
        let raw = RawItem::new(item.value);

        let detected = if item.value.is_object() {
            item.tagged
                .or_else(|| detect_source(raw, &self.config.detection))
        } else {
            None
        };

        let Some(source) = detected else {
            return reject(
                index,
                item.value,
                None,
                RejectionKind::SourceUndetectable,
                "source undetectable: no source tag and no sales, expenses or shrinkage key fields"
                    .to_string(),
            );
        };

        let pending = match normalize(source, raw, &self.config) {
            Ok(Normalized::Pending(pending)) => pending,
            Ok(Normalized::Excluded { transaction_type }) => {
                return reject(
                    index,
                    item.value,
                    Some(source),
                    RejectionKind::IntentionallyExcluded,
                    format!(
                        "expense-domain row tagged as income (transaction type \"{}\"), intentionally excluded",
                        transaction_type
                    ),
                );
            }
            Err(e) => {
                return reject(
                    index,
                    item.value,
                    Some(source),
                    RejectionKind::NormalizationError,
                    format!("normalization error: {}", e),
                );
            }
        };

        match pending.into_record() {
            Ok(record) => {
                if record.amount == 0.0 {
                    warn!("Record #{}: amount is 0", index + 1);
                }
                debug!("Record #{}: accepted as {}", index + 1, source);
                ItemOutcome::Accepted(record)
            }
            Err(UnrecognizedDate { raw: raw_date }) => reject(
                index,
                item.value,
                Some(source),
                RejectionKind::InvalidDate,
                format!("invalid or missing date: received \"{}\"", raw_date),
            ),
        }
    }
}

/// One summary warning per high-level cause: undetected source, everything else.
fn summarize_rejections(rejected: &[RejectedRecord]) -> Vec<ValidationWarning> {
    let undetected = rejected
        .iter()
        .filter(|r| r.kind == RejectionKind::SourceUndetectable)
        .count();
    let failed = rejected.len() - undetected;

    let mut warnings = Vec::new();
    if undetected > 0 {
        warnings.push(ValidationWarning::warning(
            format!("{} record(s) skipped: no source detected", undetected),
            Some(undetected),
        ));
    }
    if failed > 0 {
        warnings.push(ValidationWarning::warning(
            format!("{} record(s) could not be processed", failed),
            Some(failed),
        ));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::WarningLevel;
    use serde_json::json;

    #[test]
    fn test_detect_shape() {
        let keys = PayloadKeys::default();
        assert_eq!(detect_shape(&json!([]), &keys), Some(PayloadShape::Unified));
        assert_eq!(detect_shape(&json!({"ventas": []}), &keys), Some(PayloadShape::Separated));
        assert_eq!(detect_shape(&json!({"expenses": []}), &keys), Some(PayloadShape::Separated));
        assert_eq!(detect_shape(&json!({"data": []}), &keys), Some(PayloadShape::Wrapped));
        assert_eq!(detect_shape(&json!({"ventas": "x"}), &keys), None);
        assert_eq!(detect_shape(&json!({"data": {}}), &keys), None);
        assert_eq!(detect_shape(&json!("text"), &keys), None);
    }

    #[test]
    fn test_separated_shape_wins_over_data_key() {
        let keys = PayloadKeys::default();
        let payload = json!({"data": [], "merma": []});
        assert_eq!(detect_shape(&payload, &keys), Some(PayloadShape::Separated));
    }

    #[test]
    fn test_separated_flatten_order_is_sales_expenses_shrinkage() {
        let payload = json!({
            "merma": [{"id": 5}],
            "gastos": [{"id": 3}, {"id": 4}],
            "ventas": [{"id": 1}, {"id": 2}]
        });
        let items = flatten(&payload, PayloadShape::Separated, &PayloadKeys::default());
        let ids: Vec<i64> = items.iter().map(|i| i.value["id"].as_i64().unwrap()).collect();
        let tags: Vec<Option<Source>> = items.iter().map(|i| i.tagged).collect();

        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            tags,
            vec![
                Some(Source::Sales),
                Some(Source::Sales),
                Some(Source::Expenses),
                Some(Source::Expenses),
                Some(Source::Shrinkage)
            ]
        );
    }

    #[test]
    fn test_separated_array_tag_overrides_item_content() {
        let payload = json!({
            "merma": [{"date": "18/12/2025", "Total Venta": "900", "MONTO": "100"}]
        });
        let result = PayloadAdapter::default().adapt(&payload);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].source(), Source::Shrinkage);
        assert_eq!(result.records[0].amount, 100.0);
    }

    #[test]
    fn test_null_and_unknown_payloads_are_fatal() {
        let adapter = PayloadAdapter::default();
        for payload in [json!(null), json!(42), json!({"foo": []})] {
            let result = adapter.adapt(&payload);
            assert!(result.records.is_empty());
            assert!(result.rejected.is_empty());
            assert_eq!(result.warnings.len(), 1);
            assert_eq!(result.warnings[0].level, WarningLevel::Error);
        }
    }

    #[test]
    fn test_invalid_json_text_is_fatal() {
        let result = PayloadAdapter::default().adapt_str("{\"ventas\": [");
        assert!(result.has_fatal_error());
        assert!(result.warnings[0].message.contains("not valid JSON"));
    }

    #[test]
    fn test_empty_payload_is_a_notice_not_an_error() {
        let result = PayloadAdapter::default().adapt(&json!({"ventas": [], "gastos": []}));
        assert_eq!(result.total_items(), 0);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].level, WarningLevel::Warning);
    }

    #[test]
    fn test_warnings_group_undetected_and_other_failures() {
        let payload = json!([
            {"foo": 1},
            {"bar": 2},
            {"source": "gastos", "Tipo": "INGRESO"},
            {"source": "ventas", "date": "sin fecha"},
            {"source": "ventas", "date": "18/12/2025", "Total Venta": "10"}
        ]);
        let result = PayloadAdapter::default().adapt(&payload);

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.rejected.len(), 4);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.warnings[0].affected_records, Some(2));
        assert_eq!(result.warnings[1].affected_records, Some(2));
    }

    #[test]
    fn test_non_object_items_are_undetectable() {
        let result = PayloadAdapter::default().adapt(&json!(["hola", 7, null]));
        assert_eq!(result.rejected.len(), 3);
        assert!(result
            .rejected
            .iter()
            .all(|r| r.kind == RejectionKind::SourceUndetectable));
        assert_eq!(result.rejected[1].raw, json!(7));
    }

    #[test]
    fn test_non_object_items_in_named_arrays_are_undetectable() {
        let payload = json!({
            "ventas": [42, {"date": "18/12/2025", "Total Venta": "1"}],
            "gastos": [null],
            "merma": ["Pan"]
        });
        let result = PayloadAdapter::default().adapt(&payload);

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.rejected.len(), 3);
        let indices: Vec<usize> = result.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 2, 3]);
        for rejection in &result.rejected {
            assert_eq!(rejection.kind, RejectionKind::SourceUndetectable);
            assert_eq!(rejection.detected_source, None);
        }
        assert_eq!(result.rejected[1].raw, Value::Null);
    }

    #[test]
    fn test_every_alias_array_of_a_domain_is_read() {
        let payload = json!({
            "sales": [{"date": "19/12/2025", "Total Venta": "2"}],
            "ventas": [{"date": "18/12/2025", "Total Venta": "1"}],
            "gastos": [{"date": "18/12/2025", "Tipo": "Gasto", "Total Factura": "3"}]
        });
        let items = flatten(&payload, PayloadShape::Separated, &PayloadKeys::default());
        assert_eq!(items.len(), 3);

        let result = PayloadAdapter::default().adapt(&payload);
        assert_eq!(result.total_items(), 3);
        assert!(result.rejected.is_empty());
        let amounts: Vec<f64> = result.records.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_repeated_alias_key_is_read_once() {
        let keys = PayloadKeys {
            sales: vec!["ventas".to_string(), "ventas".to_string()],
            ..PayloadKeys::default()
        };
        let payload = json!({"ventas": [{"id": 1}]});
        assert_eq!(flatten(&payload, PayloadShape::Separated, &keys).len(), 1);
    }

    #[test]
    fn test_invalid_config_in_code_is_fatal() {
        let config = AdapterConfig {
            expense_marker: String::new(),
            ..AdapterConfig::default()
        };
        let payload = json!({"gastos": [
            {"date": "18/12/2025", "Tipo": "INGRESO", "Total Factura": "9.000"}
        ]});
        let result = PayloadAdapter::new(config).adapt(&payload);

        assert!(result.records.is_empty());
        assert!(result.rejected.is_empty());
        assert!(result.has_fatal_error());
        assert!(result.warnings[0].message.contains("expense_marker"));
    }

    #[test]
    fn test_internal_error_is_isolated_to_its_item() {
        let payload = json!({"ventas": [
            {"date": "18/12/2025", "Total Venta": {"oops": true}},
            {"date": "19/12/2025", "Total Venta": "5.000"}
        ]});
        let result = PayloadAdapter::default().adapt(&payload);

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].amount, 5000.0);
        assert_eq!(result.rejected[0].index, 0);
        assert_eq!(result.rejected[0].kind, RejectionKind::NormalizationError);
        assert!(result.rejected[0].reason.contains("sale total"));
    }
}
