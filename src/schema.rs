use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[schemars(description = "Point-of-sale activity. Amount is the gross sale total.")]
    Sales,

    #[schemars(description = "Supplier invoices and other outgoing payments. Amount is the invoice total.")]
    Expenses,

    #[schemars(description = "Inventory written off as waste or loss. Amount is the value lost.")]
    Shrinkage,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Sales, Source::Expenses, Source::Shrinkage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Sales => "sales",
            Source::Expenses => "expenses",
            Source::Shrinkage => "shrinkage",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read-only view over one row of the incoming payload.
///
/// Producers disagree on key spelling, so nothing about the field set is
/// assumed here. Items that are not JSON objects expose no fields at all.
#[derive(Debug, Clone, Copy)]
pub struct RawItem<'a> {
    value: &'a Value,
}

impl<'a> RawItem<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    pub fn fields(&self) -> Option<&'a Map<String, Value>> {
        self.value.as_object()
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields().and_then(|fields| fields.get(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.fields().into_iter().flat_map(|fields| fields.iter())
    }

    pub fn as_value(&self) -> &'a Value {
        self.value
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SaleDetails {
    pub responsible: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ExpenseDetails {
    #[schemars(description = "Raw transaction type as received, e.g. 'GASTO'")]
    pub transaction_type: String,
    pub counterparty: Option<String>,
    pub payment_method: Option<String>,
    pub document_subtype: Option<String>,
    pub check_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ShrinkageDetails {
    pub product: Option<String>,
    pub reason: Option<String>,
}

/// Domain-specific attributes. The variant is the record's source tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum RecordDetails {
    Sales(SaleDetails),
    Expenses(ExpenseDetails),
    Shrinkage(ShrinkageDetails),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct NormalizedRecord {
    #[schemars(description = "Branch or location the row came from. 'N/A' unless configured otherwise.")]
    pub local: String,

    #[schemars(description = "Calendar date explicitly present in the raw row")]
    pub date: NaiveDate,

    #[schemars(
        description = "Amount in the record's native currency unit: sale total, invoice total or loss value depending on source"
    )]
    pub amount: f64,

    #[serde(flatten)]
    pub details: RecordDetails,
}

impl NormalizedRecord {
    pub fn source(&self) -> Source {
        match self.details {
            RecordDetails::Sales(_) => Source::Sales,
            RecordDetails::Expenses(_) => Source::Expenses,
            RecordDetails::Shrinkage(_) => Source::Shrinkage,
        }
    }

    pub fn responsible(&self) -> Option<&str> {
        match &self.details {
            RecordDetails::Sales(d) => d.responsible.as_deref(),
            _ => None,
        }
    }

    pub fn payment_method(&self) -> Option<&str> {
        match &self.details {
            RecordDetails::Sales(d) => d.payment_method.as_deref(),
            RecordDetails::Expenses(d) => d.payment_method.as_deref(),
            RecordDetails::Shrinkage(_) => None,
        }
    }

    pub fn counterparty(&self) -> Option<&str> {
        match &self.details {
            RecordDetails::Expenses(d) => d.counterparty.as_deref(),
            _ => None,
        }
    }

    pub fn document_subtype(&self) -> Option<&str> {
        match &self.details {
            RecordDetails::Expenses(d) => d.document_subtype.as_deref(),
            _ => None,
        }
    }

    pub fn check_number(&self) -> Option<&str> {
        match &self.details {
            RecordDetails::Expenses(d) => d.check_number.as_deref(),
            _ => None,
        }
    }

    pub fn product(&self) -> Option<&str> {
        match &self.details {
            RecordDetails::Shrinkage(d) => d.product.as_deref(),
            _ => None,
        }
    }

    pub fn shrinkage_reason(&self) -> Option<&str> {
        match &self.details {
            RecordDetails::Shrinkage(d) => d.reason.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Neither an explicit tag nor any indicator field identified the domain.
    SourceUndetectable,
    /// Expense-sheet row whose transaction type is not an expense (e.g. income).
    IntentionallyExcluded,
    /// No recognizable date in the row.
    InvalidDate,
    /// A field held a value the normalizer could not interpret.
    NormalizationError,
}

impl RejectionKind {
    /// Business-rule exclusions are expected noise, everything else is a data-quality signal.
    pub fn is_data_quality_issue(&self) -> bool {
        !matches!(self, RejectionKind::IntentionallyExcluded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct RejectedRecord {
    #[schemars(description = "0-based position in the flattened input sequence")]
    pub index: usize,
    pub raw: Value,
    pub detected_source: Option<Source>,
    pub kind: RejectionKind,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ValidationWarning {
    pub level: WarningLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_records: Option<usize>,
}

impl ValidationWarning {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarningLevel::Error,
            message: message.into(),
            affected_records: None,
        }
    }

    pub fn warning(message: impl Into<String>, affected_records: Option<usize>) -> Self {
        Self {
            level: WarningLevel::Warning,
            message: message.into(),
            affected_records,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AdapterResult {
    pub records: Vec<NormalizedRecord>,
    pub warnings: Vec<ValidationWarning>,
    pub rejected: Vec<RejectedRecord>,
}

impl AdapterResult {
    pub(crate) fn fatal(message: impl Into<String>) -> Self {
        Self {
            warnings: vec![ValidationWarning::error(message)],
            ..Self::default()
        }
    }

    /// Number of input items this result accounts for.
    pub fn total_items(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    pub fn count_for(&self, source: Source) -> usize {
        self.records.iter().filter(|r| r.source() == source).count()
    }

    pub fn has_fatal_error(&self) -> bool {
        self.warnings.iter().any(|w| w.level == WarningLevel::Error)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AdapterResult)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_expense() -> NormalizedRecord {
        NormalizedRecord {
            local: "Centro".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 12, 18).unwrap(),
            amount: 48_000.0,
            details: RecordDetails::Expenses(ExpenseDetails {
                transaction_type: "GASTO".to_string(),
                counterparty: Some("Distribuidora Sur".to_string()),
                payment_method: Some("Transferencia".to_string()),
                document_subtype: None,
                check_number: None,
            }),
        }
    }

    #[test]
    fn test_source_follows_details_variant() {
        let record = sample_expense();
        assert_eq!(record.source(), Source::Expenses);
        assert_eq!(record.counterparty(), Some("Distribuidora Sur"));
        assert_eq!(record.responsible(), None);
        assert_eq!(record.product(), None);
    }

    #[test]
    fn test_record_serializes_flat_with_source_tag() {
        let json = serde_json::to_value(sample_expense()).unwrap();
        assert_eq!(json["source"], "expenses");
        assert_eq!(json["local"], "Centro");
        assert_eq!(json["date"], "2025-12-18");
        assert_eq!(json["counterparty"], "Distribuidora Sur");

        let back: NormalizedRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample_expense());
    }

    #[test]
    fn test_raw_item_of_non_object_has_no_fields() {
        let value = json!("just a string");
        let item = RawItem::new(&value);
        assert!(item.fields().is_none());
        assert_eq!(item.iter().count(), 0);
        assert!(item.get("local").is_none());
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = AdapterResult::schema_as_json().unwrap();
        assert!(schema_json.contains("records"));
        assert!(schema_json.contains("rejected"));
        assert!(schema_json.contains("warnings"));
    }

    #[test]
    fn test_warning_serialization_omits_missing_count() {
        let json = serde_json::to_value(ValidationWarning::error("boom")).unwrap();
        assert_eq!(json["level"], "error");
        assert!(json.get("affected_records").is_none());
    }
}
