use crate::config::AdapterConfig;
use crate::error::{IngestError, Result};
use crate::schema::{
    ExpenseDetails, NormalizedRecord, RawItem, RecordDetails, SaleDetails, ShrinkageDetails,
    Source,
};
use crate::utils::{parse_amount, parse_date, resolve, resolve_text, value_kind, ParsedDate};
use serde_json::Value;

/// A normalized row whose date has not been checked yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub local: String,
    /// Date text exactly as resolved from the row, empty when absent.
    pub raw_date: String,
    pub date: ParsedDate,
    pub amount: f64,
    pub details: RecordDetails,
}

/// The row's date was missing or in no supported format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedDate {
    pub raw: String,
}

impl PendingRecord {
    pub fn into_record(self) -> std::result::Result<NormalizedRecord, UnrecognizedDate> {
        match self.date {
            ParsedDate::Recognized(date) => Ok(NormalizedRecord {
                local: self.local,
                date,
                amount: self.amount,
                details: self.details,
            }),
            ParsedDate::Fallback(_) => Err(UnrecognizedDate { raw: self.raw_date }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Pending(PendingRecord),
    /// Expenses row whose transaction type is not an expense.
    Excluded { transaction_type: String },
}

/// Single dispatch point from a detected source to its normalizer.
pub fn normalize(source: Source, raw: RawItem<'_>, config: &AdapterConfig) -> Result<Normalized> {
    match source {
        Source::Sales => normalize_sales(raw, config).map(Normalized::Pending),
        Source::Expenses => normalize_expenses(raw, config),
        Source::Shrinkage => normalize_shrinkage(raw, config).map(Normalized::Pending),
    }
}

struct CommonFields {
    local: String,
    raw_date: String,
    date: ParsedDate,
}

fn common_fields(raw: RawItem<'_>, config: &AdapterConfig) -> Result<CommonFields> {
    let local = resolve_text(raw, &config.aliases.local, "local")?
        .unwrap_or_else(|| config.default_local.clone());
    let raw_date = resolve_text(raw, &config.aliases.date, "date")?.unwrap_or_default();
    let date = parse_date(&raw_date);

    Ok(CommonFields {
        local,
        raw_date,
        date,
    })
}

fn resolve_amount(raw: RawItem<'_>, aliases: &[String], field: &str) -> Result<f64> {
    match resolve(raw, aliases) {
        None => Ok(0.0),
        Some(value @ (Value::Number(_) | Value::String(_))) => Ok(parse_amount(value)),
        Some(other) => Err(IngestError::UnexpectedValue {
            field: field.to_string(),
            kind: value_kind(other),
        }),
    }
}

pub fn normalize_sales(raw: RawItem<'_>, config: &AdapterConfig) -> Result<PendingRecord> {
    let aliases = &config.aliases;
    let common = common_fields(raw, config)?;
    let amount = resolve_amount(raw, &aliases.sale_total, "sale total")?;

    Ok(PendingRecord {
        local: common.local,
        raw_date: common.raw_date,
        date: common.date,
        amount,
        details: RecordDetails::Sales(SaleDetails {
            responsible: resolve_text(raw, &aliases.responsible, "responsible")?,
            payment_method: resolve_text(raw, &aliases.payment_method, "payment method")?,
        }),
    })
}

/// Only rows whose transaction type contains the expense marker are kept.
pub fn normalize_expenses(raw: RawItem<'_>, config: &AdapterConfig) -> Result<Normalized> {
    let aliases = &config.aliases;
    let transaction_type =
        resolve_text(raw, &aliases.transaction_type, "transaction type")?.unwrap_or_default();

    if !transaction_type
        .to_lowercase()
        .contains(&config.expense_marker.to_lowercase())
    {
        return Ok(Normalized::Excluded { transaction_type });
    }

    let common = common_fields(raw, config)?;
    let amount = resolve_amount(raw, &aliases.invoice_total, "invoice total")?;

    Ok(Normalized::Pending(PendingRecord {
        local: common.local,
        raw_date: common.raw_date,
        date: common.date,
        amount,
        details: RecordDetails::Expenses(ExpenseDetails {
            transaction_type,
            counterparty: resolve_text(raw, &aliases.counterparty, "counterparty")?,
            payment_method: resolve_text(raw, &aliases.payment_method, "payment method")?,
            document_subtype: resolve_text(raw, &aliases.document_subtype, "document subtype")?,
            check_number: resolve_text(raw, &aliases.check_number, "check number")?,
        }),
    }))
}

pub fn normalize_shrinkage(raw: RawItem<'_>, config: &AdapterConfig) -> Result<PendingRecord> {
    let aliases = &config.aliases;
    let common = common_fields(raw, config)?;
    let amount = resolve_amount(raw, &aliases.shrinkage_amount, "shrinkage amount")?;

    Ok(PendingRecord {
        local: common.local,
        raw_date: common.raw_date,
        date: common.date,
        amount,
        details: RecordDetails::Shrinkage(ShrinkageDetails {
            product: resolve_text(raw, &aliases.product, "product")?,
            reason: resolve_text(raw, &aliases.shrinkage_reason, "shrinkage reason")?,
        }),
    })
}
