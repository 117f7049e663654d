use crate::schema::{NormalizedRecord, Source};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Dashboard filter state. Empty lists and `None` mean "no restriction".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Filters {
    pub locales: Vec<String>,
    #[schemars(description = "Inclusive lower bound")]
    pub date_from: Option<NaiveDate>,
    #[schemars(description = "Inclusive upper bound")]
    pub date_to: Option<NaiveDate>,
    #[schemars(description = "Restrict to one domain; absent means all")]
    pub source: Option<Source>,
    #[schemars(description = "Case-insensitive substring over descriptive fields and local")]
    pub search: String,

    pub counterparties: Vec<String>,
    pub expense_payment_methods: Vec<String>,
    pub document_subtypes: Vec<String>,
    pub check_numbers: Vec<String>,

    pub responsibles: Vec<String>,
    pub sales_payment_methods: Vec<String>,

    pub shrinkage_reasons: Vec<String>,
    pub products: Vec<String>,
}

/// A record without the attribute is never excluded by a selection on it.
fn allowed(selected: &[String], value: Option<&str>) -> bool {
    match value {
        Some(v) if !selected.is_empty() => selected.iter().any(|s| s == v),
        _ => true,
    }
}

impl Filters {
    pub fn with_date_range(&self, date_from: Option<NaiveDate>, date_to: Option<NaiveDate>) -> Self {
        Self {
            date_from,
            date_to,
            ..self.clone()
        }
    }

    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        if !self.locales.is_empty() && !self.locales.contains(&record.local) {
            return false;
        }

        if self.date_from.is_some_and(|from| record.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| record.date > to) {
            return false;
        }

        if self.source.is_some_and(|source| source != record.source()) {
            return false;
        }

        if !self.search.is_empty() && !self.matches_search(record) {
            return false;
        }

        match record.source() {
            Source::Expenses => {
                allowed(&self.counterparties, record.counterparty())
                    && allowed(&self.expense_payment_methods, record.payment_method())
                    && allowed(&self.document_subtypes, record.document_subtype())
                    && allowed(&self.check_numbers, record.check_number())
            }
            Source::Sales => {
                allowed(&self.responsibles, record.responsible())
                    && allowed(&self.sales_payment_methods, record.payment_method())
            }
            Source::Shrinkage => {
                allowed(&self.shrinkage_reasons, record.shrinkage_reason())
                    && allowed(&self.products, record.product())
            }
        }
    }

    fn matches_search(&self, record: &NormalizedRecord) -> bool {
        let haystack = [
            record.counterparty(),
            record.responsible(),
            record.product(),
            record.shrinkage_reason(),
            record.document_subtype(),
            record.check_number(),
            Some(record.local.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|field| !field.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

        haystack.contains(&self.search.to_lowercase())
    }
}

pub fn filter_records(records: &[NormalizedRecord], filters: &Filters) -> Vec<NormalizedRecord> {
    records
        .iter()
        .filter(|record| filters.matches(record))
        .cloned()
        .collect()
}

/// Second period compared against the main filter selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ComparisonSettings {
    pub enabled: bool,
    pub date_from_b: Option<NaiveDate>,
    pub date_to_b: Option<NaiveDate>,
}

impl ComparisonSettings {
    /// The main filters with period B's date range, when comparison is on.
    pub fn period_b_filters(&self, filters: &Filters) -> Option<Filters> {
        self.enabled
            .then(|| filters.with_date_range(self.date_from_b, self.date_to_b))
    }
}

/// Sorted distinct values offered by each filter widget.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct FilterOptions {
    pub locales: Vec<String>,
    pub responsibles: Vec<String>,
    pub sales_payment_methods: Vec<String>,
    pub counterparties: Vec<String>,
    pub expense_payment_methods: Vec<String>,
    pub document_subtypes: Vec<String>,
    pub check_numbers: Vec<String>,
    pub products: Vec<String>,
    pub shrinkage_reasons: Vec<String>,
}

fn unique_values<'a, F>(records: &'a [NormalizedRecord], source: Option<Source>, field: F) -> Vec<String>
where
    F: Fn(&'a NormalizedRecord) -> Option<&'a str>,
{
    records
        .iter()
        .filter(|r| source.map_or(true, |s| r.source() == s))
        .filter_map(field)
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl FilterOptions {
    pub fn from_records(records: &[NormalizedRecord]) -> Self {
        Self {
            locales: unique_values(records, None, |r| Some(r.local.as_str())),
            responsibles: unique_values(records, Some(Source::Sales), NormalizedRecord::responsible),
            sales_payment_methods: unique_values(
                records,
                Some(Source::Sales),
                NormalizedRecord::payment_method,
            ),
            counterparties: unique_values(
                records,
                Some(Source::Expenses),
                NormalizedRecord::counterparty,
            ),
            expense_payment_methods: unique_values(
                records,
                Some(Source::Expenses),
                NormalizedRecord::payment_method,
            ),
            document_subtypes: unique_values(
                records,
                Some(Source::Expenses),
                NormalizedRecord::document_subtype,
            ),
            check_numbers: unique_values(
                records,
                Some(Source::Expenses),
                NormalizedRecord::check_number,
            ),
            products: unique_values(records, Some(Source::Shrinkage), NormalizedRecord::product),
            shrinkage_reasons: unique_values(
                records,
                Some(Source::Shrinkage),
                NormalizedRecord::shrinkage_reason,
            ),
        }
    }
}
