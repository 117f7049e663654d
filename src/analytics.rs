use crate::filters::{filter_records, ComparisonSettings, Filters};
use crate::schema::{NormalizedRecord, Source};
use crate::utils::format_date;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Expenses at or above this share of sales (in percent) are critical.
pub const INDEX_50_THRESHOLD: f64 = 50.0;

const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Index50Status {
    Ok,
    Critical,
    /// No sales in the selection, so the ratio is undefined.
    NotAvailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Kpis {
    pub total_sales: f64,
    pub total_expenses: f64,
    pub total_shrinkage: f64,
    #[schemars(description = "Sales minus expenses minus shrinkage")]
    pub operating_result: f64,
    #[schemars(description = "Expenses as a percentage of sales; absent when sales are zero")]
    pub index_50: Option<f64>,
    pub index_50_status: Index50Status,
}

fn safe_percentage(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator * 100.0)
    }
}

fn total_for(records: &[NormalizedRecord], source: Source) -> f64 {
    records
        .iter()
        .filter(|r| r.source() == source)
        .map(|r| r.amount)
        .sum()
}

pub fn calculate_kpis(records: &[NormalizedRecord]) -> Kpis {
    let total_sales = total_for(records, Source::Sales);
    let total_expenses = total_for(records, Source::Expenses);
    let total_shrinkage = total_for(records, Source::Shrinkage);

    let index_50 = safe_percentage(total_expenses, total_sales);
    let index_50_status = match index_50 {
        None => Index50Status::NotAvailable,
        Some(value) if value < INDEX_50_THRESHOLD => Index50Status::Ok,
        Some(_) => Index50Status::Critical,
    };

    Kpis {
        total_sales,
        total_expenses,
        total_shrinkage,
        operating_result: total_sales - total_expenses - total_shrinkage,
        index_50,
        index_50_status,
    }
}

/// KPIs for comparison period B, or `None` when comparison is off.
pub fn comparison_kpis(
    records: &[NormalizedRecord],
    filters: &Filters,
    comparison: &ComparisonSettings,
) -> Option<Kpis> {
    comparison
        .period_b_filters(filters)
        .map(|period_b| calculate_kpis(&filter_records(records, &period_b)))
}

/// Percent change of period A against period B for each monetary KPI.
/// `None` where period B's value is zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct KpiChange {
    pub total_sales: Option<f64>,
    pub total_expenses: Option<f64>,
    pub total_shrinkage: Option<f64>,
    pub operating_result: Option<f64>,
}

pub fn kpi_change(a: &Kpis, b: &Kpis) -> KpiChange {
    let change = |current: f64, previous: f64| safe_percentage(current - previous, previous);
    KpiChange {
        total_sales: change(a.total_sales, b.total_sales),
        total_expenses: change(a.total_expenses, b.total_expenses),
        total_shrinkage: change(a.total_shrinkage, b.total_shrinkage),
        operating_result: change(a.operating_result, b.operating_result),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EvolutionPoint {
    /// `dd/mm/yyyy`
    pub label: String,
    pub date: NaiveDate,
    pub sales: f64,
    pub expenses: f64,
    pub shrinkage: f64,
}

#[derive(Default)]
struct DayTotals {
    sales: f64,
    expenses: f64,
    shrinkage: f64,
}

fn totals_by_day(records: &[NormalizedRecord]) -> BTreeMap<NaiveDate, DayTotals> {
    records.iter().fold(BTreeMap::<NaiveDate, DayTotals>::new(), |mut days, record| {
        let day = days.entry(record.date).or_default();
        match record.source() {
            Source::Sales => day.sales += record.amount,
            Source::Expenses => day.expenses += record.amount,
            Source::Shrinkage => day.shrinkage += record.amount,
        }
        days
    })
}

/// Daily totals per domain, oldest first.
pub fn group_by_date_evolution(records: &[NormalizedRecord]) -> Vec<EvolutionPoint> {
    totals_by_day(records)
        .into_iter()
        .map(|(date, totals)| EvolutionPoint {
            label: format_date(date),
            date,
            sales: totals.sales,
            expenses: totals.expenses,
            shrinkage: totals.shrinkage,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Index50Point {
    pub label: String,
    pub date: NaiveDate,
    pub index_50: Option<f64>,
}

pub fn index_50_over_time(records: &[NormalizedRecord]) -> Vec<Index50Point> {
    totals_by_day(records)
        .into_iter()
        .map(|(date, totals)| Index50Point {
            label: format_date(date),
            date,
            index_50: safe_percentage(totals.expenses, totals.sales),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PaymentMethodShare {
    pub payment_method: String,
    pub total: f64,
    pub percentage: f64,
}

/// Sums amounts per attribute value for one domain, largest total first.
/// Records lacking the attribute are skipped. Ties keep alphabetical order.
fn totals_by<F>(records: &[NormalizedRecord], source: Source, key: F) -> Vec<CategoryTotal>
where
    F: Fn(&NormalizedRecord) -> Option<&str>,
{
    let sums = records
        .iter()
        .filter(|r| r.source() == source)
        .filter_map(|r| key(r).filter(|k| !k.is_empty()).map(|k| (k, r.amount)))
        .fold(BTreeMap::<&str, f64>::new(), |mut sums, (k, amount)| {
            *sums.entry(k).or_default() += amount;
            sums
        });

    let mut totals: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(name, total)| CategoryTotal {
            name: name.to_string(),
            total,
        })
        .collect();
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals
}

/// Top 10 counterparties by expense total.
pub fn group_by_counterparty(records: &[NormalizedRecord]) -> Vec<CategoryTotal> {
    let mut totals = totals_by(records, Source::Expenses, NormalizedRecord::counterparty);
    totals.truncate(TOP_N);
    totals
}

pub fn group_by_payment_method(records: &[NormalizedRecord]) -> Vec<PaymentMethodShare> {
    let totals = totals_by(records, Source::Sales, NormalizedRecord::payment_method);
    let grand_total: f64 = totals.iter().map(|t| t.total).sum();

    totals
        .into_iter()
        .map(|t| PaymentMethodShare {
            percentage: if grand_total > 0.0 {
                t.total / grand_total * 100.0
            } else {
                0.0
            },
            payment_method: t.name,
            total: t.total,
        })
        .collect()
}

pub fn group_by_shrinkage_reason(records: &[NormalizedRecord]) -> Vec<CategoryTotal> {
    totals_by(records, Source::Shrinkage, NormalizedRecord::shrinkage_reason)
}

/// Top 10 products by shrinkage total.
pub fn group_by_shrinkage_product(records: &[NormalizedRecord]) -> Vec<CategoryTotal> {
    let mut totals = totals_by(records, Source::Shrinkage, NormalizedRecord::product);
    totals.truncate(TOP_N);
    totals
}
