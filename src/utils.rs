use crate::error::{IngestError, Result};
use crate::schema::RawItem;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use log::warn;
use serde_json::Value;

/// Day-first formats used by the upstream spreadsheets, tried before anything else.
const PRIMARY_DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

const ISO_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

const FREE_FORM_DATE_FORMATS: [&str; 7] = [
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Returns the first non-empty value stored under one of `aliases`.
///
/// Exact key matches are tried first, in alias order. Only when none of them
/// holds a value are keys compared case-insensitively and ignoring
/// surrounding whitespace.
pub fn resolve<'a, S: AsRef<str>>(raw: RawItem<'a>, aliases: &[S]) -> Option<&'a Value> {
    for alias in aliases {
        if let Some(value) = raw.get(alias.as_ref()) {
            if !is_blank(value) {
                return Some(value);
            }
        }
    }

    for alias in aliases {
        let wanted = normalize_key(alias.as_ref());
        let found = raw.iter().find(|(key, _)| normalize_key(key) == wanted);
        if let Some((_, value)) = found {
            if !is_blank(value) {
                return Some(value);
            }
        }
    }

    None
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Renders a scalar field as text. Strings are taken verbatim, numbers are printed.
pub fn scalar_text(value: &Value, field: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(IngestError::UnexpectedValue {
            field: field.to_string(),
            kind: value_kind(other),
        }),
    }
}

/// Resolves `aliases` and renders the hit as text, if any.
pub fn resolve_text<S: AsRef<str>>(
    raw: RawItem<'_>,
    aliases: &[S],
    field: &str,
) -> Result<Option<String>> {
    resolve(raw, aliases)
        .map(|value| scalar_text(value, field))
        .transpose()
}

/// Outcome of [`parse_date`].
///
/// `Fallback` carries today's date so the parser stays total, but it never
/// describes the row it came from and must not be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Recognized(NaiveDate),
    Fallback(NaiveDate),
}

impl ParsedDate {
    pub fn date(&self) -> NaiveDate {
        match self {
            ParsedDate::Recognized(date) | ParsedDate::Fallback(date) => *date,
        }
    }

    pub fn recognized(&self) -> Option<NaiveDate> {
        match self {
            ParsedDate::Recognized(date) => Some(*date),
            ParsedDate::Fallback(_) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ParsedDate::Fallback(_))
    }
}

pub fn parse_date(raw: &str) -> ParsedDate {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        warn!("Empty date string received, falling back to current date");
        return ParsedDate::Fallback(today());
    }

    match recognize_date(trimmed) {
        Some(date) => ParsedDate::Recognized(date),
        None => {
            warn!("Invalid date format: \"{}\", falling back to current date", raw);
            ParsedDate::Fallback(today())
        }
    }
}

/// Tries every supported format in priority order.
pub fn recognize_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();

    PRIMARY_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_iso8601(trimmed))
        .or_else(|| parse_free_form(trimmed))
}

fn parse_iso8601(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    ISO_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

fn parse_free_form(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }

    FREE_FORM_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Parses an amount from a JSON number or a localized numeric string.
///
/// Anything that is neither yields `0.0`.
pub fn parse_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_amount_str(s),
        _ => 0.0,
    }
}

/// Parses `1.234,56`-style amounts: `.` groups thousands and `,` is the decimal mark.
///
/// Strings that use `.` as the decimal mark are misread (`"12.5"` becomes
/// `125`). Upstream sheets are formatted for es-CL, so this is accepted.
pub fn parse_amount_str(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    leading_float(cleaned.trim())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Parses the longest numeric prefix of `s`, ignoring trailing text.
fn leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let digits_from = |mut i: usize| {
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_end = digits_from(end);
    let mut digit_count = int_end - end;
    end = int_end;

    if end < len && bytes[end] == b'.' {
        let frac_end = digits_from(end + 1);
        if frac_end > end + 1 {
            digit_count += frac_end - end - 1;
            end = frac_end;
        }
    }

    if digit_count == 0 {
        return None;
    }

    if end < len && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_start = end + 1;
        if exp_start < len && (bytes[exp_start] == b'+' || bytes[exp_start] == b'-') {
            exp_start += 1;
        }
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}
