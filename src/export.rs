use crate::error::Result;
use crate::schema::RejectedRecord;
use std::io::Write;

/// Column order consumed by downstream correction tooling. Do not reorder.
pub const REJECTED_CSV_HEADER: [&str; 4] = ["Row", "Reason", "Detected Source", "Data"];

/// Spreadsheet row of a rejected item: one header row, 1-based numbering.
pub fn spreadsheet_row(index: usize) -> usize {
    index + 2
}

/// Writes one line per rejected record with the raw item as compact JSON.
pub fn write_rejected_csv<W: Write>(rejected: &[RejectedRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(REJECTED_CSV_HEADER)?;

    for record in rejected {
        let row = spreadsheet_row(record.index).to_string();
        let source = record
            .detected_source
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".to_string());
        let data = serde_json::to_string(&record.raw)?;

        csv_writer.write_record([row.as_str(), record.reason.as_str(), source.as_str(), data.as_str()])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn rejected_to_csv_string(rejected: &[RejectedRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    write_rejected_csv(rejected, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RejectionKind, Source};
    use serde_json::json;

    #[test]
    fn test_header_only_for_no_rejections() {
        let csv = rejected_to_csv_string(&[]).unwrap();
        assert_eq!(csv, "Row,Reason,Detected Source,Data\n");
    }

    #[test]
    fn test_rows_escape_reason_and_json() {
        let rejected = vec![
            RejectedRecord {
                index: 0,
                raw: json!({"foo": "bar"}),
                detected_source: None,
                kind: RejectionKind::SourceUndetectable,
                reason: "source undetectable".to_string(),
            },
            RejectedRecord {
                index: 3,
                raw: json!({"Tipo": "INGRESO"}),
                detected_source: Some(Source::Expenses),
                kind: RejectionKind::IntentionallyExcluded,
                reason: "tagged \"INGRESO\", excluded".to_string(),
            },
        ];
        let csv = rejected_to_csv_string(&rejected).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], r#"2,source undetectable,?,"{""foo"":""bar""}""#);
        assert_eq!(
            lines[2],
            r#"5,"tagged ""INGRESO"", excluded",expenses,"{""Tipo"":""INGRESO""}""#
        );
    }

    #[test]
    fn test_csv_reads_back_with_same_columns() {
        let rejected = vec![RejectedRecord {
            index: 7,
            raw: json!({"a": 1}),
            detected_source: Some(Source::Sales),
            kind: RejectionKind::InvalidDate,
            reason: "invalid or missing date: received \"\"".to_string(),
        }];
        let csv = rejected_to_csv_string(&rejected).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), REJECTED_CSV_HEADER.to_vec());

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "9");
        assert_eq!(&row[2], "sales");
        assert_eq!(&row[3], r#"{"a":1}"#);
    }
}
