//! # Dashboard Ingest
//!
//! A library for turning loosely-typed sales, expense and shrinkage payloads
//! (as exported from spreadsheets through a webhook) into uniform records,
//! with every discarded row kept alongside a precise reason.
//!
//! ## Core Concepts
//!
//! - **Payload shapes**: a separated object (`ventas`/`gastos`/`merma` arrays), a bare
//!   array of self-identifying rows, or an object wrapping that array under `data`
//! - **Source detection**: an explicit `source` tag wins, otherwise key fields decide
//! - **Normalization**: alias lists resolve inconsistent key spellings; amounts use the
//!   es-CL `1.234,56` convention and fall back to zero, dates must be recognizable
//! - **Rejections**: undetectable rows, income rows in the expense sheet, rows without
//!   a usable date, and rows with malformed fields are reported, never silently dropped
//! - **Analytics**: filters, KPIs and chart aggregates over the accepted records
//!
//! ## Example
//!
//! ```rust
//! use dashboard_ingest::*;
//! use serde_json::json;
//!
//! let payload = json!({
//!     "ventas": [{"local": "A", "date": "18/12/2025", "Total Venta": "125000"}],
//!     "gastos": [],
//!     "merma": []
//! });
//!
//! let result = adapt_payload(&payload, "N/A");
//! assert_eq!(result.records.len(), 1);
//! assert_eq!(result.records[0].amount, 125000.0);
//!
//! let kpis = calculate_kpis(&result.records);
//! assert_eq!(kpis.total_sales, 125000.0);
//! ```

pub mod analytics;
pub mod config;
pub mod detection;
pub mod error;
pub mod export;
pub mod filters;
pub mod ingestion;
pub mod normalizers;
pub mod schema;
pub mod utils;

pub use analytics::*;
pub use config::{AdapterConfig, DetectionRules, FieldAliases, PayloadKeys};
pub use detection::detect_source;
pub use error::{IngestError, Result};
pub use export::{rejected_to_csv_string, write_rejected_csv, REJECTED_CSV_HEADER};
pub use filters::{filter_records, ComparisonSettings, FilterOptions, Filters};
pub use ingestion::{detect_shape, PayloadAdapter, PayloadShape};
pub use schema::*;
pub use utils::{parse_amount, parse_amount_str, parse_date, resolve, ParsedDate};

use serde_json::Value;

/// Adapts `payload` with the built-in aliases and the given fallback location.
pub fn adapt_payload(payload: &Value, default_local: &str) -> AdapterResult {
    PayloadAdapter::with_default_local(default_local).adapt(payload)
}

/// Same as [`adapt_payload`] for a payload still in JSON text form.
pub fn adapt_payload_str(payload: &str, default_local: &str) -> AdapterResult {
    PayloadAdapter::with_default_local(default_local).adapt_str(payload)
}

/// Adapts `payload` with a caller-supplied configuration. A configuration that
/// fails [`AdapterConfig::validate`] yields a fatal result.
pub fn adapt_payload_with_config(payload: &Value, config: &AdapterConfig) -> AdapterResult {
    PayloadAdapter::new(config.clone()).adapt(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_end_to_end_processing() {
        let payload = json!({
            "data": [
                {"source": "ventas", "local": "A", "date": "18/12/2025", "Total Venta": "200.000"},
                {"source": "gastos", "local": "A", "date": "18/12/2025",
                 "Tipo (Ingreso/Gasto)": "GASTO", "Total Factura": "80.000"},
                {"source": "merma", "local": "A", "date": "18/12/2025",
                 "PRODUCTO": "Pan", "MONTO": "5.000"}
            ]
        });

        let result = adapt_payload(&payload, "N/A");
        assert_eq!(result.records.len(), 3);
        assert!(result.rejected.is_empty());
        assert!(result.warnings.is_empty());

        let kpis = calculate_kpis(&result.records);
        assert_eq!(kpis.operating_result, 115_000.0);
        assert_eq!(kpis.index_50, Some(40.0));
        assert_eq!(kpis.index_50_status, Index50Status::Ok);
    }

    #[test]
    fn test_default_local_is_applied() {
        let payload = json!([{"date": "2025-12-18", "Total Venta": 10}]);
        let result = adapt_payload(&payload, "Casa Matriz");
        assert_eq!(result.records[0].local, "Casa Matriz");
    }

    #[test]
    fn test_custom_config_aliases() {
        let config = AdapterConfig::from_json_str(
            r#"{"aliases": {"sale_total": ["Importe"]}, "detection": {"sale_total": ["Importe"]}}"#,
        )
        .unwrap();
        let payload = json!([{"Fecha": "01/03/2025", "Importe": "9.990"}]);

        let result = adapt_payload_with_config(&payload, &config);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].source(), Source::Sales);
        assert_eq!(result.records[0].amount, 9990.0);
    }
}
