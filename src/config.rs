use crate::error::{IngestError, Result};
use crate::schema::Source;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Ordered alias lists used by the normalizers. Earlier aliases win.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct FieldAliases {
    pub local: Vec<String>,
    pub date: Vec<String>,
    pub sale_total: Vec<String>,
    pub responsible: Vec<String>,
    pub payment_method: Vec<String>,
    pub transaction_type: Vec<String>,
    pub invoice_total: Vec<String>,
    pub counterparty: Vec<String>,
    pub document_subtype: Vec<String>,
    pub check_number: Vec<String>,
    pub shrinkage_amount: Vec<String>,
    pub product: Vec<String>,
    pub shrinkage_reason: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            local: strings(&["local", "Local", "LOCAL"]),
            date: strings(&["date", "Fecha", "fecha", "Date", "FECHA"]),
            sale_total: strings(&["Total Venta", "total venta", "TotalVenta", "venta", "Venta"]),
            responsible: strings(&["Responsable", "responsable", "RESPONSABLE"]),
            payment_method: strings(&["Medio de Pago", "medio de pago", "MedioDePago", "medioPago"]),
            transaction_type: strings(&["Tipo (Ingreso/Gasto)", "Tipo", "tipo", "TIPO"]),
            invoice_total: strings(&["Total Factura", "total factura", "TotalFactura", "Factura"]),
            counterparty: strings(&[
                "Proveedor/Cliente",
                "Proveedor",
                "proveedor",
                "Cliente",
                "cliente",
            ]),
            document_subtype: strings(&["Subtipo Doc", "subtipo doc", "SubtipoDoc", "Subtipo"]),
            check_number: strings(&["N° Cheque", "N Cheque", "Cheque", "cheque", "NumCheque"]),
            shrinkage_amount: strings(&["MONTO", "Monto", "monto", "Total", "total"]),
            product: strings(&["PRODUCTO", "Producto", "producto"]),
            shrinkage_reason: strings(&["TIPO", "Tipo", "tipo", "TipoMerma"]),
        }
    }
}

/// How a raw item is assigned to a domain.
///
/// The structural indicator lists are narrower than the normalizer aliases:
/// a generic `Total` column must not make a row look like shrinkage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct DetectionRules {
    pub tag_aliases: Vec<String>,
    pub sales_tokens: Vec<String>,
    pub expenses_tokens: Vec<String>,
    pub shrinkage_tokens: Vec<String>,
    pub sale_total: Vec<String>,
    pub invoice_total: Vec<String>,
    pub counterparty: Vec<String>,
    pub product: Vec<String>,
    pub shrinkage_amount: Vec<String>,
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self {
            tag_aliases: strings(&["source", "Source", "SOURCE"]),
            sales_tokens: strings(&["venta", "sale"]),
            expenses_tokens: strings(&["gasto", "expense"]),
            shrinkage_tokens: strings(&["merma", "shrinkage"]),
            sale_total: strings(&["Total Venta", "total venta", "TotalVenta", "venta"]),
            invoice_total: strings(&["Total Factura", "total factura", "TotalFactura", "Factura"]),
            counterparty: strings(&["Proveedor/Cliente", "Proveedor", "proveedor"]),
            product: strings(&["PRODUCTO", "Producto", "producto"]),
            shrinkage_amount: strings(&["MONTO", "Monto", "monto"]),
        }
    }
}

impl DetectionRules {
    pub fn tokens_for(&self, source: Source) -> &[String] {
        match source {
            Source::Sales => &self.sales_tokens,
            Source::Expenses => &self.expenses_tokens,
            Source::Shrinkage => &self.shrinkage_tokens,
        }
    }
}

/// Top-level keys recognised in object payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct PayloadKeys {
    pub sales: Vec<String>,
    pub expenses: Vec<String>,
    pub shrinkage: Vec<String>,
    pub wrapped: String,
}

impl Default for PayloadKeys {
    fn default() -> Self {
        Self {
            sales: strings(&["ventas", "sales"]),
            expenses: strings(&["gastos", "expenses"]),
            shrinkage: strings(&["merma", "shrinkage"]),
            wrapped: "data".to_string(),
        }
    }
}

impl PayloadKeys {
    pub fn keys_for(&self, source: Source) -> &[String] {
        match source {
            Source::Sales => &self.sales,
            Source::Expenses => &self.expenses,
            Source::Shrinkage => &self.shrinkage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct AdapterConfig {
    #[schemars(description = "Location assigned to rows that do not name one")]
    pub default_local: String,

    #[schemars(
        description = "Token the transaction type of an expenses row must contain (case-insensitive) for the row to be kept"
    )]
    pub expense_marker: String,

    pub aliases: FieldAliases,
    pub detection: DetectionRules,
    pub payload_keys: PayloadKeys,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            default_local: "N/A".to_string(),
            expense_marker: "gasto".to_string(),
            aliases: FieldAliases::default(),
            detection: DetectionRules::default(),
            payload_keys: PayloadKeys::default(),
        }
    }
}

impl AdapterConfig {
    pub fn with_default_local(mut self, default_local: impl Into<String>) -> Self {
        self.default_local = default_local.into();
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("aliases.local", &self.aliases.local),
            ("aliases.date", &self.aliases.date),
            ("aliases.sale_total", &self.aliases.sale_total),
            ("aliases.invoice_total", &self.aliases.invoice_total),
            ("aliases.transaction_type", &self.aliases.transaction_type),
            ("aliases.shrinkage_amount", &self.aliases.shrinkage_amount),
        ];

        for (name, list) in required {
            if list.iter().all(|alias| alias.trim().is_empty()) {
                return Err(IngestError::InvalidConfig(format!(
                    "{} must contain at least one non-empty alias",
                    name
                )));
            }
        }

        if self.expense_marker.trim().is_empty() {
            return Err(IngestError::InvalidConfig(
                "expense_marker must not be empty".to_string(),
            ));
        }

        if self.payload_keys.wrapped.trim().is_empty() {
            return Err(IngestError::InvalidConfig(
                "payload_keys.wrapped must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AdapterConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
