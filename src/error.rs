use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Field '{field}' holds a non-scalar value ({kind})")]
    UnexpectedValue { field: String, kind: &'static str },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
