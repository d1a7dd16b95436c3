//! Error type shared by the core rules and services.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] haccare_types::TextError),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid time of day: {0}")]
    InvalidTimeOfDay(String),
    #[error("invalid tenant id: {0}")]
    InvalidTenant(String),

    #[error("failed to read configuration file: {0}")]
    FileRead(std::io::Error),
    #[error("lab catalogue error: {0}")]
    Catalogue(String),
    #[error("dosing policy error: {0}")]
    Policy(String),

    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("record already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },
    #[error("record store is unavailable: {0}")]
    StoreUnavailable(String),

    #[error("unknown lab test code: {0}")]
    UnknownLabTest(String),
    #[error("administration rejected: {}", .0.join("; "))]
    AdministrationRejected(Vec<String>),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
