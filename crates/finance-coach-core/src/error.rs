use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoachError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Unknown debt: {0}")]
    UnknownDebt(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CoachError {
    fn from(e: serde_json::Error) -> Self {
        CoachError::SerializationError(e.to_string())
    }
}

impl From<chrono::ParseError> for CoachError {
    fn from(e: chrono::ParseError) -> Self {
        CoachError::DateError(e.to_string())
    }
}
