use serde::{Deserialize, Serialize};

/// Discriminant of a [`GenerationError`], cheap to copy into notifications and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingInput,
    UpstreamEmpty,
    ParseError,
    SchemaError,
    InsufficientBudget,
    NetworkFailure,
    PersistenceFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::MissingInput => "MissingInput",
            ErrorKind::UpstreamEmpty => "UpstreamEmpty",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::SchemaError => "SchemaError",
            ErrorKind::InsufficientBudget => "InsufficientBudget",
            ErrorKind::NetworkFailure => "NetworkFailure",
            ErrorKind::PersistenceFailure => "PersistenceFailure",
        };
        write!(f, "{name}")
    }
}

/// Every way a generation cycle can fail.
///
/// Failures are recovered at the job boundary: the orchestrator turns each one into
/// a single user-visible notification and never applies partial state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Upstream returned an empty response")]
    UpstreamEmpty,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Insufficient budget: balance {balance} is below the minimum of {minimum}")]
    InsufficientBudget { balance: i64, minimum: i64 },

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::MissingInput(_) => ErrorKind::MissingInput,
            GenerationError::UpstreamEmpty => ErrorKind::UpstreamEmpty,
            GenerationError::ParseError(_) => ErrorKind::ParseError,
            GenerationError::SchemaError(_) => ErrorKind::SchemaError,
            GenerationError::InsufficientBudget { .. } => ErrorKind::InsufficientBudget,
            GenerationError::NetworkFailure(_) => ErrorKind::NetworkFailure,
            GenerationError::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
        }
    }

    /// Short message suitable for a transient toast.
    pub fn notice(&self) -> String {
        match self {
            GenerationError::MissingInput(what) => format!("Nothing to send: {what}"),
            GenerationError::UpstreamEmpty => "AI returned an empty response".to_string(),
            GenerationError::ParseError(_) => "AI did not return valid JSON".to_string(),
            GenerationError::SchemaError(_) => {
                "AI did not return valid files structure".to_string()
            }
            GenerationError::InsufficientBudget { .. } => {
                "You don't have enough token to generate code".to_string()
            }
            GenerationError::NetworkFailure(_) => {
                "AI response failed. Please try again.".to_string()
            }
            GenerationError::PersistenceFailure(_) => {
                "Failed to save workspace changes".to_string()
            }
        }
    }

    /// The message carried by the error, without the kind prefix.
    pub fn detail(&self) -> String {
        match self {
            GenerationError::MissingInput(detail)
            | GenerationError::ParseError(detail)
            | GenerationError::SchemaError(detail)
            | GenerationError::NetworkFailure(detail)
            | GenerationError::PersistenceFailure(detail) => detail.clone(),
            other => other.to_string(),
        }
    }
}
