use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregatorError {
    /// Transport-level failure reaching an external source. Never retried.
    #[error("Failed to fetch {endpoint}: {message}")]
    SourceFetch { endpoint: String, message: String },

    /// An upstream payload is missing a field we rely on, or has it with the wrong shape.
    #[error("Malformed {api} response: {detail}")]
    MalformedResponse { api: &'static str, detail: String },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl AggregatorError {
    pub fn source_fetch(endpoint: &str, message: impl ToString) -> Self {
        AggregatorError::SourceFetch {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    pub fn malformed(api: &'static str, detail: impl ToString) -> Self {
        AggregatorError::MalformedResponse {
            api,
            detail: detail.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
