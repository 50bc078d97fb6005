use std::path::PathBuf;

use thiserror::Error;

pub type ReviewResult<T> = Result<T, ReviewError>;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("analysis file does not exist: {}", .path.display())]
    MissingInput { path: PathBuf },
    #[error("{context}")]
    InvalidData { context: String },
}

impl ReviewError {
    pub fn invalid(context: impl Into<String>) -> Self {
        ReviewError::InvalidData {
            context: context.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ReviewError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        ReviewError::JsonParse {
            context: context.into(),
            source,
        }
    }
}
