use thiserror::Error;

/// Failure reported by the catalog query service or the push channel.
///
/// The pagination core treats every variant as a recoverable transport
/// failure, except `InvalidCursor`, which restarts pagination from the head.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CatalogError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("catalog request timed out")]
    Timeout,

    #[error("catalog service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("catalog rejected cursor: {0}")]
    InvalidCursor(String),
}

impl CatalogError {
    pub fn transport(message: impl Into<String>) -> Self {
        CatalogError::Transport(message.into())
    }

    pub fn is_invalid_cursor(&self) -> bool {
        matches!(self, CatalogError::InvalidCursor(_))
    }
}
