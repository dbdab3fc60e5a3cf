use galleria_contracts::CatalogError;
use thiserror::Error;

use crate::cursor::CursorDecodeError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GalleryError {
    #[error("catalog request failed: {0}")]
    Transport(#[from] CatalogError),

    #[error("cursor could not be decoded: {0}")]
    CursorDecode(#[from] CursorDecodeError),

    #[error(
        "response for generation {generation} superseded by generation {current}"
    )]
    StaleResponse { generation: u64, current: u64 },

    #[error("prefetch failed: {0}")]
    Prefetch(String),
}

impl GalleryError {
    /// Only foreground transport failures reach the UI. Cursor problems
    /// restart pagination, stale responses are dropped and prefetch failures
    /// stay in the logs.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, GalleryError::Transport(_))
    }
}
