use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

/// Failures reported by a [`PageDriver`](crate::PageDriver).
///
/// Callers only need to tell timeouts, missing elements and stale handles
/// apart; everything else is opaque driver trouble.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timeout waiting for {0}")]
    Timeout(String),

    #[error("element not found: {0}")]
    NotFound(String),

    #[error("stale element handle: {0}")]
    StaleHandle(String),

    #[error("chromium error: {0}")]
    Chromium(String),

    #[error("failed to launch browser session: {0}")]
    Launch(String),
}

impl DriverError {
    /// Whether repeating the same operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::StaleHandle(_))
    }
}
