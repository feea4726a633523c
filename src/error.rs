//! Error types
//!
//! Nothing here is fatal to gameplay: callers log these and degrade
//! (defer init, spawn nothing, skip a record).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClawError {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("malformed catalog: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("layout not measurable yet ({width}x{height})")]
    Unmeasured { width: f32, height: f32 },

    #[error("persistence sink failed: {0}")]
    Sink(String),

    #[error("settings storage failed: {0}")]
    Storage(String),
}
