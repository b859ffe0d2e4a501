//! Error Model - Failure Taxonomy for Engine Calls
//!
//! Every fallible operation in the binding returns [`YggError`].  The
//! variants separate failures that never reached the native side
//! (precondition violations, use after dispose) from failures reported by
//! the engine itself and from protocol violations that indicate a
//! binding/library version mismatch.

use thiserror::Error;

/// Errors surfaced by the binding layer.
#[derive(Debug, Error)]
pub enum YggError {
    /// A required argument was missing or malformed. Raised before any
    /// native call is made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The native engine reported an error. The message is passed through
    /// verbatim.
    #[error("engine error: {0}")]
    Engine(String),

    /// The native side returned something the binding cannot interpret:
    /// a null pointer where a value was mandatory, an undecodable buffer
    /// or an envelope that violates its own invariants.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The engine was disposed; the native handle is gone.
    #[error("engine has been disposed")]
    Disposed,

    /// The native library or one of its symbols could not be loaded.
    #[error("failed to load native library: {0}")]
    Library(#[from] libloading::Error),

    /// Host-side JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading configuration from disk failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl YggError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// `true` if the error was reported by the native engine rather than
    /// raised by the binding.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, Self::Engine(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, YggError>;

/// Reject empty names before they reach the native side.
pub(crate) fn require_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(YggError::invalid(format!("{kind} name must not be empty")));
    }
    Ok(())
}
