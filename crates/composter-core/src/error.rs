//! Error types for the composter controller
//!
//! Two families live here:
//! - [`Error`] covers infrastructure (I/O, configuration files, logging setup).
//! - [`Fault`] is the controller's failure taxonomy. Faults never escape as
//!   `Err` from a tick; they are carried by failed purchase flows and by
//!   skipped runs so the host can report *why* something ended.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure error types
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Host Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Logging setup failed: {message}")]
    Logging { message: String },

    #[error("Host error: {message}")]
    Host { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Configuration problems fall back to defaults and a missing log file
    /// only costs diagnostics, so neither stops the controller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Toml(_) | Error::Logging { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Controller Faults
// ─────────────────────────────────────────────────────────────────

/// Why a flow or a run ended without doing its job.
///
/// Every fault resolves to a terminal FSM state plus a log line; there is
/// no unrecoverable variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// An expected view did not appear within its bound
    #[error("timed out waiting for '{expected}'")]
    Timeout { expected: String },

    /// An expected interactive element is absent (after alternates)
    #[error("cannot find '{element}' in '{view}'")]
    NotFound { element: String, view: String },

    /// No phase transition happened within the stall window
    #[error("no progress in {state} for {window_ms}ms")]
    Stuck { state: String, window_ms: u64 },

    /// Fewer items arrived than were requested
    #[error("only {gained}/{requested} {item} arrived")]
    VerificationShortfall {
        item: String,
        requested: u32,
        gained: u32,
    },

    /// A resource label did not match the expected format
    #[error("unreadable resource label '{text}'")]
    ParseFailure { text: String },

    /// The server announced a restart
    #[error("server is closing in {seconds} seconds")]
    ServerClosing { seconds: u32 },

    /// A start precondition is not met
    #[error("{reason}")]
    PreconditionUnmet { reason: String },
}

impl Fault {
    pub fn timeout(expected: impl Into<String>) -> Self {
        Self::Timeout {
            expected: expected.into(),
        }
    }

    pub fn not_found(element: impl Into<String>, view: impl Into<String>) -> Self {
        Self::NotFound {
            element: element.into(),
            view: view.into(),
        }
    }

    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionUnmet {
            reason: reason.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
