//! Unified error type.

use thiserror::Error;

/// Boxed application error carried by [`Error::Handler`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by waypost's fallible operations.
///
/// Control flow is not an error: a handler that wants to stop or pass returns
/// a [`Flow`](crate::Flow). `Error` covers real failures: a wiring mistake
/// at setup time, a handler that failed or panicked, bad configuration, or
/// the listener's I/O.
#[derive(Debug, Error)]
pub enum Error {
    /// The same middleware instance was added to the chain twice.
    ///
    /// This is a wiring bug, not a runtime condition. Application setup must
    /// abort; retrying cannot succeed.
    #[error("circular middleware setup: `{0}` instance queued twice")]
    CircularMiddleware(&'static str),

    #[error("invalid route pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown HTTP method `{0}`")]
    UnknownMethod(String),

    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    #[error("handler panicked: {0}")]
    Panic(String),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps any application error so a handler can return it with `?`.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// Returns `true` for configuration errors that must halt setup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CircularMiddleware(_))
    }

    /// Short type label, used by the diagnostics page and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CircularMiddleware(_) => "CircularMiddleware",
            Self::Pattern { .. }        => "Pattern",
            Self::UnknownMethod(_)      => "UnknownMethod",
            Self::Handler(_)            => "Handler",
            Self::Panic(_)              => "Panic",
            Self::Config(_)             => "Config",
            Self::Io(_)                 => "Io",
        }
    }
}
