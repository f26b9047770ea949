use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for Trellis operations that touch the outside world.
#[derive(Debug, Error, Diagnostic)]
pub enum TrellisError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed resolver configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the resolver configuration file for syntax errors"))]
    Config { message: String },

    /// Invalid or malformed metadata catalog.
    #[error("Catalog error: {message}")]
    #[diagnostic(help("Every catalog entry needs a `group:name:version` coordinate"))]
    Catalog { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type TrellisResult<T> = miette::Result<T>;
