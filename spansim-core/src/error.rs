//! Error types for spansim

use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for spansim
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (topology file, interactive input)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input (topology line, MAC token, menu choice)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rejected topology edit (self-loop, duplicate link, port in use)
    #[error("Topology error: {0}")]
    Topology(String),

    /// Bridge not found in the topology
    #[error("Bridge '{0}' not found")]
    BridgeNotFound(String),

    /// The simulation failed to converge within the tick bound
    #[error("Topology did not converge within {0} ticks")]
    Convergence(u64),
}

impl Error {
    /// Create a parse error with a custom message
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a topology error with a custom message
    pub fn topology<S: Into<String>>(msg: S) -> Self {
        Error::Topology(msg.into())
    }
}
