//! Crate-level error type.
//!
//! Expected, recoverable conditions (malformed fragments, readings out of
//! range, too few anchors, degenerate geometry) are handled locally by the
//! pipeline stages and never reach this enum; what remains is what actually
//! stops the process or a connection.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Anchor registry or settings could not be loaded. Fatal at startup:
    /// nothing downstream can run without anchor geometry.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
