//! Error types for the formula engine.

use thiserror::Error;

use rhai::EvalAltResult;

/// A cell identifier could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid cell reference: {0:?}")]
    Malformed(String),

    #[error("Cell reference has row 0: {0:?}")]
    ZeroRow(String),

    #[error("Cell reference out of range: {0:?}")]
    OutOfRange(String),
}

/// Errors raised while storing or evaluating cell contents.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Unknown sheet index {0}")]
    UnknownSheet(usize),

    #[error("Circular reference at {0}")]
    CircularReference(String),

    #[error("Rhai error: {0}")]
    Rhai(
        #[from]
        #[source]
        Box<EvalAltResult>,
    ),

    #[error("Rhai parse error: {0}")]
    Parse(#[from] rhai::ParseError),
}
