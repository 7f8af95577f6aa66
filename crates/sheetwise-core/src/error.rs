//! Error types for Sheetwise core.

use thiserror::Error;

use sheetwise_engine::AddressError;

/// Errors that can occur while manipulating a workbook.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sheet data must be a JSON object keyed by cell id")]
    NotAnObject,

    #[error("No sheet numbered {0}")]
    UnknownSheet(u32),

    #[error("Sheet numbers start at 1, got {0}")]
    InvalidSheetNumber(u32),

    #[error("Duplicate sheet number {0}")]
    DuplicateSheet(u32),

    #[error("Workbook has no sheets")]
    NoSheets,
}

pub type Result<T> = std::result::Result<T, SheetError>;
