//! Error types for the Sheetwise host shell

use sheetwise_core::SheetError;
use thiserror::Error;
use uuid::Uuid;

/// Failures reported by the persistence/auth collaborator.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("workbook {0} not found")]
    WorkbookNotFound(Uuid),

    #[error("sheet {0} not found")]
    SheetNotFound(Uuid),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// Reasons a settings file could not be used at all.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("file too large ({size} bytes, max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors surfaced by [`crate::app::App`].
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type Result<T> = std::result::Result<T, AppError>;
