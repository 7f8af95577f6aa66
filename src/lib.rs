//! sheetwise - headless host shell for the Sheetwise spreadsheet.
//!
//! The grid itself lives in [`sheetwise_core`]; this crate adds what sits
//! around it: settings, host key bindings, the persistence collaborator,
//! debounced title saves, notifications and logging setup.

pub mod app;
pub mod debounce;
pub mod error;
pub mod keymap;
pub mod logging;
pub mod notify;
pub mod persistence;
pub mod settings;

pub use app::{App, AppSignal};
pub use error::{AppError, PersistenceError, Result, SettingsError};
pub use keymap::{HostAction, Keymap};
pub use persistence::{MemoryStore, PersistenceService, SaveRequest, Session};
pub use settings::{Settings, load_settings};
