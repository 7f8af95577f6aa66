//! sheetwise-core - UI-agnostic workbook model, selection, fill and editing.
//!
//! Input events reach the core through [`Document`]; everything below it is
//! plain data plus small state machines that can be driven directly in tests.

pub mod bridge;
pub mod document;
pub mod edit;
pub mod error;
pub mod fill;
pub mod input;
pub mod selection;
pub mod sheet;
pub mod workbook;

pub use bridge::{ApplyOutcome, ERROR_SENTINEL, FormulaBridge, FormulaEngine};
pub use document::{CellView, Document};
pub use edit::{EditEffect, EditMode, Editor};
pub use error::{Result, SheetError};
pub use fill::{FillAxis, FillEngine};
pub use input::{Key, KeyInput};
pub use selection::{GridDims, Highlight, Rect, Selection};
pub use sheet::{Cell, CellUpdate, ClearMode, Sheet, StyleKey, Styles};
pub use workbook::Workbook;

pub use sheetwise_engine::engine::CellRef;
