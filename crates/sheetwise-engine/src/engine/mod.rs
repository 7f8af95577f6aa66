//! Spreadsheet engine API.
//!
//! - [`CellRef`] - A1 identifiers <-> zero-based row/col
//! - [`Cell`], [`CellType`], [`Grid`] - raw cell storage keyed by engine sheet
//! - [`detect_cycle`] - circular dependency detection
//! - [`extract_dependencies`] - references a formula reads
//! - [`preprocess_script`] - rewrite formulas for Rhai evaluation
//! - [`Evaluator`] - multi-sheet evaluation with cached results
//! - [`format_dynamic`] - format values for display

mod cell;
mod cell_ref;
mod cycle;
mod deps;
mod eval;
mod format;
mod preprocess;

pub use cell::{Cell, CellKey, CellType, Grid, ValueCache};
pub use cell_ref::CellRef;
pub use cycle::detect_cycle;
pub use deps::extract_dependencies;
pub use eval::{Evaluator, Value, create_engine_with_cache};
pub use format::{format_dynamic, format_number};
pub use preprocess::{preprocess_script, preprocess_script_with_context};

pub use rhai::{AST, Dynamic};
