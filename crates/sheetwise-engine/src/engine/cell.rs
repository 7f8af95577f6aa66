//! Cell data structures held by the engine.
//!
//! - [`CellType`] - The type of content in a cell (empty, text, number, or formula)
//! - [`Cell`] - Content plus the same-sheet cells a formula depends on
//! - [`CellKey`] - A cell address qualified by engine sheet index
//! - [`Grid`] / [`ValueCache`] - Shared sparse storage (backed by `DashMap`) that
//!   the Rhai builtins read from

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::cell_ref::CellRef;
use super::deps::extract_dependencies;

/// The type of content stored in a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellType {
    Empty,
    Text(String),
    Number(f64),
    /// Formula body without the leading `=`.
    Script(String),
}

/// A cell in the engine grid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cell {
    pub contents: CellType,
    pub depends_on: Vec<CellRef>,
}

impl Cell {
    pub fn new_empty() -> Cell {
        Cell {
            contents: CellType::Empty,
            depends_on: vec![],
        }
    }

    pub fn new_text(text: &str) -> Cell {
        Cell {
            contents: CellType::Text(text.to_string()),
            depends_on: vec![],
        }
    }

    pub fn new_number(n: f64) -> Cell {
        Cell {
            contents: CellType::Number(n),
            depends_on: vec![],
        }
    }

    /// Create a new cell containing a formula.
    /// Dependencies are extracted from the formula body.
    pub fn new_script(script: &str) -> Cell {
        Cell {
            depends_on: extract_dependencies(script),
            contents: CellType::Script(script.to_string()),
        }
    }

    /// Classify raw cell text.
    /// - Empty string -> Empty
    /// - Starts with '=' -> Script (without the '=')
    /// - Parses as a finite number (surrounding whitespace ignored) -> Number
    /// - Otherwise -> Text, kept exactly as entered
    pub fn from_input(input: &str) -> Cell {
        if input.is_empty() {
            return Cell::new_empty();
        }

        if let Some(formula) = input.strip_prefix('=') {
            return Cell::new_script(formula);
        }

        match input.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::new_number(n),
            _ => Cell::new_text(input),
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self.contents, CellType::Script(_))
    }
}

/// A cell address qualified by its 0-based engine sheet index.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CellKey {
    pub sheet: usize,
    pub cell: CellRef,
}

impl CellKey {
    pub const fn new(sheet: usize, row: usize, col: usize) -> CellKey {
        CellKey {
            sheet,
            cell: CellRef::new(row, col),
        }
    }
}

/// Thread-safe sparse grid storage shared by every sheet in the engine.
/// DashMap is wrapped in an Arc so the builtins can hold cheap clones.
pub type Grid = Arc<DashMap<CellKey, Cell>>;

/// Evaluated formula results, shared with the builtins so references to a
/// formula cell reuse its computed value instead of re-evaluating.
pub type ValueCache = Arc<DashMap<CellKey, rhai::Dynamic>>;
