//! Rhai engine creation and the multi-sheet [`Evaluator`].
//!
//! The evaluator stores raw cell contents per engine sheet, evaluates formula
//! cells lazily on read and caches results until a cell they depend on
//! (directly or transitively) changes.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use rhai::Engine;
use tracing::{debug, trace};

use super::{
    Cell, CellKey, CellRef, CellType, Dynamic, Grid, ValueCache, detect_cycle, format_number,
    preprocess_script_with_context,
};
use crate::builtins;
use crate::error::EvalError;

/// Create a Rhai engine with built-ins registered and shared storage.
pub fn create_engine_with_cache(grid: Grid, value_cache: ValueCache) -> Engine {
    let mut engine = Engine::new();
    builtins::register_builtins(&mut engine, grid, value_cache);
    engine
}

/// A computed cell value as reported by [`Evaluator::get_cell_value`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Convert an evaluation result. Unit, non-finite numbers and compound
    /// values have no cell representation and map to None.
    fn from_dynamic(value: &Dynamic) -> Option<Value> {
        if value.is_unit() {
            return None;
        }
        if let Ok(n) = value.as_float() {
            return n.is_finite().then_some(Value::Number(n));
        }
        if let Ok(n) = value.as_int() {
            return Some(Value::Number(n as f64));
        }
        if let Ok(b) = value.as_bool() {
            return Some(Value::Bool(b));
        }
        if let Ok(s) = value.clone().into_string() {
            return Some(Value::Text(s));
        }
        None
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Multi-sheet formula evaluator backed by Rhai.
pub struct Evaluator {
    grid: Grid,
    value_cache: ValueCache,
    engine: Engine,
    sheet_names: Vec<String>,
}

impl Evaluator {
    /// Create an evaluator with no sheets.
    pub fn new() -> Self {
        let grid: Grid = Arc::new(DashMap::new());
        let value_cache = ValueCache::default();
        let engine = create_engine_with_cache(grid.clone(), value_cache.clone());
        Evaluator {
            grid,
            value_cache,
            engine,
            sheet_names: Vec::new(),
        }
    }

    /// Register a sheet and return its 0-based index.
    pub fn add_sheet(&mut self, name: &str) -> usize {
        self.sheet_names.push(name.to_string());
        let index = self.sheet_names.len() - 1;
        debug!(index, name, "engine sheet added");
        index
    }

    pub fn sheet_count(&self) -> usize {
        self.sheet_names.len()
    }

    pub fn sheet_name(&self, index: usize) -> Option<&str> {
        self.sheet_names.get(index).map(String::as_str)
    }

    /// Built-in function names offered to formula authors, sorted.
    pub fn function_names(&self) -> Vec<&'static str> {
        builtins::builtin_names()
    }

    /// Help text for a built-in function, for autocomplete hints.
    pub fn function_description(&self, name: &str) -> Option<&'static str> {
        builtins::builtin_description(name)
    }

    fn key(&self, sheet: usize, row: usize, col: usize) -> Result<CellKey, EvalError> {
        if sheet >= self.sheet_names.len() {
            return Err(EvalError::UnknownSheet(sheet));
        }
        Ok(CellKey::new(sheet, row, col))
    }

    /// Store raw cell text. Formulas start with `=`; numeric text becomes a
    /// number; empty text empties the cell.
    pub fn set_cell_contents(
        &mut self,
        sheet: usize,
        row: usize,
        col: usize,
        text: &str,
    ) -> Result<(), EvalError> {
        let key = self.key(sheet, row, col)?;
        let cell = Cell::from_input(text);
        if matches!(cell.contents, CellType::Empty) {
            self.grid.remove(&key);
        } else {
            self.grid.insert(key, cell);
        }
        self.invalidate_from(key);
        trace!(sheet, row, col, text, "engine cell set");
        Ok(())
    }

    /// Evaluate a cell. `Ok(None)` means the formula produced no usable value.
    pub fn get_cell_value(
        &mut self,
        sheet: usize,
        row: usize,
        col: usize,
    ) -> Result<Option<Value>, EvalError> {
        let key = self.key(sheet, row, col)?;

        let script = {
            let Some(cell) = self.grid.get(&key) else {
                return Ok(Some(Value::Empty));
            };
            match &cell.contents {
                CellType::Empty => return Ok(Some(Value::Empty)),
                CellType::Number(n) => return Ok(Some(Value::Number(*n))),
                CellType::Text(s) => return Ok(Some(Value::Text(s.clone()))),
                CellType::Script(s) => s.clone(),
            }
        };

        if let Some(cached) = self.value_cache.get(&key) {
            return Ok(Value::from_dynamic(&cached));
        }

        if detect_cycle(&key, &self.grid).is_some() {
            return Err(EvalError::CircularReference(key.cell.to_string()));
        }

        let processed = preprocess_script_with_context(&script, sheet, Some(&key.cell));
        builtins::take_reentry();
        let Some(_guard) = builtins::EvaluationGuard::enter(key) else {
            return Err(EvalError::CircularReference(key.cell.to_string()));
        };
        let result = self.engine.eval::<Dynamic>(&processed);
        if let Some(at) = builtins::take_reentry() {
            return Err(EvalError::CircularReference(at.cell.to_string()));
        }
        let result = result?;
        let value = Value::from_dynamic(&result);
        if value.is_some() {
            self.value_cache.insert(key, result);
        }
        Ok(value)
    }

    /// Drop cached results for `changed` and every formula that depends on it,
    /// transitively, within the same sheet.
    fn invalidate_from(&self, changed: CellKey) {
        let mut pending = vec![changed.cell];
        let mut visited: HashSet<CellRef> = HashSet::new();

        while let Some(cell) = pending.pop() {
            if !visited.insert(cell) {
                continue;
            }
            self.value_cache.remove(&CellKey {
                sheet: changed.sheet,
                cell,
            });
            for entry in self.grid.iter() {
                let key = entry.key();
                if key.sheet == changed.sheet && entry.value().depends_on.contains(&cell) {
                    pending.push(key.cell);
                }
            }
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
