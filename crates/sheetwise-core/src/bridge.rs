//! Formula bridge: pushes edited text into the formula engine and writes
//! computed results back into the cell store.
//!
//! The engine indexes sheets from 0 while sheets are numbered from 1; the
//! bridge registers engine sheets on demand so that
//! `engine_index(sheet_number)` always names the right engine sheet.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::sheet::{CellUpdate, ClearMode, Sheet};
use crate::workbook::engine_index;
use sheetwise_engine::engine::CellRef;
use sheetwise_engine::{EvalError, Evaluator, Value};

/// Displayed in place of a result the engine could not produce.
pub const ERROR_SENTINEL: &str = "#ERROR!";

/// The formula-evaluation collaborator.
pub trait FormulaEngine {
    fn add_sheet(&mut self, name: &str) -> usize;
    fn sheet_count(&self) -> usize;
    fn set_cell_contents(&mut self, sheet: usize, row: usize, col: usize, text: &str) -> Result<(), EvalError>;
    fn get_cell_value(&mut self, sheet: usize, row: usize, col: usize) -> Result<Option<Value>, EvalError>;
    fn function_names(&self) -> Vec<String>;
}

impl FormulaEngine for Evaluator {
    fn add_sheet(&mut self, name: &str) -> usize {
        Evaluator::add_sheet(self, name)
    }

    fn sheet_count(&self) -> usize {
        Evaluator::sheet_count(self)
    }

    fn set_cell_contents(&mut self, sheet: usize, row: usize, col: usize, text: &str) -> Result<(), EvalError> {
        Evaluator::set_cell_contents(self, sheet, row, col, text)
    }

    fn get_cell_value(&mut self, sheet: usize, row: usize, col: usize) -> Result<Option<Value>, EvalError> {
        Evaluator::get_cell_value(self, sheet, row, col)
    }

    fn function_names(&self) -> Vec<String> {
        Evaluator::function_names(self).into_iter().map(str::to_string).collect()
    }
}

/// Result of [`FormulaBridge::apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Literal text, no evaluation.
    Plain,
    /// A formula that still looks like it is being typed.
    Deferred,
    Evaluated,
    /// The engine returned no value (`thrown == false`) or raised an error.
    Failed { thrown: bool },
}

/// How eagerly [`FormulaBridge::apply_with`] reports failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyMode {
    /// Final text: failures show the sentinel and flag the cell.
    Commit,
    /// Text mid-typing: a failing formula is shown unevaluated instead.
    Live,
}

/// Whether `=`-prefixed text is plausibly finished: a non-empty body with
/// balanced parentheses outside string literals that does not end in an
/// operator, comma or open parenthesis.
pub fn is_complete_formula(text: &str) -> bool {
    let Some(body) = text.strip_prefix('=') else {
        return false;
    };
    let body = body.trim();
    if body.is_empty() {
        return false;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for ch in body.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    if in_string || depth != 0 {
        return false;
    }

    !body.ends_with(['+', '-', '*', '/', '%', '^', '&', '|', '<', '>', '=', '!', ',', '(', ':', '.'])
}

/// Transient error marks keyed by sheet number and coordinate.
#[derive(Clone, Debug)]
pub struct ErrorFlags {
    duration: Duration,
    expires: HashMap<(u32, CellRef), Instant>,
}

impl ErrorFlags {
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(2);

    pub fn new(duration: Duration) -> Self {
        ErrorFlags {
            duration,
            expires: HashMap::new(),
        }
    }

    pub fn flag(&mut self, sheet_number: u32, coord: CellRef, now: Instant) {
        self.expires.insert((sheet_number, coord), now + self.duration);
    }

    pub fn clear(&mut self, sheet_number: u32, coord: CellRef) {
        self.expires.remove(&(sheet_number, coord));
    }

    pub fn is_errored(&self, sheet_number: u32, coord: CellRef, now: Instant) -> bool {
        self.expires
            .get(&(sheet_number, coord))
            .is_some_and(|expires| *expires > now)
    }

    /// Forget expired marks.
    pub fn purge(&mut self, now: Instant) {
        self.expires.retain(|_, expires| *expires > now);
    }
}

impl Default for ErrorFlags {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DURATION)
    }
}

pub struct FormulaBridge<E: FormulaEngine = Evaluator> {
    engine: E,
    flags: ErrorFlags,
}

impl FormulaBridge<Evaluator> {
    pub fn new() -> Self {
        Self::with_engine(Evaluator::new())
    }
}

impl Default for FormulaBridge<Evaluator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: FormulaEngine> FormulaBridge<E> {
    pub fn with_engine(engine: E) -> Self {
        FormulaBridge {
            engine,
            flags: ErrorFlags::default(),
        }
    }

    pub fn set_error_duration(&mut self, duration: Duration) {
        self.flags = ErrorFlags::new(duration);
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn flags(&self) -> &ErrorFlags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut ErrorFlags {
        &mut self.flags
    }

    pub fn function_names(&self) -> Vec<String> {
        self.engine.function_names()
    }

    /// Register engine sheets up to the one backing `sheet_number`.
    pub fn ensure_sheet(&mut self, sheet_number: u32) -> usize {
        let index = engine_index(sheet_number);
        while self.engine.sheet_count() <= index {
            let next = self.engine.sheet_count() + 1;
            self.engine.add_sheet(&format!("Sheet{next}"));
        }
        index
    }

    pub fn apply(&mut self, sheet: &mut Sheet, coord: CellRef, text: &str) -> ApplyOutcome {
        self.apply_with(sheet, coord, text, ApplyMode::Commit)
    }

    /// Write `text` into the engine and the store.
    pub fn apply_with(&mut self, sheet: &mut Sheet, coord: CellRef, text: &str, mode: ApplyMode) -> ApplyOutcome {
        let number = sheet.sheet_number;
        let index = self.ensure_sheet(number);

        if !text.starts_with('=') {
            self.push(index, coord, text);
            sheet.set(coord, CellUpdate::literal(text));
            self.flags.clear(number, coord);
            return ApplyOutcome::Plain;
        }

        if !is_complete_formula(text) {
            self.defer(sheet, index, coord, text);
            return ApplyOutcome::Deferred;
        }

        let result = self
            .engine
            .set_cell_contents(index, coord.row, coord.col, text)
            .and_then(|_| self.engine.get_cell_value(index, coord.row, coord.col));

        match (result, mode) {
            (Ok(Some(value)), _) => {
                sheet.set(coord, CellUpdate::formula(text, value.to_string()));
                self.flags.clear(number, coord);
                debug!(cell = %coord, formula = text, "formula evaluated");
                ApplyOutcome::Evaluated
            }
            (_, ApplyMode::Live) => {
                self.defer(sheet, index, coord, text);
                ApplyOutcome::Deferred
            }
            (Ok(None), ApplyMode::Commit) => {
                warn!(cell = %coord, formula = text, "formula produced no value");
                sheet.set(coord, CellUpdate::formula(text, ERROR_SENTINEL));
                ApplyOutcome::Failed { thrown: false }
            }
            (Err(err), ApplyMode::Commit) => {
                warn!(cell = %coord, formula = text, error = %err, "formula evaluation failed");
                sheet.set(coord, CellUpdate::formula(text, ERROR_SENTINEL));
                self.flags.flag(number, coord, Instant::now());
                ApplyOutcome::Failed { thrown: true }
            }
        }
    }

    /// Clear a cell in the store and the engine.
    pub fn clear(&mut self, sheet: &mut Sheet, coord: CellRef, mode: ClearMode) {
        let number = sheet.sheet_number;
        let index = self.ensure_sheet(number);
        self.push(index, coord, "");
        sheet.clear(coord, mode);
        self.flags.clear(number, coord);
    }

    /// Re-read every formula cell and write back changed results.
    /// Returns the coordinates whose `computed` changed.
    pub fn recompute_dependents(&mut self, sheet: &mut Sheet) -> Vec<CellRef> {
        let index = self.ensure_sheet(sheet.sheet_number);
        let mut changed = Vec::new();

        for coord in sheet.formula_cells() {
            let Some(cell) = sheet.peek(coord) else {
                continue;
            };
            if !is_complete_formula(&cell.formula) {
                continue;
            }
            let computed = match self.engine.get_cell_value(index, coord.row, coord.col) {
                Ok(Some(value)) => value.to_string(),
                Ok(None) | Err(_) => ERROR_SENTINEL.to_string(),
            };
            if cell.computed != computed {
                sheet.set(coord, CellUpdate::computed(computed));
                changed.push(coord);
            }
        }

        debug!(sheet = sheet.sheet_number, changed = changed.len(), "recompute sweep");
        changed
    }

    /// Push every stored cell of `sheet` into the engine, then refresh
    /// formula results.
    pub fn load_sheet(&mut self, sheet: &mut Sheet) -> Vec<CellRef> {
        let index = self.ensure_sheet(sheet.sheet_number);
        let entries: Vec<(CellRef, String)> = sheet
            .cells()
            .filter(|(_, cell)| !cell.edit_text().is_empty())
            .map(|(coord, cell)| (*coord, cell.edit_text().to_string()))
            .collect();

        for (coord, text) in &entries {
            if text.starts_with('=') && !is_complete_formula(text) {
                continue;
            }
            self.push(index, *coord, text);
        }
        debug!(sheet = sheet.sheet_number, cells = entries.len(), "sheet loaded into engine");
        self.recompute_dependents(sheet)
    }

    fn defer(&mut self, sheet: &mut Sheet, index: usize, coord: CellRef, text: &str) {
        self.push(index, coord, "");
        sheet.set(coord, CellUpdate::formula(text, text));
        self.flags.clear(sheet.sheet_number, coord);
    }

    fn push(&mut self, index: usize, coord: CellRef, text: &str) {
        if let Err(err) = self.engine.set_cell_contents(index, coord.row, coord.col, text) {
            warn!(cell = %coord, error = %err, "engine rejected cell contents");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn a1(id: &str) -> CellRef {
        CellRef::decode(id).unwrap()
    }

    fn computed(sheet: &Sheet, id: &str) -> String {
        sheet.peek(a1(id)).map(|c| c.computed.clone()).unwrap_or_default()
    }

    #[test]
    fn test_completeness_check() {
        for text in ["=A1+1", "=SUM(A1:A3)", "=1", r#"=CONCAT("(", A1)"#, "=ROUND(A1, 2)"] {
            assert!(is_complete_formula(text), "{text}");
        }
        for text in ["=", "= ", "=SUM(A1", "=A1+", "=SUM(A1,", "=)(", "=SUM(", r#"=LEN("abc"#, "plain"] {
            assert!(!is_complete_formula(text), "{text}");
        }
    }

    #[test]
    fn test_plain_values() {
        let mut bridge = FormulaBridge::new();
        let mut sheet = Sheet::new(1);
        assert_eq!(bridge.apply(&mut sheet, a1("A1"), "hello"), ApplyOutcome::Plain);
        let cell = sheet.peek(a1("A1")).unwrap();
        assert_eq!((cell.value.as_str(), cell.formula.as_str(), cell.computed.as_str()), ("hello", "", "hello"));
    }

    #[test]
    fn test_incomplete_formula_is_not_evaluated() {
        let mut bridge = FormulaBridge::new();
        let mut sheet = Sheet::new(1);
        assert_eq!(bridge.apply(&mut sheet, a1("B1"), "=SUM(A1"), ApplyOutcome::Deferred);
        assert_eq!(computed(&sheet, "B1"), "=SUM(A1");
        assert!(bridge.recompute_dependents(&mut sheet).is_empty());
        assert_eq!(computed(&sheet, "B1"), "=SUM(A1");
    }

    #[test]
    fn test_dependency_propagation_via_recompute() {
        let mut bridge = FormulaBridge::new();
        let mut sheet = Sheet::new(1);
        bridge.apply(&mut sheet, a1("A1"), "1");
        assert_eq!(bridge.apply(&mut sheet, a1("B1"), "=A1+1"), ApplyOutcome::Evaluated);
        assert_eq!(computed(&sheet, "B1"), "2");

        bridge.apply(&mut sheet, a1("A1"), "5");
        assert_eq!(bridge.recompute_dependents(&mut sheet), vec![a1("B1")]);
        assert_eq!(computed(&sheet, "B1"), "6");
        assert!(bridge.recompute_dependents(&mut sheet).is_empty());
    }

    #[test]
    fn test_error_sentinel_keeps_formula_and_flags() {
        let mut bridge = FormulaBridge::new();
        let mut sheet = Sheet::new(1);
        let outcome = bridge.apply(&mut sheet, a1("C3"), "=nosuch(1)");
        assert_eq!(outcome, ApplyOutcome::Failed { thrown: true });

        let cell = sheet.peek(a1("C3")).unwrap();
        assert_eq!(cell.computed, ERROR_SENTINEL);
        assert_eq!(cell.formula, "=nosuch(1)");
        assert_eq!(cell.value, "=nosuch(1)");

        let now = Instant::now();
        assert!(bridge.flags().is_errored(1, a1("C3"), now));
        assert!(!bridge.flags().is_errored(1, a1("C3"), now + Duration::from_secs(3)));

        bridge.apply(&mut sheet, a1("C3"), "=1+2");
        assert!(!bridge.flags().is_errored(1, a1("C3"), now));
    }

    #[test]
    fn test_null_result_is_sentinel_without_flag() {
        let mut bridge = FormulaBridge::new();
        let mut sheet = Sheet::new(1);
        bridge.apply(&mut sheet, a1("A1"), "text");
        let outcome = bridge.apply(&mut sheet, a1("A2"), "=A1*2");
        assert_eq!(outcome, ApplyOutcome::Failed { thrown: false });
        assert_eq!(computed(&sheet, "A2"), ERROR_SENTINEL);
        assert!(!bridge.flags().is_errored(1, a1("A2"), Instant::now()));
    }

    #[test]
    fn test_live_mode_hides_failures() {
        let mut bridge = FormulaBridge::new();
        let mut sheet = Sheet::new(1);
        let outcome = bridge.apply_with(&mut sheet, a1("A1"), "=SU", ApplyMode::Live);
        assert_eq!(outcome, ApplyOutcome::Deferred);
        assert_eq!(computed(&sheet, "A1"), "=SU");
    }

    #[test]
    fn test_sheet_numbers_map_to_engine_indices() {
        let mut bridge = FormulaBridge::new();
        let mut third = Sheet::new(3);
        let mut first = Sheet::new(1);
        assert_eq!(bridge.ensure_sheet(3), 2);
        bridge.apply(&mut third, a1("A1"), "30");
        bridge.apply(&mut first, a1("A1"), "10");
        bridge.apply(&mut third, a1("A2"), "=A1+1");
        bridge.apply(&mut first, a1("A2"), "=A1+1");
        assert_eq!(computed(&third, "A2"), "31");
        assert_eq!(computed(&first, "A2"), "11");
        assert_eq!(bridge.engine().sheet_count(), 3);
    }

    #[test]
    fn test_load_sheet_evaluates_stored_formulas() {
        let mut sheet = Sheet::new(1);
        sheet.set(a1("A1"), CellUpdate::literal("4"));
        sheet.set(a1("A2"), CellUpdate::formula("=A1*A1", ""));
        sheet.set(a1("A3"), CellUpdate::formula("=SUM(A1", "=SUM(A1"));

        let mut bridge = FormulaBridge::new();
        assert_eq!(bridge.load_sheet(&mut sheet), vec![a1("A2")]);
        assert_eq!(computed(&sheet, "A2"), "16");
        assert_eq!(computed(&sheet, "A3"), "=SUM(A1");
    }

    #[test]
    fn test_clear_removes_engine_contents() {
        let mut bridge = FormulaBridge::new();
        let mut sheet = Sheet::new(1);
        bridge.apply(&mut sheet, a1("A1"), "3");
        bridge.apply(&mut sheet, a1("B1"), "=A1+1");
        bridge.clear(&mut sheet, a1("A1"), ClearMode::Contents);
        bridge.recompute_dependents(&mut sheet);
        assert_eq!(computed(&sheet, "A1"), "");
        assert_eq!(computed(&sheet, "B1"), "1");
    }

    struct Scripted {
        sheets: usize,
        result: Option<Value>,
    }

    impl FormulaEngine for Scripted {
        fn add_sheet(&mut self, _name: &str) -> usize {
            self.sheets += 1;
            self.sheets - 1
        }
        fn sheet_count(&self) -> usize {
            self.sheets
        }
        fn set_cell_contents(&mut self, _: usize, _: usize, _: usize, _: &str) -> Result<(), EvalError> {
            Ok(())
        }
        fn get_cell_value(&mut self, _: usize, _: usize, _: usize) -> Result<Option<Value>, EvalError> {
            Ok(self.result.clone())
        }
        fn function_names(&self) -> Vec<String> {
            vec!["SUM".to_string()]
        }
    }

    #[test]
    fn test_scripted_engine() {
        let mut bridge = FormulaBridge::with_engine(Scripted {
            sheets: 0,
            result: Some(Value::Text("ok".into())),
        });
        let mut sheet = Sheet::new(2);
        assert_eq!(bridge.apply(&mut sheet, a1("A1"), "=anything"), ApplyOutcome::Evaluated);
        assert_eq!(computed(&sheet, "A1"), "ok");
        assert_eq!(bridge.engine().sheet_count(), 2);
    }
}
