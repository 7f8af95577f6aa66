//! Built-in spreadsheet functions (Rust) and their metadata.
//!
//! Conventions:
//! - Spreadsheet-facing built-in names are ALL CAPS (e.g. `SUM`, `ROUND`), and
//!   formulas may spell them in any case; preprocessing normalizes them.
//! - Range built-ins rewrite to ALLCAPS `_RANGE` Rhai functions that take the
//!   sheet index and both corners (e.g. `SUM(A1:B2)` -> `SUM_RANGE(0, 0, 0, 1, 1)`).
//! - If you add a built-in, add it to `BUILTINS` and register it in
//!   `register_builtins`.

use crate::engine::{CellKey, CellType, Grid, ValueCache, preprocess_script_with_context};
use chrono::Local;
use rand::Rng;
use regex::Regex;
use rhai::{Dynamic, Engine, EvalAltResult, NativeCallContext, Position};

use std::cell::{Cell, RefCell};
use std::sync::OnceLock;

/// Formula cells evaluated through references may nest at most this deep.
const MAX_NESTED_EVALUATIONS: usize = 64;

thread_local! {
    static EVALUATING: RefCell<Vec<CellKey>> = const { RefCell::new(Vec::new()) };
    static REENTERED: Cell<Option<CellKey>> = const { Cell::new(None) };
}

/// Marks a formula cell as being evaluated on this thread until dropped.
pub(crate) struct EvaluationGuard;

impl EvaluationGuard {
    /// None when `key` is already being evaluated further up the stack, or
    /// nesting has reached [`MAX_NESTED_EVALUATIONS`]. The refused key is
    /// recorded for [`take_reentry`].
    pub(crate) fn enter(key: CellKey) -> Option<EvaluationGuard> {
        let entered = EVALUATING.with_borrow_mut(|stack| {
            if stack.contains(&key) || stack.len() >= MAX_NESTED_EVALUATIONS {
                return false;
            }
            stack.push(key);
            true
        });
        if entered {
            Some(EvaluationGuard)
        } else {
            REENTERED.set(Some(key));
            None
        }
    }
}

impl Drop for EvaluationGuard {
    fn drop(&mut self) {
        EVALUATING.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}

/// The cell a nested evaluation refused since the last call, if any.
pub(crate) fn take_reentry() -> Option<CellKey> {
    REENTERED.take()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinKind {
    /// Takes a single `A1:B2` range argument.
    Range,
    /// Ordinary function over values.
    Scalar,
}

pub struct Builtin {
    pub sheet_name: &'static str,
    pub rhai_name: &'static str,
    pub kind: BuiltinKind,
    pub description: &'static str,
}

const fn range(sheet_name: &'static str, rhai_name: &'static str, description: &'static str) -> Builtin {
    Builtin {
        sheet_name,
        rhai_name,
        kind: BuiltinKind::Range,
        description,
    }
}

const fn scalar(sheet_name: &'static str, description: &'static str) -> Builtin {
    Builtin {
        sheet_name,
        rhai_name: sheet_name,
        kind: BuiltinKind::Scalar,
        description,
    }
}

pub const BUILTINS: &[Builtin] = &[
    range("SUM", "SUM_RANGE", "Sum of numeric values in a cell range"),
    range("AVERAGE", "AVERAGE_RANGE", "Average of numeric values in a cell range"),
    range("AVG", "AVERAGE_RANGE", "Alias of AVERAGE"),
    range("COUNT", "COUNT_RANGE", "Count of numeric cells in a cell range"),
    range("MIN", "MIN_RANGE", "Minimum numeric value in a cell range"),
    range("MAX", "MAX_RANGE", "Maximum numeric value in a cell range"),
    range("PRODUCT", "PRODUCT_RANGE", "Product of numeric values in a cell range"),
    scalar("ABS", "Absolute value"),
    scalar("ROUND", "Round to a number of decimal places"),
    scalar("SQRT", "Square root"),
    scalar("POWER", "Raise a number to a power"),
    scalar("MOD", "Remainder after division"),
    scalar("IF", "Choose between two values"),
    scalar("RAND", "Random number in [0, 1)"),
    scalar("TODAY", "Current date"),
    scalar("NOW", "Current date and time"),
    scalar("LEN", "Length of a value's text"),
    scalar("UPPER", "Uppercase text"),
    scalar("LOWER", "Lowercase text"),
    scalar("CONCAT", "Join values as text"),
];

/// Regex that matches built-in range calls like `SUM(A1:B5)`, in any case.
///
/// Captures:
/// - group 1: function name (e.g. `SUM`)
/// - group 2: start cell ref (e.g. `A1`)
/// - group 3: end cell ref (e.g. `B5`)
pub fn range_fn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let names = names_of(BuiltinKind::Range);
        Regex::new(&format!(
            r"(?i)\b({})\(\s*([A-Za-z]+[0-9]+)\s*:\s*([A-Za-z]+[0-9]+)\s*\)",
            names
        ))
        .expect("built-in range regex must compile")
    })
}

/// Regex that matches a scalar built-in call name followed by `(`, in any case.
pub fn scalar_fn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let names = names_of(BuiltinKind::Scalar);
        Regex::new(&format!(r"(?i)\b({})\s*\(", names)).expect("built-in scalar regex must compile")
    })
}

fn names_of(kind: BuiltinKind) -> String {
    BUILTINS
        .iter()
        .filter(|b| b.kind == kind)
        .map(|b| b.sheet_name)
        .collect::<Vec<_>>()
        .join("|")
}

pub fn range_rhai_name(sheet_name: &str) -> Option<&'static str> {
    BUILTINS
        .iter()
        .find(|b| b.kind == BuiltinKind::Range && b.sheet_name.eq_ignore_ascii_case(sheet_name))
        .map(|b| b.rhai_name)
}

/// Spreadsheet-facing names of every built-in, sorted.
pub fn builtin_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = BUILTINS.iter().map(|b| b.sheet_name).collect();
    names.sort_unstable();
    names
}

/// One-line help for a built-in, by spreadsheet-facing name in any case.
pub fn builtin_description(sheet_name: &str) -> Option<&'static str> {
    BUILTINS
        .iter()
        .find(|b| b.sheet_name.eq_ignore_ascii_case(sheet_name))
        .map(|b| b.description)
}

fn invalid_arg(message: &str) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(message.into(), Position::NONE).into()
}

fn to_index(value: i64, label: &str) -> Result<usize, Box<EvalAltResult>> {
    usize::try_from(value).map_err(|_| invalid_arg(&format!("{} must be >= 0", label)))
}

fn to_number(value: &Dynamic) -> Result<f64, Box<EvalAltResult>> {
    if let Ok(n) = value.as_float() {
        return Ok(n);
    }
    if let Ok(n) = value.as_int() {
        return Ok(n as f64);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(if b { 1.0 } else { 0.0 });
    }
    Err(invalid_arg(&format!("expected a number, got {}", value.type_name())))
}

fn truthy(value: &Dynamic) -> bool {
    if let Ok(b) = value.as_bool() {
        return b;
    }
    to_number(value).map(|n| n != 0.0).unwrap_or(false)
}

fn display(value: &Dynamic) -> String {
    crate::engine::format_dynamic(value)
}

/// Evaluate a formula cell reached through a reference from another formula.
/// Ordinary failures read as unit; re-entering a cell is an error that
/// aborts the whole evaluation.
fn eval_script_cell(
    ctx: &NativeCallContext,
    cache: &ValueCache,
    key: CellKey,
    script: &str,
) -> Result<Dynamic, Box<EvalAltResult>> {
    let Some(_guard) = EvaluationGuard::enter(key) else {
        return Err(invalid_arg(&format!("circular reference at {}", key.cell)));
    };
    let processed = preprocess_script_with_context(script, key.sheet, Some(&key.cell));
    match ctx.engine().eval::<Dynamic>(&processed) {
        Ok(value) => {
            if !value.is_unit() {
                cache.insert(key, value.clone());
            }
            Ok(value)
        }
        Err(err) if REENTERED.get().is_some() => Err(err),
        Err(_) => Ok(Dynamic::UNIT),
    }
}

/// Typed value of a cell: numbers as FLOAT, text as string, empty as "".
fn cell_dynamic(
    ctx: &NativeCallContext,
    grid: &Grid,
    cache: &ValueCache,
    key: CellKey,
) -> Result<Dynamic, Box<EvalAltResult>> {
    if let Some(cached) = cache.get(&key) {
        return Ok(cached.clone());
    }
    let Some(cell) = grid.get(&key) else {
        return Ok(Dynamic::from(String::new()));
    };
    match &cell.contents {
        CellType::Empty => Ok(Dynamic::from(String::new())),
        CellType::Number(n) => Ok(Dynamic::from_float(*n)),
        CellType::Text(s) => Ok(Dynamic::from(s.clone())),
        CellType::Script(s) => {
            let script = s.clone();
            drop(cell);
            eval_script_cell(ctx, cache, key, &script)
        }
    }
}

/// Numeric value of a cell: empty reads as 0, text and failed formulas as NaN.
fn cell_number(
    ctx: &NativeCallContext,
    grid: &Grid,
    cache: &ValueCache,
    key: CellKey,
) -> Result<f64, Box<EvalAltResult>> {
    let value = cell_dynamic(ctx, grid, cache, key)?;
    if let Ok(s) = value.clone().into_string() {
        return Ok(if s.is_empty() { 0.0 } else { f64::NAN });
    }
    Ok(to_number(&value).unwrap_or(f64::NAN))
}

/// Numeric values in a range, skipping empty and non-numeric cells.
fn range_numbers(
    ctx: &NativeCallContext,
    grid: &Grid,
    cache: &ValueCache,
    args: [i64; 5],
) -> Result<Vec<f64>, Box<EvalAltResult>> {
    let [sheet, r1, c1, r2, c2] = args;
    let sheet = to_index(sheet, "sheet")?;
    let (r1, r2) = (to_index(r1, "row")?, to_index(r2, "row")?);
    let (c1, c2) = (to_index(c1, "col")?, to_index(c2, "col")?);

    let mut values = Vec::new();
    for row in r1.min(r2)..=r1.max(r2) {
        for col in c1.min(c2)..=c1.max(c2) {
            let value = cell_dynamic(ctx, grid, cache, CellKey::new(sheet, row, col))?;
            if value.is_string() || value.is_unit() {
                continue;
            }
            if let Ok(n) = to_number(&value) {
                values.push(n);
            }
        }
    }
    Ok(values)
}

fn register_range(
    engine: &mut Engine,
    name: &'static str,
    grid: &Grid,
    cache: &ValueCache,
    reduce: fn(&[f64]) -> Result<Dynamic, Box<EvalAltResult>>,
) {
    let grid = grid.clone();
    let cache = cache.clone();
    engine.register_fn(
        name,
        move |ctx: NativeCallContext,
              sheet: i64,
              r1: i64,
              c1: i64,
              r2: i64,
              c2: i64|
              -> Result<Dynamic, Box<EvalAltResult>> {
            let values = range_numbers(&ctx, &grid, &cache, [sheet, r1, c1, r2, c2])?;
            reduce(&values)
        },
    );
}

/// Register all built-in functions into the Rhai engine.
pub fn register_builtins(engine: &mut Engine, grid: Grid, value_cache: ValueCache) {
    // CELL(sheet, row, col): numeric value at cell
    let grid_cell = grid.clone();
    let cache_cell = value_cache.clone();
    engine.register_fn(
        "CELL",
        move |ctx: NativeCallContext, sheet: i64, row: i64, col: i64| -> Result<f64, Box<EvalAltResult>> {
            let key = CellKey::new(to_index(sheet, "sheet")?, to_index(row, "row")?, to_index(col, "col")?);
            cell_number(&ctx, &grid_cell, &cache_cell, key)
        },
    );

    // VALUE(sheet, row, col): typed value at cell (used for @A1 references)
    let grid_value = grid.clone();
    let cache_value = value_cache.clone();
    engine.register_fn(
        "VALUE",
        move |ctx: NativeCallContext, sheet: i64, row: i64, col: i64| -> Result<Dynamic, Box<EvalAltResult>> {
            let key = CellKey::new(to_index(sheet, "sheet")?, to_index(row, "row")?, to_index(col, "col")?);
            cell_dynamic(&ctx, &grid_value, &cache_value, key)
        },
    );

    register_range(engine, "SUM_RANGE", &grid, &value_cache, |v| {
        Ok(Dynamic::from_float(v.iter().sum()))
    });
    register_range(engine, "AVERAGE_RANGE", &grid, &value_cache, |v| {
        if v.is_empty() {
            return Err(invalid_arg("AVERAGE of an empty range"));
        }
        Ok(Dynamic::from_float(v.iter().sum::<f64>() / v.len() as f64))
    });
    register_range(engine, "COUNT_RANGE", &grid, &value_cache, |v| {
        Ok(Dynamic::from_int(v.len() as i64))
    });
    register_range(engine, "MIN_RANGE", &grid, &value_cache, |v| {
        Ok(Dynamic::from_float(v.iter().copied().reduce(f64::min).unwrap_or(0.0)))
    });
    register_range(engine, "MAX_RANGE", &grid, &value_cache, |v| {
        Ok(Dynamic::from_float(v.iter().copied().reduce(f64::max).unwrap_or(0.0)))
    });
    register_range(engine, "PRODUCT_RANGE", &grid, &value_cache, |v| {
        if v.is_empty() {
            return Ok(Dynamic::from_float(0.0));
        }
        Ok(Dynamic::from_float(v.iter().product()))
    });

    engine.register_fn("ABS", |x: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(to_number(&x)?.abs())
    });
    engine.register_fn("SQRT", |x: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(to_number(&x)?.sqrt())
    });
    engine.register_fn(
        "ROUND",
        |x: Dynamic, places: i64| -> Result<f64, Box<EvalAltResult>> {
            const MAX_DECIMALS: i64 = 12;
            if !(0..=MAX_DECIMALS).contains(&places) {
                return Err(invalid_arg(&format!(
                    "decimals must be between 0 and {}",
                    MAX_DECIMALS
                )));
            }
            let factor = 10f64.powi(places as i32);
            Ok((to_number(&x)? * factor).round() / factor)
        },
    );
    engine.register_fn("ROUND", |x: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(to_number(&x)?.round())
    });
    engine.register_fn(
        "POWER",
        |x: Dynamic, y: Dynamic| -> Result<f64, Box<EvalAltResult>> {
            Ok(to_number(&x)?.powf(to_number(&y)?))
        },
    );
    engine.register_fn(
        "MOD",
        |x: Dynamic, y: Dynamic| -> Result<f64, Box<EvalAltResult>> {
            let divisor = to_number(&y)?;
            if divisor == 0.0 {
                return Err(invalid_arg("MOD by zero"));
            }
            Ok(to_number(&x)?.rem_euclid(divisor))
        },
    );
    engine.register_fn("IF", |cond: Dynamic, then: Dynamic, otherwise: Dynamic| {
        if truthy(&cond) { then } else { otherwise }
    });
    engine.register_fn("RAND", || -> f64 { rand::thread_rng().r#gen::<f64>() });
    engine.register_fn("TODAY", || -> String {
        Local::now().format("%Y-%m-%d").to_string()
    });
    engine.register_fn("NOW", || -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    });
    engine.register_fn("LEN", |x: Dynamic| -> i64 { display(&x).chars().count() as i64 });
    engine.register_fn("UPPER", |x: Dynamic| -> String { display(&x).to_uppercase() });
    engine.register_fn("LOWER", |x: Dynamic| -> String { display(&x).to_lowercase() });
    engine.register_fn("CONCAT", |a: Dynamic, b: Dynamic| -> String {
        format!("{}{}", display(&a), display(&b))
    });
    engine.register_fn("CONCAT", |a: Dynamic, b: Dynamic, c: Dynamic| -> String {
        format!("{}{}{}", display(&a), display(&b), display(&c))
    });
}
