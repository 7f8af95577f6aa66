//! Formula preprocessing.
//!
//! Before formulas can be evaluated by Rhai, spreadsheet references must be
//! rewritten into builtin calls qualified by the evaluating sheet:
//!
//! - `A1` -> `CELL(s, 0, 0)` (numeric read) and `@A1` -> `VALUE(s, 0, 0)` (typed read)
//! - `SUM(A1:B5)` -> `SUM_RANGE(s, 0, 0, 4, 1)` (sheet, then row/col of both corners)
//! - `sum(`, `Round(` ... -> `SUM(`, `ROUND(` (builtin names are case-insensitive)
//! - `ROW()` / `COL()` -> the 1-based position of the evaluating cell

use regex::Regex;
use std::sync::OnceLock;

use super::cell_ref::CellRef;
use super::deps::cell_ref_re;

fn value_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@([A-Za-z]+)([0-9]+)\b").expect("typed reference regex must compile"))
}

fn row_fn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bROW\(\s*\)").expect("ROW() regex must compile"))
}

fn col_fn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bCOL\(\s*\)").expect("COL() regex must compile"))
}

/// Rewrite a formula body for evaluation on engine sheet `sheet`.
pub fn preprocess_script(script: &str, sheet: usize) -> String {
    preprocess_script_with_context(script, sheet, None)
}

/// Rewrite a formula body, resolving ROW()/COL() against `context` when given.
pub fn preprocess_script_with_context(
    script: &str,
    sheet: usize,
    context: Option<&CellRef>,
) -> String {
    let script = match context {
        Some(cell_ref) => {
            let script = row_fn_re().replace_all(script, (cell_ref.row + 1).to_string());
            col_fn_re()
                .replace_all(&script, (cell_ref.col + 1).to_string())
                .to_string()
        }
        None => script.to_string(),
    };

    map_outside_strings(&script, |seg| rewrite_segment(seg, sheet))
}

fn rewrite_segment(seg: &str, sheet: usize) -> String {
    let with_ranges = crate::builtins::range_fn_re()
        .replace_all(seg, |caps: &regex::Captures| {
            let Some(rhai_name) = crate::builtins::range_rhai_name(&caps[1]) else {
                return caps[0].to_string();
            };
            match (CellRef::parse_reference(&caps[2]), CellRef::parse_reference(&caps[3])) {
                (Ok(start), Ok(end)) => format!(
                    "{}({}, {}, {}, {}, {})",
                    rhai_name, sheet, start.row, start.col, end.row, end.col
                ),
                _ => caps[0].to_string(),
            }
        })
        .to_string();

    let with_names = crate::builtins::scalar_fn_re()
        .replace_all(&with_ranges, |caps: &regex::Captures| {
            format!("{}(", caps[1].to_ascii_uppercase())
        })
        .to_string();

    let with_values = value_ref_re()
        .replace_all(&with_names, |caps: &regex::Captures| {
            match CellRef::parse_reference(&format!("{}{}", &caps[1], &caps[2])) {
                Ok(cr) => format!("VALUE({}, {}, {})", sheet, cr.row, cr.col),
                Err(_) => caps[0].to_string(),
            }
        })
        .to_string();

    cell_ref_re()
        .replace_all(&with_values, |caps: &regex::Captures| {
            match CellRef::parse_reference(&format!("{}{}", &caps[1], &caps[2])) {
                Ok(cr) => format!("CELL({}, {}, {})", sheet, cr.row, cr.col),
                Err(_) => caps[0].to_string(),
            }
        })
        .to_string()
}

/// Apply `f` to every segment of `script` that lies outside a double-quoted
/// string literal; literals are copied through untouched.
fn map_outside_strings(script: &str, f: impl Fn(&str) -> String) -> String {
    let bytes = script.as_bytes();
    let mut out = String::with_capacity(script.len());
    let mut seg_start = 0;
    let mut in_string = false;
    let mut backslashes = 0usize;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if b == b'\\' {
                backslashes += 1;
                continue;
            }
            if b == b'"' && backslashes.is_multiple_of(2) {
                out.push_str(&script[seg_start..=i]);
                in_string = false;
                seg_start = i + 1;
            }
            backslashes = 0;
            continue;
        }

        if b == b'"' {
            out.push_str(&f(&script[seg_start..i]));
            in_string = true;
            seg_start = i;
            backslashes = 0;
        }
    }

    if seg_start < script.len() {
        if in_string {
            out.push_str(&script[seg_start..]);
        } else {
            out.push_str(&f(&script[seg_start..]));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_simple_refs() {
        assert_eq!(preprocess_script("A1", 0), "CELL(0, 0, 0)");
        assert_eq!(preprocess_script("B1", 2), "CELL(2, 0, 1)");
        assert_eq!(preprocess_script("A2 + 10", 0), "CELL(0, 1, 0) + 10");
    }

    #[test]
    fn test_preprocess_typed_refs() {
        assert_eq!(preprocess_script("@A1 + B1", 0), "VALUE(0, 0, 0) + CELL(0, 0, 1)");
    }

    #[test]
    fn test_preprocess_ranges_and_names() {
        assert_eq!(preprocess_script("sum(A1:B3)", 1), "SUM_RANGE(1, 0, 0, 2, 1)");
        assert_eq!(preprocess_script("avg(A1:A2)", 0), "AVERAGE_RANGE(0, 0, 0, 1, 0)");
        assert_eq!(preprocess_script("round(A1, 2)", 0), "ROUND(CELL(0, 0, 0), 2)");
    }

    #[test]
    fn test_preprocess_leaves_string_literals_alone() {
        assert_eq!(
            preprocess_script(r#"CONCAT("A1", B1)"#, 0),
            r#"CONCAT("A1", CELL(0, 0, 1))"#
        );
    }

    #[test]
    fn test_preprocess_row_col_context() {
        let here = CellRef::new(4, 2);
        assert_eq!(preprocess_script_with_context("ROW() * COL()", 0, Some(&here)), "5 * 3");
    }
}
