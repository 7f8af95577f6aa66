//! Dependency extraction from formula strings.
//!
//! Parses formula text to find all cell references (e.g., `A1`, `B2:C5`)
//! that the formula depends on. This is used for cache invalidation and
//! cycle detection.
//!
//! Handles:
//! - Simple cell references: `A1`, `B2`, typed references `@A1`
//! - Range references in functions: `SUM(A1:B5)`
//! - Ignores references inside string literals

use regex::Regex;
use std::sync::OnceLock;

use super::cell_ref::CellRef;

const MAX_DEPENDENCY_RANGE_CELLS: usize = 1_000_000;

/// Extract all cell references from a formula body as dependencies.
pub fn extract_dependencies(script: &str) -> Vec<CellRef> {
    let mut deps = Vec::new();

    let script = strip_string_literals(script);

    let range_re = crate::builtins::range_fn_re();

    // Remove range function calls first so their endpoints are not counted twice.
    let script_without_ranges = range_re.replace_all(&script, "").to_string();

    for caps in range_re.captures_iter(&script) {
        let (Ok(start), Ok(end)) = (CellRef::parse_reference(&caps[2]), CellRef::parse_reference(&caps[3])) else {
            continue;
        };
        let (min_row, max_row) = (start.row.min(end.row), start.row.max(end.row));
        let (min_col, max_col) = (start.col.min(end.col), start.col.max(end.col));

        let Some(cell_count) = (max_row - min_row + 1).checked_mul(max_col - min_col + 1) else {
            continue;
        };
        if cell_count > MAX_DEPENDENCY_RANGE_CELLS {
            continue;
        }

        for row in min_row..=max_row {
            for col in min_col..=max_col {
                deps.push(CellRef::new(row, col));
            }
        }
    }

    for caps in cell_ref_re().captures_iter(&script_without_ranges) {
        if let Ok(cr) = CellRef::parse_reference(&format!("{}{}", &caps[1], &caps[2])) {
            deps.push(cr);
        }
    }

    deps
}

pub(crate) fn cell_ref_re() -> &'static Regex {
    static CELL_RE: OnceLock<Regex> = OnceLock::new();
    CELL_RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z]+)([0-9]+)\b")
            .expect("dependency cell reference regex must compile")
    })
}

/// Blank out the contents of double-quoted string literals, keeping offsets.
pub(crate) fn strip_string_literals(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in script.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(' ');
                continue;
            }
            if ch == '\\' {
                escaped = true;
                out.push(' ');
                continue;
            }
            if ch == '"' {
                in_string = false;
                out.push('"');
            } else {
                out.push(' ');
            }
        } else if ch == '"' {
            in_string = true;
            out.push('"');
        } else {
            out.push(ch);
        }
    }

    out
}
