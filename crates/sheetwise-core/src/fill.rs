//! Drag-fill: axis choice, preview span and extrapolated values.

use std::collections::BTreeSet;

use tracing::debug;

use crate::selection::GridDims;
use crate::sheet::Sheet;
use sheetwise_engine::engine::{CellRef, format_number};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillAxis {
    Horizontal,
    Vertical,
}

/// Horizontal only when the column delta strictly exceeds the row delta.
pub fn compute_axis(source: CellRef, drag: CellRef) -> FillAxis {
    let dr = source.row.abs_diff(drag.row);
    let dc = source.col.abs_diff(drag.col);
    if dc > dr {
        FillAxis::Horizontal
    } else {
        FillAxis::Vertical
    }
}

/// Targets between `source` (exclusive) and `drag` (inclusive) along the fill
/// axis, each with its signed offset from the source. Targets outside `dims`
/// are skipped.
pub fn fill_span(source: CellRef, drag: CellRef, dims: GridDims) -> Vec<(CellRef, i64)> {
    let axis = compute_axis(source, drag);
    let (from, to) = match axis {
        FillAxis::Horizontal => (source.col as i64, drag.col as i64),
        FillAxis::Vertical => (source.row as i64, drag.row as i64),
    };
    let step = if to >= from { 1 } else { -1 };

    let mut span = Vec::new();
    let mut pos = from;
    while pos != to {
        pos += step;
        let offset = pos - from;
        let target = match axis {
            FillAxis::Horizontal => CellRef::new(source.row, pos as usize),
            FillAxis::Vertical => CellRef::new(pos as usize, source.col),
        };
        if dims.contains(target) {
            span.push((target, offset));
        }
    }
    span
}

/// Number held by fill-source text, if any: trimmed, finite.
fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Values written for each offset: a +1-per-cell series from a number, empty
/// from empty, the literal text otherwise.
pub fn fill_values(source_value: &str, offsets: &[i64]) -> Vec<String> {
    match parse_number(source_value) {
        Some(n) => offsets.iter().map(|off| format_number(n + *off as f64)).collect(),
        None => vec![source_value.to_string(); offsets.len()],
    }
}

/// Transient drag state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillState {
    pub source: CellRef,
    pub drag: CellRef,
}

#[derive(Clone, Debug, Default)]
pub struct FillEngine {
    state: Option<FillState>,
    preview: BTreeSet<CellRef>,
}

impl FillEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, source: CellRef) {
        self.state = Some(FillState { source, drag: source });
        self.preview.clear();
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<FillState> {
        self.state
    }

    /// Move the drag point and rebuild the preview.
    pub fn drag_to(&mut self, coord: CellRef, dims: GridDims) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.drag = coord;
        self.preview = fill_span(state.source, coord, dims)
            .into_iter()
            .map(|(target, _)| target)
            .collect();
    }

    pub fn preview_cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        self.preview.iter().copied()
    }

    pub fn is_previewed(&self, coord: CellRef) -> bool {
        self.preview.contains(&coord)
    }

    /// End the drag and return the writes to perform, reading the source's
    /// raw value from `sheet`.
    pub fn finish(&mut self, sheet: &Sheet, dims: GridDims) -> Vec<(CellRef, String)> {
        self.preview.clear();
        let Some(FillState { source, drag }) = self.state.take() else {
            return Vec::new();
        };
        let span = fill_span(source, drag, dims);
        let source_value = sheet.peek(source).map(|c| c.value.as_str()).unwrap_or("");
        let offsets: Vec<i64> = span.iter().map(|(_, off)| *off).collect();
        let writes: Vec<(CellRef, String)> = span
            .into_iter()
            .map(|(target, _)| target)
            .zip(fill_values(source_value, &offsets))
            .collect();
        debug!(source = %source, drag = %drag, targets = writes.len(), "fill finished");
        writes
    }

    pub fn cancel(&mut self) {
        self.state = None;
        self.preview.clear();
    }
}
