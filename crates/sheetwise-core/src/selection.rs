//! Selection engine: anchor/active tracking and the derived rectangle.

use serde::{Deserialize, Serialize};

use crate::sheet::Sheet;
use sheetwise_engine::engine::CellRef;

/// Grid bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDims {
    pub rows: usize,
    pub cols: usize,
}

impl GridDims {
    pub const DEFAULT_ROWS: usize = 50;
    pub const DEFAULT_COLS: usize = 26;

    pub const fn new(rows: usize, cols: usize) -> Self {
        GridDims { rows, cols }
    }

    pub fn contains(&self, coord: CellRef) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    /// Clamp signed coordinates into the grid.
    pub fn clamp(&self, row: i64, col: i64) -> CellRef {
        let max_row = self.rows.saturating_sub(1) as i64;
        let max_col = self.cols.saturating_sub(1) as i64;
        CellRef::new(row.clamp(0, max_row) as usize, col.clamp(0, max_col) as usize)
    }

    pub fn last_cell(&self) -> CellRef {
        CellRef::new(self.rows.saturating_sub(1), self.cols.saturating_sub(1))
    }
}

impl Default for GridDims {
    fn default() -> Self {
        GridDims::new(Self::DEFAULT_ROWS, Self::DEFAULT_COLS)
    }
}

/// A normalized cell rectangle (inclusive bounds).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl Rect {
    pub fn from_corners(a: CellRef, b: CellRef) -> Self {
        Rect {
            top: a.row.min(b.row),
            left: a.col.min(b.col),
            bottom: a.row.max(b.row),
            right: a.col.max(b.col),
        }
    }

    pub fn single(coord: CellRef) -> Self {
        Self::from_corners(coord, coord)
    }

    pub fn contains(&self, coord: CellRef) -> bool {
        (self.top..=self.bottom).contains(&coord.row) && (self.left..=self.right).contains(&coord.col)
    }

    pub fn is_single(&self) -> bool {
        self.top == self.bottom && self.left == self.right
    }

    pub fn top_left(&self) -> CellRef {
        CellRef::new(self.top, self.left)
    }

    pub fn bottom_right(&self) -> CellRef {
        CellRef::new(self.bottom, self.right)
    }

    /// Every covered coordinate in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + use<> {
        let (left, right) = (self.left, self.right);
        (self.top..=self.bottom).flat_map(move |row| (left..=right).map(move |col| CellRef::new(row, col)))
    }

    /// `A1` for a single cell, `A1:B2` otherwise, regardless of drag direction.
    pub fn label(&self) -> String {
        if self.is_single() {
            self.top_left().to_string()
        } else {
            format!("{}:{}", self.top_left(), self.bottom_right())
        }
    }
}

/// How a cell participates in the current selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Highlight {
    None,
    Selected,
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn delta(self) -> (i64, i64) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Commit-and-move keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    Tab,
    Enter,
}

/// Selection state. The rectangle always spans anchor to active; the active
/// cell is the most recently reached point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Selection {
    active: CellRef,
    anchor: Option<CellRef>,
}

impl Selection {
    pub fn new(coord: CellRef) -> Self {
        Selection {
            active: coord,
            anchor: Some(coord),
        }
    }

    pub fn active(&self) -> CellRef {
        self.active
    }

    pub fn anchor(&self) -> Option<CellRef> {
        self.anchor
    }

    pub fn select_single(&mut self, coord: CellRef) {
        self.active = coord;
        self.anchor = Some(coord);
    }

    /// Grow the rectangle from the anchor to `coord`. Without an anchor the
    /// current active cell becomes one.
    pub fn extend_to(&mut self, coord: CellRef) {
        if self.anchor.is_none() {
            self.anchor = Some(self.active);
        }
        self.active = coord;
    }

    pub fn rect(&self) -> Rect {
        match self.anchor {
            Some(anchor) => Rect::from_corners(anchor, self.active),
            None => Rect::single(self.active),
        }
    }

    pub fn name_box_label(&self) -> String {
        self.rect().label()
    }

    pub fn highlight(&self, coord: CellRef) -> Highlight {
        if coord == self.active {
            return Highlight::Active;
        }
        let rect = self.rect();
        if !rect.is_single() && rect.contains(coord) {
            Highlight::Selected
        } else {
            Highlight::None
        }
    }

    /// Arrow-key movement, clamped to the grid. With `extend` the anchor is
    /// kept (or set to the pre-move active cell) and the rectangle grows.
    pub fn move_by(&mut self, direction: Direction, extend: bool, dims: GridDims) -> CellRef {
        let (dr, dc) = direction.delta();
        let target = dims.clamp(self.active.row as i64 + dr, self.active.col as i64 + dc);
        if extend {
            self.extend_to(target);
        } else {
            self.select_single(target);
        }
        target
    }

    /// Tab/Enter movement. Tab at a row edge wraps to the other edge of the
    /// next (or previous) row, staying on the first or last row at the grid
    /// ends. Enter never moves past the first or last row.
    pub fn advance(&mut self, advance: Advance, reverse: bool, dims: GridDims) -> CellRef {
        let CellRef { row, col } = self.active;
        let last = dims.last_cell();
        let target = match (advance, reverse) {
            (Advance::Tab, false) if col < last.col => CellRef::new(row, col + 1),
            (Advance::Tab, false) => CellRef::new((row + 1).min(last.row), 0),
            (Advance::Tab, true) if col > 0 => CellRef::new(row, col - 1),
            (Advance::Tab, true) => CellRef::new(row.saturating_sub(1), last.col),
            (Advance::Enter, false) if row < last.row => CellRef::new(row + 1, col),
            (Advance::Enter, true) if row > 0 => CellRef::new(row - 1, col),
            _ => self.active,
        };
        self.select_single(target);
        target
    }

    /// Formula-bar text: the active cell's formula, else its value.
    pub fn formula_bar_text(&self, sheet: &Sheet) -> String {
        sheet
            .peek(self.active)
            .map(|cell| cell.edit_text().to_string())
            .unwrap_or_default()
    }
}
