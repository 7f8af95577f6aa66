use std::time::{Duration, Instant};

use crate::bridge::FormulaBridge;
use crate::edit::{EditMode, Editor};
use crate::error::Result;
use crate::fill::FillEngine;
use crate::selection::{GridDims, Highlight, Selection};
use crate::sheet::{Cell, Sheet, Styles};
use crate::workbook::Workbook;
use sheetwise_engine::engine::CellRef;

/// What a pointer drag is currently doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pointer {
    Idle,
    Selecting,
    Filling,
}

/// Everything a renderer needs to draw one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellView {
    pub text: String,
    pub highlight: Highlight,
    pub errored: bool,
    pub fill_preview: bool,
    pub editing: bool,
    pub styles: Option<Styles>,
}

/// UI-agnostic document state for one open workbook.
pub struct Document {
    pub(crate) workbook: Workbook,
    pub(crate) bridge: FormulaBridge,
    pub(crate) selection: Selection,
    pub(crate) fill: FillEngine,
    pub(crate) editor: Editor,
    pub(crate) dims: GridDims,
    pub(crate) pointer: Pointer,
    pub(crate) error_duration: Duration,
    /// Whether cells changed since the last save.
    pub modified: bool,
}

impl Document {
    pub fn new() -> Self {
        Self::with_dims(GridDims::default())
    }

    /// A document holding a fresh untitled workbook.
    pub fn with_dims(dims: GridDims) -> Self {
        let mut workbook = Workbook::default();
        let mut bridge = FormulaBridge::new();
        let number = workbook.active_number();
        if let Some(sheet) = workbook.sheet_mut(number) {
            sheet.initialize(dims);
        }
        bridge.ensure_sheet(number);
        let editor = Editor::new(bridge.function_names());

        Document {
            workbook,
            bridge,
            selection: Selection::default(),
            fill: FillEngine::new(),
            editor,
            dims,
            pointer: Pointer::Idle,
            error_duration: crate::bridge::ErrorFlags::DEFAULT_DURATION,
            modified: false,
        }
    }

    /// How long a failed formula stays visually flagged.
    pub fn set_error_duration(&mut self, duration: Duration) {
        self.error_duration = duration;
        self.bridge.set_error_duration(duration);
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn title(&self) -> &str {
        &self.workbook.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.workbook.title = title.to_string();
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn fill(&self) -> &FillEngine {
        &self.fill
    }

    pub fn bridge(&self) -> &FormulaBridge {
        &self.bridge
    }

    pub fn mode(&self) -> EditMode {
        self.editor.mode()
    }

    pub fn active_sheet_number(&self) -> u32 {
        self.workbook.active_number()
    }

    pub fn active_sheet(&self) -> Result<&Sheet> {
        self.workbook.active_sheet()
    }

    pub fn cell(&self, coord: CellRef) -> Option<&Cell> {
        self.workbook.active_sheet().ok()?.peek(coord)
    }

    pub fn name_box_label(&self) -> String {
        self.selection.name_box_label()
    }

    pub fn formula_bar_text(&self) -> String {
        self.workbook
            .active_sheet()
            .map(|sheet| self.selection.formula_bar_text(sheet))
            .unwrap_or_default()
    }

    pub fn view_cell(&self, coord: CellRef, now: Instant) -> CellView {
        let cell = self.cell(coord);
        let editing = self.editor.session().filter(|s| s.cell == coord);
        CellView {
            text: match (editing, cell) {
                (Some(session), _) => session.text.clone(),
                (None, Some(cell)) => cell.computed.clone(),
                (None, None) => String::new(),
            },
            highlight: self.selection.highlight(coord),
            errored: self
                .bridge
                .flags()
                .is_errored(self.active_sheet_number(), coord, now),
            fill_preview: self.fill.is_previewed(coord),
            editing: editing.is_some(),
            styles: cell.and_then(|c| c.styles.clone()),
        }
    }

    /// The active sheet and the bridge, borrowed together for edits.
    pub(crate) fn active_parts(&mut self) -> Result<(&mut Sheet, &mut FormulaBridge)> {
        let sheet = self.workbook.active_sheet_mut()?;
        Ok((sheet, &mut self.bridge))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
