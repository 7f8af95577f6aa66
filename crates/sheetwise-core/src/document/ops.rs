use tracing::debug;
use uuid::Uuid;

use super::Document;
use crate::bridge::{ApplyMode, ApplyOutcome};
use crate::edit::EditEffect;
use crate::error::{Result, SheetError};
use crate::selection::Selection;
use crate::sheet::{ClearMode, Sheet, StyleKey};
use sheetwise_engine::engine::CellRef;

impl Document {
    /// Apply user text to a cell and refresh dependents.
    pub fn set_cell_from_input(&mut self, coord: CellRef, text: &str) -> Result<ApplyOutcome> {
        let (sheet, bridge) = self.active_parts()?;
        let outcome = bridge.apply(sheet, coord, text);
        bridge.recompute_dependents(sheet);
        self.modified = true;
        debug!(cell = %coord, ?outcome, "cell set");
        Ok(outcome)
    }

    /// Clear every selected cell, then refresh dependents once.
    pub fn clear_selection(&mut self, mode: ClearMode) -> Result<()> {
        let rect = self.selection.rect();
        let dims = self.dims;
        let (sheet, bridge) = self.active_parts()?;
        for coord in rect.cells().filter(|c| dims.contains(*c)) {
            bridge.clear(sheet, coord, mode);
        }
        bridge.recompute_dependents(sheet);
        self.modified = true;
        debug!(range = %rect.label(), ?mode, "selection cleared");
        Ok(())
    }

    /// Toggle an on/off style across the selection. The active cell decides
    /// the new state. Returns whether the style is now set.
    pub fn toggle_style_on_selection(&mut self, key: StyleKey) -> Result<bool> {
        let active = self.selection.active();
        let rect = self.selection.rect();
        let sheet = self.workbook.active_sheet_mut()?;
        let enable = sheet.peek(active).and_then(|c| c.style(key)).is_none();
        let value = key.flag_value().unwrap_or("true");
        for coord in rect.cells() {
            let cell = sheet.get_mut(coord);
            if enable {
                cell.set_style(key, value);
            } else {
                cell.clear_style(key);
            }
        }
        self.modified = true;
        Ok(enable)
    }

    /// Set (or with `None`, remove) a valued style across the selection.
    pub fn set_style_on_selection(&mut self, key: StyleKey, value: Option<&str>) -> Result<()> {
        let rect = self.selection.rect();
        let sheet = self.workbook.active_sheet_mut()?;
        for coord in rect.cells() {
            let cell = sheet.get_mut(coord);
            match value {
                Some(v) => cell.set_style(key, v),
                None => cell.clear_style(key),
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Write the finished fill through the bridge, refreshing dependents once.
    pub(crate) fn commit_fill(&mut self) -> Result<Vec<CellRef>> {
        let dims = self.dims;
        let writes = {
            let sheet = self.workbook.active_sheet()?;
            self.fill.finish(sheet, dims)
        };
        if writes.is_empty() {
            return Ok(Vec::new());
        }
        let (sheet, bridge) = self.active_parts()?;
        for (coord, text) in &writes {
            bridge.apply(sheet, *coord, text);
        }
        bridge.recompute_dependents(sheet);
        self.modified = true;
        Ok(writes.into_iter().map(|(coord, _)| coord).collect())
    }

    /// Apply the outcome of an edit transition.
    pub(crate) fn apply_effect(&mut self, effect: Option<EditEffect>) -> Result<()> {
        match effect {
            Some(EditEffect::Commit { cell, text }) => {
                self.set_cell_from_input(cell, &text)?;
            }
            Some(EditEffect::Cancelled { cell, original }) => {
                let (sheet, bridge) = self.active_parts()?;
                bridge.apply(sheet, cell, &original);
                bridge.recompute_dependents(sheet);
            }
            None => {}
        }
        Ok(())
    }

    /// Mirror the in-progress edit into the cell without flagging failures.
    pub(crate) fn echo_edit(&mut self) -> Result<()> {
        let Some(session) = self.editor.session() else {
            return Ok(());
        };
        let (cell, text) = (session.cell, session.text.clone());
        let (sheet, bridge) = self.active_parts()?;
        bridge.apply_with(sheet, cell, &text, ApplyMode::Live);
        bridge.recompute_dependents(sheet);
        Ok(())
    }

    /// Commit any running edit.
    pub fn commit_edit(&mut self) -> Result<()> {
        let effect = self.editor.commit();
        self.apply_effect(effect)
    }

    /// Add a new empty sheet and switch to it.
    pub fn add_sheet(&mut self) -> Result<u32> {
        self.commit_edit()?;
        let number = self.workbook.add_sheet(Uuid::new_v4());
        if let Some(sheet) = self.workbook.sheet_mut(number) {
            sheet.initialize(self.dims);
        }
        self.bridge.ensure_sheet(number);
        self.switch_sheet(number)?;
        debug!(sheet = number, "sheet added");
        Ok(number)
    }

    /// Add a sheet created elsewhere (e.g. by the persistence service) and
    /// switch to it.
    pub fn insert_sheet(&mut self, mut sheet: Sheet) -> Result<u32> {
        self.commit_edit()?;
        sheet.initialize(self.dims);
        let number = self.workbook.insert_sheet(sheet)?;
        let stored = self
            .workbook
            .sheet_mut(number)
            .ok_or(SheetError::UnknownSheet(number))?;
        self.bridge.load_sheet(stored);
        self.switch_sheet(number)?;
        Ok(number)
    }

    pub fn switch_sheet(&mut self, number: u32) -> Result<()> {
        self.commit_edit()?;
        self.workbook.switch_to(number)?;
        self.selection = Selection::default();
        self.fill.cancel();
        self.pointer = super::state::Pointer::Idle;
        let (sheet, bridge) = self.active_parts()?;
        bridge.ensure_sheet(number);
        bridge.recompute_dependents(sheet);
        Ok(())
    }
}
