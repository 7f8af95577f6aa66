use serde_json::Value as Json;
use tracing::info;

use super::Document;
use super::state::Pointer;
use crate::bridge::FormulaBridge;
use crate::edit::Editor;
use crate::error::Result;
use crate::selection::Selection;
use crate::workbook::Workbook;

impl Document {
    /// The active sheet's cells in the persisted shape, captured now. Edits
    /// made afterwards are not part of the returned value.
    pub fn snapshot_active_sheet(&self) -> Result<Json> {
        Ok(self.workbook.active_sheet()?.data_to_json())
    }

    /// Replace the open workbook, pushing every sheet into a fresh engine.
    pub fn load_workbook(&mut self, mut workbook: Workbook) -> Result<()> {
        workbook.normalize()?;

        let mut bridge = FormulaBridge::new();
        bridge.set_error_duration(self.error_duration);
        let numbers: Vec<u32> = workbook.sheets().iter().map(|s| s.sheet_number).collect();
        for number in &numbers {
            if let Some(sheet) = workbook.sheet_mut(*number) {
                sheet.initialize(self.dims);
                bridge.load_sheet(sheet);
            }
        }

        info!(
            workbook = %workbook.id,
            sheets = numbers.len(),
            "workbook loaded"
        );
        self.editor = Editor::new(bridge.function_names());
        self.bridge = bridge;
        self.workbook = workbook;
        self.selection = Selection::default();
        self.fill.cancel();
        self.pointer = Pointer::Idle;
        self.modified = false;
        Ok(())
    }

    /// Mark the current state as persisted.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }
}
