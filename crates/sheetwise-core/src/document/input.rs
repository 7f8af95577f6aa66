use tracing::trace;

use super::Document;
use super::state::Pointer;
use crate::bridge::ApplyOutcome;
use crate::edit::EditMode;
use crate::error::Result;
use crate::input::{Key, KeyInput};
use crate::selection::{Advance, Direction};
use crate::sheet::ClearMode;
use sheetwise_engine::engine::CellRef;

fn direction(key: Key) -> Option<Direction> {
    match key {
        Key::Up => Some(Direction::Up),
        Key::Down => Some(Direction::Down),
        Key::Left => Some(Direction::Left),
        Key::Right => Some(Direction::Right),
        _ => None,
    }
}

impl Document {
    /// Press on a cell. Editing another cell commits that edit first;
    /// pressing the cell being edited leaves the edit alone.
    pub fn pointer_down(&mut self, coord: CellRef, shift: bool) -> Result<()> {
        if !self.dims.contains(coord) {
            return Ok(());
        }
        match self.editor.editing_cell() {
            Some(cell) if cell == coord => return Ok(()),
            Some(_) => self.commit_edit()?,
            None => {}
        }
        if shift {
            self.selection.extend_to(coord);
        } else {
            self.selection.select_single(coord);
        }
        self.pointer = Pointer::Selecting;
        Ok(())
    }

    pub fn pointer_move(&mut self, coord: CellRef) {
        match self.pointer {
            Pointer::Selecting if self.dims.contains(coord) => self.selection.extend_to(coord),
            Pointer::Filling => self.fill.drag_to(coord, self.dims),
            _ => {}
        }
    }

    /// Release the pointer, committing a fill drag if one is running.
    /// Returns the filled coordinates.
    pub fn pointer_up(&mut self) -> Result<Vec<CellRef>> {
        let pointer = std::mem::replace(&mut self.pointer, Pointer::Idle);
        if pointer == Pointer::Filling {
            return self.commit_fill();
        }
        Ok(Vec::new())
    }

    /// Start a fill drag from the handle of `coord`.
    pub fn fill_handle_down(&mut self, coord: CellRef) -> Result<()> {
        if !self.dims.contains(coord) {
            return Ok(());
        }
        self.commit_edit()?;
        self.fill.begin(coord);
        self.pointer = Pointer::Filling;
        Ok(())
    }

    /// Open `coord` for editing seeded with its formula or value.
    pub fn double_click(&mut self, coord: CellRef) -> Result<()> {
        if !self.dims.contains(coord) {
            return Ok(());
        }
        if self.editor.editing_cell() != Some(coord) {
            self.selection.select_single(coord);
        }
        let current = self.current_text(coord);
        let previous = self.editor.begin(coord, &current);
        self.apply_effect(previous)
    }

    /// Route a key press. Returns whether the key was consumed.
    pub fn key(&mut self, input: KeyInput) -> Result<bool> {
        trace!(?input, mode = ?self.editor.mode(), "key");
        if self.editor.session().is_some() {
            self.key_editing(input)
        } else {
            self.key_viewing(input)
        }
    }

    /// Printable text typed by the user.
    pub fn text_input(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if self.editor.session().is_some() {
            self.editor.insert_str(text);
        } else {
            let active = self.selection.active();
            let current = self.current_text(active);
            let previous = self.editor.begin_typing(active, &current, text);
            self.apply_effect(previous)?;
        }
        self.echo_edit()
    }

    /// Focus left the grid: commit any running edit.
    pub fn blur(&mut self) -> Result<()> {
        self.commit_edit()
    }

    /// Text committed from the formula bar applies to the active cell,
    /// replacing any in-cell edit of it.
    pub fn formula_bar_commit(&mut self, text: &str) -> Result<ApplyOutcome> {
        let active = self.selection.active();
        if self.editor.editing_cell() == Some(active) {
            self.editor.cancel();
        } else {
            self.commit_edit()?;
        }
        self.set_cell_from_input(active, text)
    }

    fn key_editing(&mut self, input: KeyInput) -> Result<bool> {
        let autocomplete = self.editor.mode() == EditMode::EditingWithAutocomplete;
        match input.key {
            Key::Up | Key::Down if autocomplete => {
                self.editor.move_highlight(input.key == Key::Down);
            }
            Key::Tab | Key::Enter if autocomplete => {
                self.editor.accept_autocomplete();
                self.echo_edit()?;
            }
            Key::Escape if autocomplete => {
                self.editor.dismiss_autocomplete();
            }
            Key::Tab => self.commit_and_advance(Advance::Tab, input.shift)?,
            Key::Enter => self.commit_and_advance(Advance::Enter, input.shift)?,
            Key::Escape => {
                let effect = self.editor.cancel();
                self.apply_effect(effect)?;
            }
            Key::Backspace => {
                self.editor.backspace();
                self.echo_edit()?;
            }
            Key::Left => self.editor.caret_left(),
            Key::Right => self.editor.caret_right(),
            Key::Home => self.editor.caret_home(),
            Key::End => self.editor.caret_end(),
            Key::Char(c) if !input.ctrl => {
                self.editor.insert_str(c.encode_utf8(&mut [0; 4]));
                self.echo_edit()?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn key_viewing(&mut self, input: KeyInput) -> Result<bool> {
        if let Some(dir) = direction(input.key) {
            self.selection.move_by(dir, input.shift, self.dims);
            return Ok(true);
        }
        match input.key {
            Key::Tab => {
                self.selection.advance(Advance::Tab, input.shift, self.dims);
            }
            Key::Enter => {
                self.selection.advance(Advance::Enter, input.shift, self.dims);
            }
            Key::Delete | Key::Backspace => self.clear_selection(ClearMode::Contents)?,
            Key::F2 => {
                let active = self.selection.active();
                self.double_click(active)?;
            }
            Key::Char(c) if !input.ctrl => {
                self.text_input(c.encode_utf8(&mut [0; 4]))?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn commit_and_advance(&mut self, advance: Advance, reverse: bool) -> Result<()> {
        self.commit_edit()?;
        self.selection.advance(advance, reverse, self.dims);
        Ok(())
    }

    fn current_text(&self, coord: CellRef) -> String {
        self.cell(coord)
            .map(|c| c.edit_text().to_string())
            .unwrap_or_default()
    }
}
