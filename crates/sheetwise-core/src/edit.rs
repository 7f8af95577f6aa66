//! Per-cell edit state machine with a formula-autocomplete sub-state.
//!
//! The editor never touches the cell store. Transitions that finish an edit
//! hand back an [`EditEffect`] for the document to apply.

use sheetwise_engine::engine::CellRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditMode {
    Viewing,
    Editing,
    EditingWithAutocomplete,
}

/// An in-progress edit. `caret` is a byte offset on a char boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditSession {
    pub cell: CellRef,
    pub text: String,
    pub caret: usize,
    /// Text the cell held when the edit started.
    pub original: String,
}

/// What the document must do when an edit ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditEffect {
    Commit { cell: CellRef, text: String },
    Cancelled { cell: CellRef, original: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Autocomplete {
    pub candidates: Vec<String>,
    pub highlighted: Option<usize>,
    pub dismissed: bool,
}

impl Autocomplete {
    pub fn is_visible(&self) -> bool {
        !self.dismissed && !self.candidates.is_empty()
    }

    pub fn highlighted_name(&self) -> Option<&str> {
        self.highlighted
            .and_then(|i| self.candidates.get(i))
            .map(String::as_str)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Editor {
    session: Option<EditSession>,
    autocomplete: Option<Autocomplete>,
    functions: Vec<String>,
}

impl Editor {
    pub fn new(functions: Vec<String>) -> Self {
        Editor {
            session: None,
            autocomplete: None,
            functions,
        }
    }

    pub fn mode(&self) -> EditMode {
        match (&self.session, self.autocomplete()) {
            (None, _) => EditMode::Viewing,
            (Some(_), Some(_)) => EditMode::EditingWithAutocomplete,
            (Some(_), None) => EditMode::Editing,
        }
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn editing_cell(&self) -> Option<CellRef> {
        self.session.as_ref().map(|s| s.cell)
    }

    /// The visible autocomplete list, if any.
    pub fn autocomplete(&self) -> Option<&Autocomplete> {
        self.autocomplete.as_ref().filter(|ac| ac.is_visible())
    }

    /// Start editing `cell` seeded with its current text. An edit already
    /// running on another cell is committed first and its effect returned.
    pub fn begin(&mut self, cell: CellRef, current: &str) -> Option<EditEffect> {
        self.start(cell, current, current.to_string())
    }

    /// Start editing `cell` by typing over its contents.
    pub fn begin_typing(&mut self, cell: CellRef, current: &str, typed: &str) -> Option<EditEffect> {
        self.start(cell, current, typed.to_string())
    }

    fn start(&mut self, cell: CellRef, current: &str, text: String) -> Option<EditEffect> {
        if self.editing_cell() == Some(cell) {
            return None;
        }
        let previous = self.commit();
        self.session = Some(EditSession {
            cell,
            caret: text.len(),
            text,
            original: current.to_string(),
        });
        self.refresh_autocomplete();
        previous
    }

    pub fn insert_str(&mut self, s: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.text.insert_str(session.caret, s);
        session.caret += s.len();
        self.refresh_autocomplete();
    }

    pub fn backspace(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(prev) = session.text[..session.caret].chars().next_back() else {
            return;
        };
        session.caret -= prev.len_utf8();
        session.text.remove(session.caret);
        self.refresh_autocomplete();
    }

    /// Replace the whole text, caret at the end.
    pub fn set_text(&mut self, text: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.text = text.to_string();
        session.caret = session.text.len();
        self.refresh_autocomplete();
    }

    pub fn caret_left(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Some(prev) = session.text[..session.caret].chars().next_back() {
                session.caret -= prev.len_utf8();
            }
        }
    }

    pub fn caret_right(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Some(next) = session.text[session.caret..].chars().next() {
                session.caret += next.len_utf8();
            }
        }
    }

    pub fn caret_home(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.caret = 0;
        }
    }

    pub fn caret_end(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.caret = session.text.len();
        }
    }

    /// Move the autocomplete highlight down (`forward`) or up. From no
    /// highlight, down selects the first item and up the last; otherwise the
    /// index clamps at the list ends.
    pub fn move_highlight(&mut self, forward: bool) {
        let Some(ac) = self.autocomplete.as_mut().filter(|ac| ac.is_visible()) else {
            return;
        };
        let last = ac.candidates.len() - 1;
        ac.highlighted = Some(match (ac.highlighted, forward) {
            (None, true) => 0,
            (None, false) => last,
            (Some(i), true) => (i + 1).min(last),
            (Some(i), false) => i.saturating_sub(1),
        });
    }

    /// Insert `=NAME()` for the highlighted (or first) candidate, caret before
    /// the closing parenthesis. Returns false when no list is showing.
    pub fn accept_autocomplete(&mut self) -> bool {
        let Some(ac) = self.autocomplete() else {
            return false;
        };
        let name = ac
            .highlighted_name()
            .or_else(|| ac.candidates.first().map(String::as_str))
            .unwrap_or_default()
            .to_string();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.text = format!("={name}()");
        session.caret = session.text.len() - 1;
        self.autocomplete = None;
        true
    }

    /// Hide the list until the text changes. Returns false when none showed.
    pub fn dismiss_autocomplete(&mut self) -> bool {
        match self.autocomplete.as_mut() {
            Some(ac) if ac.is_visible() => {
                ac.dismissed = true;
                true
            }
            _ => false,
        }
    }

    pub fn commit(&mut self) -> Option<EditEffect> {
        self.autocomplete = None;
        let session = self.session.take()?;
        Some(EditEffect::Commit {
            cell: session.cell,
            text: session.text,
        })
    }

    pub fn cancel(&mut self) -> Option<EditEffect> {
        self.autocomplete = None;
        let session = self.session.take()?;
        Some(EditEffect::Cancelled {
            cell: session.cell,
            original: session.original,
        })
    }

    fn refresh_autocomplete(&mut self) {
        self.autocomplete = self
            .session
            .as_ref()
            .and_then(|s| s.text.strip_prefix('='))
            .map(|query| {
                let query = query.to_lowercase();
                self.functions
                    .iter()
                    .filter(|name| name.to_lowercase().contains(&query))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|candidates| !candidates.is_empty())
            .map(|candidates| Autocomplete {
                candidates,
                highlighted: None,
                dismissed: false,
            });
    }
}

/// Screen-space rectangle used for popup placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vertical {
    Below,
    Above,
    /// Neither side fits: a scrollable panel capped to `max_height`.
    Panel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Horizontal {
    Right,
    Left,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub vertical: Vertical,
    pub horizontal: Horizontal,
    pub x: f32,
    pub y: f32,
    pub max_height: Option<f32>,
}

/// Position the autocomplete list near `cell`: below-right when it fits,
/// above when only that fits, otherwise a panel in the larger space.
pub fn place_popup(cell: ScreenRect, popup: Size, viewport: Size) -> Placement {
    let cell_bottom = cell.y + cell.height;
    let below = (viewport.height - cell_bottom).max(0.0);
    let above = cell.y.max(0.0);

    let (vertical, y, max_height) = if popup.height <= below {
        (Vertical::Below, cell_bottom, None)
    } else if popup.height <= above {
        (Vertical::Above, cell.y - popup.height, None)
    } else if below >= above {
        (Vertical::Panel, cell_bottom, Some(below))
    } else {
        (Vertical::Panel, 0.0, Some(above))
    };

    let (horizontal, x) = if cell.x + popup.width <= viewport.width {
        (Horizontal::Right, cell.x)
    } else {
        (Horizontal::Left, (cell.x + cell.width - popup.width).max(0.0))
    };

    Placement {
        vertical,
        horizontal,
        x,
        y,
        max_height,
    }
}
