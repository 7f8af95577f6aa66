//! Keyboard input as seen by the document.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Tab,
    Enter,
    Escape,
    Backspace,
    Delete,
    Home,
    End,
    F2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
    pub ctrl: bool,
}

impl KeyInput {
    pub const fn new(key: Key) -> Self {
        KeyInput {
            key,
            shift: false,
            ctrl: false,
        }
    }

    pub const fn shift(key: Key) -> Self {
        KeyInput {
            key,
            shift: true,
            ctrl: false,
        }
    }

    pub const fn ctrl(key: Key) -> Self {
        KeyInput {
            key,
            shift: false,
            ctrl: true,
        }
    }
}

impl From<Key> for KeyInput {
    fn from(key: Key) -> Self {
        KeyInput::new(key)
    }
}
