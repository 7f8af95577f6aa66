//! Document state and the input adapter (UI-agnostic).
//!
//! Pointer and key events are routed into the selection, fill and edit
//! engines through explicit method calls; the document holds no global state.

mod input;
mod io;
mod ops;
mod state;

pub use state::{CellView, Document};
