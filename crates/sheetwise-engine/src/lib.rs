//! sheetwise-engine - cell addressing and the Rhai formula evaluator.

pub(crate) mod builtins;
pub mod engine;
pub mod error;

pub use builtins::{BUILTINS, Builtin, BuiltinKind};
pub use engine::{CellRef, Evaluator, Value};
pub use error::{AddressError, EvalError};
