//! Expression compiler
//!
//! Turns a domain on a model into SQL over the model's table:
//!
//! - `expression`: the compiler itself, `where_calc` and `search`
//! - `rewrite`: per-field-kind leaf rewriting
//! - `leaf`: terminal translation of plain column leaves
//! - `hierarchy`: `child_of` / `parent_of` expansion
//! - `names`: display name to id resolution
//! - `backend`: the database round trips the compiler needs

mod backend;
mod context;
mod expression;
mod hierarchy;
mod leaf;
mod names;
mod rewrite;

pub use backend::{BackendFuture, ModelBackend, OfflineBackend, SearchOptions};
pub use context::CompileContext;
pub use expression::{CompileFuture, DomainCompiler, Explain, SearchResult};
pub use hierarchy::{Direction, Target};
pub use leaf::translate_leaf;
