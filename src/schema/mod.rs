//! Model metadata
//!
//! The compiler never touches records directly. Everything it knows about
//! a model comes from here: its table, its fields and their types, the
//! relation tables behind many2many fields, delegation links and the
//! search hooks of computed fields.

mod hooks;
mod loader;
mod registry;
mod types;

pub use hooks::SearchHook;
pub use loader::SchemaLoader;
pub use registry::{is_identifier, FieldLookup, Registry};
pub use types::{FieldDef, FieldType, ModelDef, RelationTable};
