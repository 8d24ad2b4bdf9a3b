//! SQL assembly
//!
//! `Query` is the join graph and WHERE accumulator for one compilation;
//! `SqlFragment` is the `(sql, params)` pair every compiler step produces.

#[allow(clippy::module_inception)]
mod query;
mod sql;

pub use query::{Join, Query};
pub use sql::{placeholders, qualified, quote, SqlFragment, SqlParam};
