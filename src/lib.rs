//! aerodomain - domain expression compiler
//!
//! Compiles ORM domains (prefix boolean filters over model fields) into
//! parameterized SQL with the joins and subqueries they need.

pub mod cli;
pub mod compiler;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod query;
pub mod schema;
