//! Domain expressions
//!
//! A domain is the declarative filter language of the ORM layer: a prefix
//! sequence of `&`, `|`, `!` and `[field, operator, value]` leaves.
//!
//! # Pipeline
//!
//! 1. `normalize` makes implicit ANDs explicit and checks arity
//! 2. `distribute_not` pushes negations down to leaf operators
//! 3. the expression compiler turns the result into SQL

mod ast;
mod negation;
mod normalize;

pub use ast::{is_truthy, Domain, Leaf, Operand, Operator, RecordId, Token};
pub use negation::distribute_not;
pub use normalize::{and_all, is_false, is_false_leaf, is_true_leaf, normalize, or_all};
