//! Search hooks for non-stored fields
//!
//! A computed field has no column to compare against. When it names a
//! search hook, the compiler replaces the leaf with the domain the hook
//! returns, expressed over stored fields of the same model.

use crate::domain::{Domain, Operand, Operator};
use crate::errors::DomainResult;

use super::types::ModelDef;

/// Rewrites a leaf on a computed field into a domain
pub trait SearchHook: Send + Sync {
    fn search(&self, model: &ModelDef, operator: Operator, value: &Operand) -> DomainResult<Domain>;
}

impl<F> SearchHook for F
where
    F: Fn(&ModelDef, Operator, &Operand) -> DomainResult<Domain> + Send + Sync,
{
    fn search(&self, model: &ModelDef, operator: Operator, value: &Operand) -> DomainResult<Domain> {
        self(model, operator, value)
    }
}
