//! Name resolution
//!
//! Values given as display names are resolved to ids through the
//! comodel's name search before the leaf is rewritten, so the rest of
//! the compiler only ever sees id leaves.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::domain::{Leaf, Operand, Operator, RecordId};
use crate::errors::{DomainError, DomainResult};
use crate::observability::{log_event, Event};
use crate::schema::ModelDef;

use super::backend::SearchOptions;
use super::expression::DomainCompiler;

/// Names carried by a value: one string, or a non-empty list of strings
pub(crate) fn names_of(value: &Value) -> Option<Vec<&str>> {
    match value {
        Value::String(s) => Some(vec![s.as_str()]),
        Value::Array(items) if !items.is_empty() => items.iter().map(Value::as_str).collect(),
        _ => None,
    }
}

impl DomainCompiler {
    /// Resolve the right-hand side of a hierarchy leaf to ids of `model`.
    ///
    /// Names go through an `ilike` name search, integers pass through and
    /// a falsy id resolves to nothing.
    pub(crate) async fn to_ids(
        &self,
        leaf: &Leaf,
        model: &ModelDef,
    ) -> DomainResult<Vec<RecordId>> {
        let value = leaf
            .right
            .as_value()
            .ok_or_else(|| DomainError::invalid_leaf(leaf, "expected ids or names"))?;

        if let Some(names) = names_of(value) {
            let options = SearchOptions::default().with_active_test(self.context().active_test);
            let mut ids = BTreeSet::new();
            for name in names {
                let name = Value::from(name);
                let found = self
                    .backend()
                    .name_search(model, &name, Operator::Ilike, options)
                    .await?;
                ids.extend(found);
            }
            return Ok(ids.into_iter().collect());
        }

        match value {
            Value::Bool(false) => {
                warn_falsy(leaf);
                Ok(Vec::new())
            }
            Value::Number(n) => match n.as_i64() {
                Some(0) => {
                    warn_falsy(leaf);
                    Ok(Vec::new())
                }
                Some(id) => Ok(vec![id]),
                None => Err(DomainError::invalid_leaf(leaf, "ids must be integers")),
            },
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_i64()
                        .ok_or_else(|| DomainError::invalid_leaf(leaf, "ids must be integers"))
                })
                .collect(),
            _ => Err(DomainError::invalid_leaf(leaf, "expected ids or names")),
        }
    }

    /// Rewrite a many2one leaf whose value is a name (or names) into an
    /// id leaf `[field, 'in', ids]`.
    ///
    /// Ordering operators become `in`; a single name with `in`/`not in`
    /// becomes `=`/`!=` and a list with `=`/`!=` becomes `in`/`not in`.
    /// Archived comodel records still match. Negative operators also
    /// match an empty reference.
    pub(crate) async fn many2one_name_leaf(
        &self,
        leaf: &Leaf,
        comodel: &ModelDef,
        names: &Value,
    ) -> DomainResult<Leaf> {
        let is_list = names.is_array();
        let operator = match leaf.operator {
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => Operator::In,
            Operator::In if !is_list => Operator::Eq,
            Operator::NotIn if !is_list => Operator::Ne,
            Operator::Eq if is_list => Operator::In,
            Operator::Ne if is_list => Operator::NotIn,
            other => other,
        };

        let options = SearchOptions::default().with_active_test(false);
        let ids = self
            .backend()
            .name_search(comodel, names, operator, options)
            .await?;

        let mut values: Vec<Value> = ids.into_iter().map(Value::from).collect();
        if operator.is_negative() {
            values.push(json!(false));
        }
        Ok(Leaf::new(
            leaf.left.clone(),
            Operator::In,
            Operand::Value(Value::Array(values)),
        ))
    }
}

fn warn_falsy(leaf: &Leaf) {
    let text = leaf.to_string();
    log_event(
        Event::UnexpectedFalsyId,
        &[("leaf", text.as_str()), ("interpreted_as", "[]")],
    );
}
