//! Leaf-to-SQL translation
//!
//! Terminal step of the compiler: a leaf whose field is a plain column on
//! the current table becomes one parenthesized SQL condition. The rules
//! keep SQL NULL in line with the domain meaning of `false`:
//!
//! - `in` with `false` among the values also matches NULL rows, and
//!   `not in` without `false` matches them too
//! - `= false` on a boolean column matches NULL and FALSE alike
//! - negative operators against a real value match NULL rows

use serde_json::Value;

use crate::domain::{Leaf, Operand, Operator};
use crate::errors::{DomainError, DomainResult};
use crate::observability::{log_event, Event};
use crate::query::{placeholders, qualified, SqlFragment, SqlParam};
use crate::schema::{FieldType, ModelDef};

use super::context::CompileContext;

/// Translate a reduced leaf on `alias` (a table of `model`) to SQL
pub fn translate_leaf(
    leaf: &Leaf,
    model: &ModelDef,
    alias: &str,
    ctx: &CompileContext,
) -> DomainResult<SqlFragment> {
    let field = model
        .field(&leaf.left)
        .ok_or_else(|| DomainError::invalid_field(&model.name, &leaf.left, leaf))?;
    let column = qualified(alias, &leaf.left);
    let is_boolean = field.field_type == FieldType::Boolean;

    let value = match &leaf.right {
        Operand::Subquery(subquery) => return in_subquery(leaf, &column, subquery),
        Operand::Value(value) => value,
    };

    match leaf.operator {
        Operator::In | Operator::NotIn => in_values(leaf, &column, value, is_boolean),
        Operator::ChildOf | Operator::ParentOf => Err(DomainError::invalid_leaf(
            leaf,
            format!("{} needs a relational field", leaf.operator),
        )),
        Operator::EqIfSet if leaf.right.is_unset() => Ok(SqlFragment::literal(true)),
        Operator::EqIfSet => translate_leaf(
            &Leaf::new(leaf.left.clone(), Operator::Eq, value.clone()),
            model,
            alias,
            ctx,
        ),
        Operator::Eq | Operator::Ne if leaf.right.is_unset() || is_boolean => {
            equality(leaf, &column, value, is_boolean, ctx)
        }
        _ => comparison(leaf, &column, value, ctx),
    }
}

fn in_subquery(leaf: &Leaf, column: &str, subquery: &SqlFragment) -> DomainResult<SqlFragment> {
    let keyword = match leaf.operator {
        Operator::In => "IN",
        Operator::NotIn => "NOT IN",
        _ => {
            return Err(DomainError::invalid_leaf(
                leaf,
                "a subquery can only be used with in / not in",
            ))
        }
    };
    Ok(SqlFragment::new(
        format!("({} {} ({}))", column, keyword, subquery.sql),
        subquery.params.clone(),
    ))
}

fn in_values(leaf: &Leaf, column: &str, value: &Value, is_boolean: bool) -> DomainResult<SqlFragment> {
    let positive = leaf.operator == Operator::In;

    let items = match value {
        Value::Bool(flag) => {
            let text = leaf.to_string();
            log_event(
                Event::LegacyBooleanIn,
                &[("leaf", text.as_str()), ("hint", "use = or != instead")],
            );
            let sql = if positive == *flag {
                format!("({} IS NOT NULL)", column)
            } else {
                format!("({} IS NULL)", column)
            };
            return Ok(SqlFragment::raw(sql));
        }
        Value::Array(items) => items,
        _ => {
            return Err(DomainError::invalid_leaf(
                leaf,
                format!("{} expects a list of values", leaf.operator),
            ))
        }
    };

    let mut params = Vec::with_capacity(items.len());
    let mut check_null = false;
    for item in items {
        match item {
            Value::Bool(false) | Value::Null if !is_boolean => check_null = true,
            Value::Null => check_null = true,
            Value::Bool(false) => {
                // false is both a value and NULL on boolean columns
                check_null = true;
                push_unique(&mut params, SqlParam::Bool(false));
            }
            Value::Bool(true) if is_boolean => push_unique(&mut params, SqlParam::Bool(true)),
            Value::Array(_) | Value::Object(_) => {
                return Err(DomainError::invalid_leaf(leaf, "nested values are not allowed"))
            }
            other => params.push(SqlParam::from_json(other)?),
        }
    }

    let keyword = if positive { "IN" } else { "NOT IN" };
    let fragment = match (params.is_empty(), positive, check_null) {
        (true, true, false) => SqlFragment::literal(false),
        (true, false, false) => SqlFragment::literal(true),
        (true, true, true) => SqlFragment::raw(format!("({} IS NULL)", column)),
        (true, false, true) => SqlFragment::raw(format!("({} IS NOT NULL)", column)),
        (false, _, _) => {
            let sql = format!("({} {} ({}))", column, keyword, placeholders(params.len()));
            let base = SqlFragment::new(sql, params);
            match (positive, check_null) {
                (true, false) => base,
                (true, true) | (false, false) => base.or(is_null(column)),
                (false, true) => base.and(is_not_null(column)),
            }
        }
    };
    Ok(fragment)
}

fn push_unique(params: &mut Vec<SqlParam>, param: SqlParam) {
    if !params.contains(&param) {
        params.push(param);
    }
}

fn equality(
    leaf: &Leaf,
    column: &str,
    value: &Value,
    is_boolean: bool,
    ctx: &CompileContext,
) -> DomainResult<SqlFragment> {
    let unset = leaf.right.is_unset();
    let matches_false = match (leaf.operator, value) {
        (Operator::Eq, _) if unset => true,
        (Operator::Ne, Value::Bool(true)) => true,
        _ => false,
    };
    let matches_true = match (leaf.operator, value) {
        (Operator::Ne, _) if unset => true,
        _ => false,
    };

    if is_boolean && matches_false {
        return Ok(SqlFragment::raw(format!(
            "({} IS NULL OR {} = FALSE)",
            column, column
        )));
    }
    if is_boolean && matches_true {
        return Ok(SqlFragment::raw(format!(
            "({} IS NOT NULL AND {} != FALSE)",
            column, column
        )));
    }
    match (leaf.operator, unset) {
        (Operator::Eq, true) => Ok(SqlFragment::raw(format!("({} IS NULL)", column))),
        (Operator::Ne, true) => Ok(SqlFragment::raw(format!("({} IS NOT NULL)", column))),
        _ => comparison(leaf, column, value, ctx),
    }
}

fn comparison(
    leaf: &Leaf,
    column: &str,
    value: &Value,
    ctx: &CompileContext,
) -> DomainResult<SqlFragment> {
    let operator = leaf.operator;
    let pattern = operator.is_pattern();
    let keyword = operator.sql_operator().to_uppercase();

    let (lhs, rhs) = if pattern {
        (
            unaccent(ctx, &format!("{}::text", column)),
            unaccent(ctx, "%s"),
        )
    } else {
        (column.to_string(), "%s".to_string())
    };

    let param = if operator.needs_wildcard() {
        SqlParam::Text(format!("%{}%", value_text(value)))
    } else {
        match value {
            Value::Array(_) | Value::Object(_) => {
                return Err(DomainError::invalid_leaf(
                    leaf,
                    format!("{} expects a single value", operator),
                ))
            }
            other => SqlParam::from_json(other)?,
        }
    };

    let base = SqlFragment::new(format!("({} {} {})", lhs, keyword, rhs), vec![param]);
    let truthy = leaf.right.is_truthy();
    if (operator.needs_wildcard() && !truthy) || (truthy && operator.is_negative()) {
        Ok(base.or(is_null(column)))
    } else {
        Ok(base)
    }
}

/// Wrap `sql` in `unaccent()` when enabled
pub(crate) fn unaccent(ctx: &CompileContext, sql: &str) -> String {
    if ctx.unaccent {
        format!("unaccent({})", sql)
    } else {
        sql.to_string()
    }
}

/// Text of a value inside a `%...%` pattern
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null | Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn is_null(column: &str) -> SqlFragment {
    SqlFragment::raw(format!("{} IS NULL", column))
}

pub(crate) fn is_not_null(column: &str) -> SqlFragment {
    SqlFragment::raw(format!("{} IS NOT NULL", column))
}
