//! Parameterized SQL fragments
//!
//! Fragments use positional `%s` placeholders; `params` holds exactly one
//! value per placeholder, in order of appearance.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DomainError, DomainResult};

/// A positional SQL parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlParam {
    /// Convert a scalar JSON value; lists and objects are rejected
    pub fn from_json(value: &Value) -> DomainResult<Self> {
        match value {
            Value::Null => Ok(SqlParam::Null),
            Value::Bool(b) => Ok(SqlParam::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(SqlParam::Int(i)),
                None => n
                    .as_f64()
                    .map(SqlParam::Float)
                    .ok_or_else(|| DomainError::Malformed(format!("unsupported number {}", n))),
            },
            Value::String(s) => Ok(SqlParam::Text(s.clone())),
            other => Err(DomainError::Malformed(format!(
                "{} cannot be bound as a single SQL parameter",
                other
            ))),
        }
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Fragment without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// `TRUE` or `FALSE`
    pub fn literal(value: bool) -> Self {
        Self::raw(if value { "TRUE" } else { "FALSE" })
    }

    /// `(self AND rhs)`
    pub fn and(self, rhs: SqlFragment) -> Self {
        self.join("AND", rhs)
    }

    /// `(self OR rhs)`
    pub fn or(self, rhs: SqlFragment) -> Self {
        self.join("OR", rhs)
    }

    /// `(NOT (self))`
    pub fn negate(self) -> Self {
        Self {
            sql: format!("(NOT ({}))", self.sql),
            params: self.params,
        }
    }

    fn join(mut self, keyword: &str, rhs: SqlFragment) -> Self {
        self.params.extend(rhs.params);
        Self {
            sql: format!("({} {} {})", self.sql, keyword, rhs.sql),
            params: self.params,
        }
    }

    /// Number of `%s` placeholders in the text
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches("%s").count()
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// Double-quote an identifier
pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `"alias"."column"`
pub fn qualified(alias: &str, column: &str) -> String {
    format!("{}.{}", quote(alias), quote(column))
}

/// `%s,%s,...` with `count` placeholders
pub fn placeholders(count: usize) -> String {
    vec!["%s"; count].join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_conversion() {
        assert_eq!(SqlParam::from_json(&json!(3)).unwrap(), SqlParam::Int(3));
        assert_eq!(SqlParam::from_json(&json!(1.5)).unwrap(), SqlParam::Float(1.5));
        assert_eq!(
            SqlParam::from_json(&json!("x")).unwrap(),
            SqlParam::Text("x".into())
        );
        assert_eq!(SqlParam::from_json(&json!(null)).unwrap(), SqlParam::Null);
        assert!(SqlParam::from_json(&json!([1])).is_err());
    }

    #[test]
    fn test_combinators_keep_param_order() {
        let a = SqlFragment::new("(a = %s)", vec![SqlParam::Int(1)]);
        let b = SqlFragment::new("(b = %s)", vec![SqlParam::Int(2)]);
        let combined = a.and(b).negate();
        assert_eq!(combined.sql, "(NOT (((a = %s) AND (b = %s))))");
        assert_eq!(combined.params, vec![SqlParam::Int(1), SqlParam::Int(2)]);
        assert_eq!(combined.placeholder_count(), combined.params.len());
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote("res_partner"), "\"res_partner\"");
        assert_eq!(quote("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(qualified("t", "id"), "\"t\".\"id\"");
        assert_eq!(placeholders(3), "%s,%s,%s");
    }
}
