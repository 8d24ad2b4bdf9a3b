//! Domain token structures
//!
//! A domain is a prefix-notation sequence of tokens: the logical operators
//! `&`, `|` and `!`, and leaves `[field_path, operator, value]`. The two
//! sentinel leaves `[1, '=', 1]` and `[0, '=', 1]` are kept as distinct
//! token variants so they can never be confused with a real leaf.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{DomainError, DomainResult};
use crate::query::SqlFragment;

/// Database record identifier
pub type RecordId = i64;

/// Leaf comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `=?`: TRUE when the value is unset, `=` otherwise
    EqIfSet,
    /// `=like`: LIKE without implicit wildcards
    EqLike,
    /// `=ilike`: ILIKE without implicit wildcards
    EqIlike,
    Like,
    NotLike,
    Ilike,
    NotIlike,
    In,
    NotIn,
    ChildOf,
    ParentOf,
}

impl Operator {
    /// Parse an operator symbol (`<>` is accepted as `!=`)
    pub fn parse(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "=" => Operator::Eq,
            "!=" | "<>" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "=?" => Operator::EqIfSet,
            "=like" => Operator::EqLike,
            "=ilike" => Operator::EqIlike,
            "like" => Operator::Like,
            "not like" => Operator::NotLike,
            "ilike" => Operator::Ilike,
            "not ilike" => Operator::NotIlike,
            "in" => Operator::In,
            "not in" => Operator::NotIn,
            "child_of" => Operator::ChildOf,
            "parent_of" => Operator::ParentOf,
            _ => return None,
        };
        Some(op)
    }

    /// Returns the domain symbol
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::EqIfSet => "=?",
            Operator::EqLike => "=like",
            Operator::EqIlike => "=ilike",
            Operator::Like => "like",
            Operator::NotLike => "not like",
            Operator::Ilike => "ilike",
            Operator::NotIlike => "not ilike",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::ChildOf => "child_of",
            Operator::ParentOf => "parent_of",
        }
    }

    /// Operator with the opposite truth value, when one exists.
    ///
    /// `=?`, `=like`, `=ilike`, `child_of` and `parent_of` have no
    /// negation and keep an explicit `!` in front of the leaf.
    pub fn negate(&self) -> Option<Operator> {
        let negated = match self {
            Operator::Lt => Operator::Ge,
            Operator::Ge => Operator::Lt,
            Operator::Gt => Operator::Le,
            Operator::Le => Operator::Gt,
            Operator::Eq => Operator::Ne,
            Operator::Ne => Operator::Eq,
            Operator::In => Operator::NotIn,
            Operator::NotIn => Operator::In,
            Operator::Like => Operator::NotLike,
            Operator::NotLike => Operator::Like,
            Operator::Ilike => Operator::NotIlike,
            Operator::NotIlike => Operator::Ilike,
            _ => return None,
        };
        Some(negated)
    }

    /// Negative operators match rows where the column is NULL
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Operator::Ne | Operator::NotLike | Operator::NotIlike | Operator::NotIn
        )
    }

    pub fn is_hierarchy(&self) -> bool {
        matches!(self, Operator::ChildOf | Operator::ParentOf)
    }

    /// `like`-family operators whose value gets wrapped in `%...%`
    pub fn needs_wildcard(&self) -> bool {
        matches!(
            self,
            Operator::Like | Operator::NotLike | Operator::Ilike | Operator::NotIlike
        )
    }

    /// Operators rendered as SQL LIKE / ILIKE
    pub fn is_pattern(&self) -> bool {
        self.needs_wildcard() || matches!(self, Operator::EqLike | Operator::EqIlike)
    }

    /// SQL spelling of a scalar comparison
    pub fn sql_operator(&self) -> &'static str {
        match self {
            Operator::EqLike => "like",
            Operator::EqIlike => "ilike",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Right-hand side of a leaf
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Literal value (scalar or list)
    Value(Value),
    /// Lazily compiled `SELECT` producing ids, used with `in` / `not in`
    Subquery(SqlFragment),
}

impl Operand {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Subquery(_) => None,
        }
    }

    /// `false` or `null`: the domain spelling of "no value"
    pub fn is_unset(&self) -> bool {
        matches!(self, Operand::Value(Value::Null) | Operand::Value(Value::Bool(false)))
    }

    /// Truthiness of the operand (subqueries are always truthy)
    pub fn is_truthy(&self) -> bool {
        match self {
            Operand::Value(v) => is_truthy(v),
            Operand::Subquery(_) => true,
        }
    }

    /// Ids carried by a literal list of integers
    pub fn ids(&self) -> Vec<RecordId> {
        match self {
            Operand::Value(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
            Operand::Value(v) => v.as_i64().into_iter().collect(),
            Operand::Subquery(_) => Vec::new(),
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<SqlFragment> for Operand {
    fn from(fragment: SqlFragment) -> Self {
        Operand::Subquery(fragment)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{}", v),
            Operand::Subquery(q) => write!(f, "({})", q.sql),
        }
    }
}

/// Truthiness of a JSON value: null, false, 0, "" and empty collections are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// An atomic condition `[left, operator, right]`
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Field path, possibly dotted (`partner_id.country_id.code`)
    pub left: String,
    pub operator: Operator,
    pub right: Operand,
}

impl Leaf {
    pub fn new(left: impl Into<String>, operator: Operator, right: impl Into<Operand>) -> Self {
        Self {
            left: left.into(),
            operator,
            right: right.into(),
        }
    }

    /// Splits the field path on its first dot
    pub fn path(&self) -> (&str, Option<&str>) {
        match self.left.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (self.left.as_str(), None),
        }
    }

    /// Same leaf with a different field path
    pub fn with_left(&self, left: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            operator: self.operator,
            right: self.right.clone(),
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "('{}', '{}', {})", self.left, self.operator, self.right)
    }
}

/// A domain token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    And,
    Or,
    Not,
    /// `[1, '=', 1]`
    True,
    /// `[0, '=', 1]`
    False,
    Leaf(Leaf),
}

impl Token {
    /// Convenience constructor for a leaf token
    pub fn leaf(left: impl Into<String>, operator: Operator, right: impl Into<Operand>) -> Self {
        Token::Leaf(Leaf::new(left, operator, right))
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Token::And | Token::Or | Token::Not)
    }

    /// Leaves, including the TRUE/FALSE sentinels
    pub fn is_leaf(&self) -> bool {
        !self.is_operator()
    }

    pub fn is_true_leaf(&self) -> bool {
        matches!(self, Token::True)
    }

    pub fn is_false_leaf(&self) -> bool {
        matches!(self, Token::False)
    }

    /// Number of operands consumed (0 for leaves)
    pub fn arity(&self) -> usize {
        match self {
            Token::Not => 1,
            Token::And | Token::Or => 2,
            _ => 0,
        }
    }

    /// Parse a single JSON token
    pub fn from_json(value: &Value) -> DomainResult<Self> {
        match value {
            Value::String(s) => match s.as_str() {
                "&" => Ok(Token::And),
                "|" => Ok(Token::Or),
                "!" => Ok(Token::Not),
                other => Err(DomainError::Malformed(format!(
                    "unknown domain operator '{}'",
                    other
                ))),
            },
            Value::Array(items) if items.len() == 3 => {
                let op_symbol = items[1].as_str().ok_or_else(|| {
                    DomainError::invalid_leaf(value, "operator must be a string")
                })?;
                let operator = Operator::parse(&op_symbol.to_lowercase()).ok_or_else(|| {
                    DomainError::invalid_leaf(value, format!("unknown operator '{}'", op_symbol))
                })?;
                match &items[0] {
                    Value::String(left) if !left.is_empty() => {
                        Ok(Token::leaf(left.clone(), operator, items[2].clone()))
                    }
                    Value::Number(n) if operator == Operator::Eq && items[2] == json!(1) => {
                        match n.as_i64() {
                            Some(1) => Ok(Token::True),
                            Some(0) => Ok(Token::False),
                            _ => Err(DomainError::invalid_leaf(value, "invalid constant leaf")),
                        }
                    }
                    _ => Err(DomainError::invalid_leaf(
                        value,
                        "left operand must be a field path",
                    )),
                }
            }
            Value::Array(_) => Err(DomainError::invalid_leaf(value, "leaf must have 3 items")),
            other => Err(DomainError::Malformed(format!(
                "unexpected domain token {}",
                other
            ))),
        }
    }

    /// JSON form of the token; subquery operands become `{"sql", "params"}`
    pub fn to_json(&self) -> Value {
        match self {
            Token::And => json!("&"),
            Token::Or => json!("|"),
            Token::Not => json!("!"),
            Token::True => json!([1, "=", 1]),
            Token::False => json!([0, "=", 1]),
            Token::Leaf(leaf) => {
                let right = match &leaf.right {
                    Operand::Value(v) => v.clone(),
                    Operand::Subquery(q) => json!({ "sql": q.sql, "params": q.params }),
                };
                json!([leaf.left, leaf.operator.as_str(), right])
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::And => write!(f, "'&'"),
            Token::Or => write!(f, "'|'"),
            Token::Not => write!(f, "'!'"),
            Token::True => write!(f, "(1, '=', 1)"),
            Token::False => write!(f, "(0, '=', 1)"),
            Token::Leaf(leaf) => write!(f, "{}", leaf),
        }
    }
}

impl From<Leaf> for Token {
    fn from(leaf: Leaf) -> Self {
        Token::Leaf(leaf)
    }
}

/// An ordered sequence of domain tokens
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Domain(Vec<Token>);

impl Domain {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }

    /// The always-true domain `[(1, '=', 1)]`
    pub fn true_domain() -> Self {
        Self(vec![Token::True])
    }

    /// The always-false domain `[(0, '=', 1)]`
    pub fn false_domain() -> Self {
        Self(vec![Token::False])
    }

    /// Single-leaf domain
    pub fn leaf(left: impl Into<String>, operator: Operator, right: impl Into<Operand>) -> Self {
        Self(vec![Token::leaf(left, operator, right)])
    }

    /// Parse a JSON array of tokens
    pub fn from_json(value: &Value) -> DomainResult<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| DomainError::Malformed(format!("domain must be a list, got {}", value)))?;
        items
            .iter()
            .map(Token::from_json)
            .collect::<DomainResult<Vec<_>>>()
            .map(Self)
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.0.iter().map(Token::to_json).collect())
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, token: Token) {
        self.0.push(token);
    }

    /// Leaves of the domain, sentinels excluded
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.0.iter().filter_map(|t| match t {
            Token::Leaf(leaf) => Some(leaf),
            _ => None,
        })
    }
}

impl From<Vec<Token>> for Domain {
    fn from(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }
}

impl FromIterator<Token> for Domain {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Domain {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Domain {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", token)?;
        }
        write!(f, "]")
    }
}

impl Serialize for Domain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Domain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Domain::from_json(&value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leaves_and_operators() {
        let domain = Domain::from_json(&json!([
            "|",
            ["state", "=", "draft"],
            ["partner_id.country_id.code", "not in", ["US", "CA"]]
        ]))
        .unwrap();

        assert_eq!(domain.len(), 3);
        assert_eq!(domain.tokens()[0], Token::Or);
        match &domain.tokens()[2] {
            Token::Leaf(leaf) => {
                assert_eq!(leaf.operator, Operator::NotIn);
                assert_eq!(leaf.path(), ("partner_id", Some("country_id.code")));
            }
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_sentinels_are_distinct_tokens() {
        let domain = Domain::from_json(&json!([[1, "=", 1], [0, "=", 1]])).unwrap();
        assert!(domain.tokens()[0].is_true_leaf());
        assert!(domain.tokens()[1].is_false_leaf());
        assert!(!Token::leaf("id", Operator::Eq, json!(1)).is_true_leaf());
    }

    #[test]
    fn test_invalid_tokens_rejected() {
        assert!(matches!(
            Domain::from_json(&json!([["name", "contains", "x"]])),
            Err(DomainError::InvalidLeaf { .. })
        ));
        assert!(matches!(
            Domain::from_json(&json!([["name", "="]])),
            Err(DomainError::InvalidLeaf { .. })
        ));
        assert!(matches!(
            Domain::from_json(&json!(["^"])),
            Err(DomainError::Malformed(_))
        ));
        assert!(matches!(
            Domain::from_json(&json!({"name": "x"})),
            Err(DomainError::Malformed(_))
        ));
        assert!(matches!(
            Domain::from_json(&json!([[2, "=", 1]])),
            Err(DomainError::InvalidLeaf { .. })
        ));
    }

    #[test]
    fn test_operator_negation_table() {
        let pairs = [
            (Operator::Eq, Operator::Ne),
            (Operator::In, Operator::NotIn),
            (Operator::Like, Operator::NotLike),
            (Operator::Ilike, Operator::NotIlike),
            (Operator::Lt, Operator::Ge),
            (Operator::Gt, Operator::Le),
        ];
        for (op, negated) in pairs {
            assert_eq!(op.negate(), Some(negated));
            assert_eq!(negated.negate(), Some(op));
        }
        assert_eq!(Operator::ChildOf.negate(), None);
        assert_eq!(Operator::EqLike.negate(), None);
        assert_eq!(Operator::parse("<>"), Some(Operator::Ne));
    }

    #[test]
    fn test_json_roundtrip_preserves_tokens() {
        let source = json!(["!", ["active", "=", true], [1, "=", 1]]);
        let domain: Domain = serde_json::from_value(source.clone()).unwrap();
        assert_eq!(serde_json::to_value(&domain).unwrap(), source);
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([0])));
        assert!(Operand::Value(json!(false)).is_unset());
        assert!(!Operand::Value(json!(0)).is_unset());
    }
}
