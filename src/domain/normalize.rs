//! Domain normalization and static evaluation
//!
//! A normalized domain is a single well-formed prefix expression: every
//! implicit conjunction between consecutive terms is made explicit with a
//! leading `&`, and the operator arity balances to exactly one expression.

use serde_json::Value;

use super::ast::{Domain, Operand, Operator, Token};
use crate::errors::{DomainError, DomainResult};

/// Returns a normalized copy of `domain`.
///
/// The empty domain normalizes to `[TRUE_LEAF]`.
pub fn normalize(domain: &Domain) -> DomainResult<Domain> {
    if domain.is_empty() {
        return Ok(Domain::true_domain());
    }

    let mut result: Vec<Token> = Vec::with_capacity(domain.len() + 1);
    let mut implicit_ands = 0usize;
    // Number of expressions still needed to complete the prefix form
    let mut expected: usize = 1;

    for token in domain {
        if expected == 0 {
            // Previous expression is complete: AND it with the next one
            implicit_ands += 1;
            expected = 1;
        }
        match token.arity() {
            0 => expected -= 1,
            arity => expected += arity - 1,
        }
        result.push(token.clone());
    }

    if expected != 0 {
        return Err(DomainError::Malformed(format!(
            "domain {} is not balanced: {} operand(s) missing",
            domain, expected
        )));
    }

    let mut tokens = vec![Token::And; implicit_ands];
    tokens.extend(result);
    Ok(Domain::new(tokens))
}

/// Structural test for `[(1, '=', 1)]`
pub fn is_true_leaf(token: &Token) -> bool {
    token.is_true_leaf()
}

/// Structural test for `[(0, '=', 1)]`
pub fn is_false_leaf(token: &Token) -> bool {
    token.is_false_leaf()
}

/// Returns true when `domain` can be proven to match no record.
///
/// Three-valued evaluation over the reversed normalized domain:
/// TRUE is +1, FALSE is -1 and any leaf that cannot be decided
/// statically is 0. AND takes the minimum, OR the maximum, NOT negates.
/// `in []` counts as FALSE and `not in []` as TRUE.
pub fn is_false(domain: &Domain) -> DomainResult<bool> {
    let normalized = normalize(domain)?;
    let mut stack: Vec<i8> = Vec::with_capacity(normalized.len());

    for token in normalized.tokens().iter().rev() {
        let value = match token {
            Token::And | Token::Or => {
                let (a, b) = (pop(&mut stack)?, pop(&mut stack)?);
                if matches!(token, Token::And) {
                    a.min(b)
                } else {
                    a.max(b)
                }
            }
            Token::Not => -pop(&mut stack)?,
            Token::True => 1,
            Token::False => -1,
            Token::Leaf(leaf) => match (&leaf.operator, &leaf.right) {
                (Operator::In, right) if is_empty_set(right) => -1,
                (Operator::NotIn, right) if is_empty_set(right) => 1,
                _ => 0,
            },
        };
        stack.push(value);
    }

    Ok(pop(&mut stack)? == -1)
}

fn is_empty_set(right: &Operand) -> bool {
    match right {
        Operand::Subquery(_) => false,
        Operand::Value(Value::Array(items)) => items.is_empty(),
        Operand::Value(v) => !super::ast::is_truthy(v),
    }
}

fn pop(stack: &mut Vec<i8>) -> DomainResult<i8> {
    stack
        .pop()
        .ok_or_else(|| DomainError::Malformed("operator without operands".into()))
}

/// AND of several domains.
///
/// TRUE domains are skipped and any FALSE domain makes the result FALSE.
pub fn and_all<I>(domains: I) -> DomainResult<Domain>
where
    I: IntoIterator<Item = Domain>,
{
    combine(Token::And, Domain::true_domain(), Domain::false_domain(), domains)
}

/// OR of several domains.
///
/// FALSE domains are skipped and any TRUE domain makes the result TRUE.
pub fn or_all<I>(domains: I) -> DomainResult<Domain>
where
    I: IntoIterator<Item = Domain>,
{
    combine(Token::Or, Domain::false_domain(), Domain::true_domain(), domains)
}

fn combine<I>(operator: Token, unit: Domain, zero: Domain, domains: I) -> DomainResult<Domain>
where
    I: IntoIterator<Item = Domain>,
{
    let mut body: Vec<Token> = Vec::new();
    let mut count = 0usize;

    for domain in domains {
        if domain == unit {
            continue;
        }
        if domain == zero {
            return Ok(zero);
        }
        if !domain.is_empty() {
            body.extend(normalize(&domain)?.into_tokens());
            count += 1;
        }
    }

    if count == 0 {
        return Ok(unit);
    }

    let mut tokens = vec![operator; count - 1];
    tokens.extend(body);
    Ok(Domain::new(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> Domain {
        Domain::from_json(&v).unwrap()
    }

    #[test]
    fn test_implicit_and_inserted() {
        let domain = parse(json!([["a", "=", 1], ["b", "=", 2], ["c", "=", 3]]));
        let normalized = normalize(&domain).unwrap();
        assert_eq!(
            normalized.to_json(),
            json!(["&", "&", ["a", "=", 1], ["b", "=", 2], ["c", "=", 3]])
        );
    }

    #[test]
    fn test_implicit_and_after_complete_expression() {
        let domain = parse(json!(["|", ["a", "=", 1], ["b", "=", 2], ["c", "=", 3]]));
        let normalized = normalize(&domain).unwrap();
        assert_eq!(
            normalized.to_json(),
            json!(["&", "|", ["a", "=", 1], ["b", "=", 2], ["c", "=", 3]])
        );
    }

    #[test]
    fn test_empty_domain_is_true() {
        assert_eq!(normalize(&Domain::default()).unwrap(), Domain::true_domain());
    }

    #[test]
    fn test_unbalanced_domain_rejected() {
        for bad in [
            json!(["&", ["a", "=", 1]]),
            json!(["!"]),
            json!([["a", "=", 1], "|"]),
        ] {
            let result = normalize(&parse(bad));
            assert!(matches!(result, Err(DomainError::Malformed(_))));
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let domain = parse(json!([
            "!", ["a", "=", 1],
            "|", ["b", "=", 2], ["c", "in", [1, 2]],
            ["d", "!=", false]
        ]));
        let once = normalize(&domain).unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_is_false_on_empty_in() {
        assert!(is_false(&parse(json!([["id", "in", []]]))).unwrap());
        assert!(!is_false(&parse(json!([["id", "not in", []]]))).unwrap());
        assert!(!is_false(&parse(json!([["id", "in", [1]]]))).unwrap());
        assert!(is_false(&parse(json!(["!", ["id", "not in", []]]))).unwrap());
    }

    #[test]
    fn test_is_false_with_unknown_leaves() {
        // FALSE AND unknown is still FALSE
        assert!(is_false(&parse(json!([[0, "=", 1], ["a", "=", 1]]))).unwrap());
        // FALSE OR unknown is undecided
        assert!(!is_false(&parse(json!(["|", [0, "=", 1], ["a", "=", 1]]))).unwrap());
    }

    #[test]
    fn test_combinators_absorb_units_and_zeros() {
        let a = Domain::leaf("a", Operator::Eq, json!(1));
        let b = Domain::leaf("b", Operator::Eq, json!(2));

        let both = and_all(vec![a.clone(), Domain::true_domain(), b.clone()]).unwrap();
        assert_eq!(both.to_json(), json!(["&", ["a", "=", 1], ["b", "=", 2]]));

        let any = or_all(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(any.to_json(), json!(["|", ["a", "=", 1], ["b", "=", 2]]));

        assert_eq!(
            and_all(vec![a.clone(), Domain::false_domain()]).unwrap(),
            Domain::false_domain()
        );
        assert_eq!(
            or_all(vec![a, Domain::true_domain()]).unwrap(),
            Domain::true_domain()
        );
        assert_eq!(or_all(Vec::new()).unwrap(), Domain::false_domain());
        assert_eq!(and_all(Vec::new()).unwrap(), Domain::true_domain());
    }
}
