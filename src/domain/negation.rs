//! Negation distribution
//!
//! Pushes every `!` down to the leaves. A negated leaf is rewritten with
//! the opposite operator (`=` to `!=`, `in` to `not in`, ...) instead of
//! being wrapped in SQL `NOT (...)`: under three-valued logic
//! `NOT (x IN (...))` and `x NOT IN (...)` disagree on NULL columns, and
//! only the operator form gets the NULL handling of the leaf translator.
//! Negated `&`/`|` swap per De Morgan and hand the negation to both
//! children. Leaves whose operator has no negation keep a `!` in front.

use super::ast::{Domain, Leaf, Token};
use super::normalize::normalize;
use crate::errors::{DomainError, DomainResult};

/// Returns `domain` with negations distributed to the leaves.
///
/// The input is normalized first. The only `!` tokens left in the output
/// directly precede a leaf whose operator has no negation.
pub fn distribute_not(domain: &Domain) -> DomainResult<Domain> {
    let normalized = normalize(domain)?;
    let mut result: Vec<Token> = Vec::with_capacity(normalized.len());
    // Pending negation for each expression still to be read
    let mut pending: Vec<bool> = vec![false];

    for token in normalized {
        let negate = pending
            .pop()
            .ok_or_else(|| DomainError::Malformed("too many tokens after normalization".into()))?;

        match token {
            Token::Not => pending.push(!negate),
            Token::And | Token::Or => {
                let emitted = match (negate, matches!(token, Token::And)) {
                    (true, true) => Token::Or,
                    (true, false) => Token::And,
                    (false, _) => token,
                };
                result.push(emitted);
                pending.push(negate);
                pending.push(negate);
            }
            Token::True if negate => result.push(Token::False),
            Token::False if negate => result.push(Token::True),
            Token::Leaf(leaf) if negate => match leaf.operator.negate() {
                Some(operator) => result.push(Token::Leaf(Leaf {
                    operator,
                    ..leaf
                })),
                None => {
                    result.push(Token::Not);
                    result.push(Token::Leaf(leaf));
                }
            },
            leaf => result.push(leaf),
        }
    }

    Ok(Domain::new(result))
}
