//! Leaf comparison operators
//!
//! Tags handed to [`ExpressionFactory::predicate`](super::ExpressionFactory::predicate)
//! together with a property path and an optional literal.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    // Equality
    Equal,
    NotEqual,
    /// `upper(path) = value`, value already upper-cased by the builder
    EqualIgnoreCase,
    NotEqualIgnoreCase,
    // Membership
    In,
    NotIn,
    // Null checks
    IsNull,
    IsNotNull,
    /// `upper(path) LIKE value`
    LikeIgnoreCase,
    // Ordering
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    /// Property equals the greatest value of the same property over the root entity
    EqualsGreatest,
}

impl Operator {
    /// Whether the operator is applied to a literal
    pub fn takes_value(&self) -> bool {
        !matches!(
            self,
            Operator::IsNull | Operator::IsNotNull | Operator::EqualsGreatest
        )
    }

    /// Whether the engine must compare against `upper(path)`
    pub fn is_ignore_case(&self) -> bool {
        matches!(
            self,
            Operator::EqualIgnoreCase | Operator::NotEqualIgnoreCase | Operator::LikeIgnoreCase
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Equal | Operator::EqualIgnoreCase => write!(f, "equal"),
            Operator::NotEqual | Operator::NotEqualIgnoreCase => write!(f, "not equal"),
            Operator::In => write!(f, "in"),
            Operator::NotIn => write!(f, "not in"),
            Operator::IsNull => write!(f, "is null"),
            Operator::IsNotNull => write!(f, "is not null"),
            Operator::LikeIgnoreCase => write!(f, "like"),
            Operator::GreaterThan => write!(f, ">"),
            Operator::GreaterThanOrEqual => write!(f, ">="),
            Operator::LessThan => write!(f, "<"),
            Operator::LessThanOrEqual => write!(f, "<="),
            Operator::EqualsGreatest => write!(f, "equal max"),
        }
    }
}
