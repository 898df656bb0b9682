//! SQL operator types and conversions

use crate::{Error, Result};
use std::fmt::{self, Display};

/// SQL comparison operator used in WHERE / HAVING predicates.
///
/// String operators are checked against a fixed allow-list. `Operator::custom`
/// bypasses that list and is written into the SQL verbatim, so it must only
/// ever carry caller-trusted text, never end-user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator(&'static str);

impl Operator {
    pub const EQ: Self = Operator("=");
    pub const NEQ: Self = Operator("!=");
    pub const LTGT: Self = Operator("<>");
    pub const GT: Self = Operator(">");
    pub const GTE: Self = Operator(">=");
    pub const LT: Self = Operator("<");
    pub const LTE: Self = Operator("<=");
    pub const LIKE: Self = Operator("LIKE");
    pub const NOT_LIKE: Self = Operator("NOT LIKE");
    pub const IN: Self = Operator("IN");
    pub const NOT_IN: Self = Operator("NOT IN");
    pub const IS_NULL: Self = Operator("IS NULL");
    pub const IS_NOT_NULL: Self = Operator("IS NOT NULL");

    /// Create a custom operator for database-specific operations
    ///
    /// # Examples
    /// ```
    /// use zorm::Operator;
    ///
    /// // MySQL null-safe equality
    /// let null_safe = Operator::custom("<=>");
    /// assert_eq!(null_safe.as_str(), "<=>");
    /// ```
    pub const fn custom(op: &'static str) -> Self {
        Operator(op)
    }

    /// Parse an operator from caller text, matching case-insensitively after trimming
    pub fn parse(text: &str) -> Result<Self> {
        let normalized = text.trim().to_ascii_uppercase();
        let op = match normalized.as_str() {
            "=" => Operator::EQ,
            "!=" => Operator::NEQ,
            "<>" => Operator::LTGT,
            ">" => Operator::GT,
            ">=" => Operator::GTE,
            "<" => Operator::LT,
            "<=" => Operator::LTE,
            "LIKE" => Operator::LIKE,
            "NOT LIKE" => Operator::NOT_LIKE,
            "IN" => Operator::IN,
            "NOT IN" => Operator::NOT_IN,
            "IS NULL" => Operator::IS_NULL,
            "IS NOT NULL" => Operator::IS_NOT_NULL,
            _ => {
                return Err(Error::InvalidOperator {
                    operator: text.to_string(),
                });
            }
        };
        Ok(op)
    }

    /// Get the string representation of the operator
    pub fn as_str(&self) -> &str {
        self.0
    }

    /// IN / NOT IN take a list operand
    pub fn is_list(&self) -> bool {
        *self == Operator::IN || *self == Operator::NOT_IN
    }

    /// IS NULL / IS NOT NULL take no operand
    pub fn is_nullary(&self) -> bool {
        *self == Operator::IS_NULL || *self == Operator::IS_NOT_NULL
    }

    /// Keyword operators are padded with spaces; symbolic ones are written flush
    pub fn is_keyword(&self) -> bool {
        self.0.chars().any(|c| c.is_ascii_alphabetic())
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for types that can be converted to SQL operators
pub trait IntoOperator {
    fn into_operator(self) -> Result<Operator>;
}

impl IntoOperator for Operator {
    fn into_operator(self) -> Result<Operator> {
        Ok(self)
    }
}

impl IntoOperator for &str {
    fn into_operator(self) -> Result<Operator> {
        Operator::parse(self)
    }
}

impl IntoOperator for String {
    fn into_operator(self) -> Result<Operator> {
        Operator::parse(&self)
    }
}

/// Convenience module for operator constants
pub mod op {
    use super::Operator;

    pub const EQ: Operator = Operator::EQ;
    pub const NEQ: Operator = Operator::NEQ;
    pub const LTGT: Operator = Operator::LTGT;
    pub const GT: Operator = Operator::GT;
    pub const GTE: Operator = Operator::GTE;
    pub const LT: Operator = Operator::LT;
    pub const LTE: Operator = Operator::LTE;
    pub const LIKE: Operator = Operator::LIKE;
    pub const NOT_LIKE: Operator = Operator::NOT_LIKE;
    pub const IN: Operator = Operator::IN;
    pub const NOT_IN: Operator = Operator::NOT_IN;
    pub const IS_NULL: Operator = Operator::IS_NULL;
    pub const IS_NOT_NULL: Operator = Operator::IS_NOT_NULL;
}
