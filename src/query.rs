//! Builders for the `where` and `order` parameters of the Accounting API.
//!
//! ```
//! use xero_oxi::query::{order_by, Conditions, Operator};
//!
//! let filter = Conditions::new()
//!     .condition("Name", "Test Value", Operator::Equal)
//!     .and()
//!     .condition("IsSupplier", false, Operator::Equal)
//!     .compile_conditions();
//! assert_eq!(filter["where"], r#"Name=="Test Value" AND IsSupplier=="false""#);
//! assert_eq!(order_by("Name", "DESC")["order"], "Name DESC");
//! ```

use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::{XeroError, XeroResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    StartsWith,
    EndsWith,
    Contains,
    /// Compares a GUID field.
    Guid,
}

impl Operator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::StartsWith => "StartsWith",
            Operator::EndsWith => "EndsWith",
            Operator::Contains => "Contains",
            Operator::Guid => "guid",
        }
    }
}

impl FromStr for Operator {
    type Err = XeroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            "StartsWith" => Ok(Operator::StartsWith),
            "EndsWith" => Ok(Operator::EndsWith),
            "Contains" => Ok(Operator::Contains),
            "guid" => Ok(Operator::Guid),
            _ => Err(XeroError::InvalidArgument("Invalid operator".into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl FromStr for LogicalOperator {
    type Err = XeroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(LogicalOperator::And),
            "OR" => Ok(LogicalOperator::Or),
            _ => Err(XeroError::InvalidArgument("Invalid logical operator".into())),
        }
    }
}

/// The right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    Text(String),
    Bool(bool),
    Integer(i64),
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Text(text) => f.write_str(text),
            ConditionValue::Bool(value) => write!(f, "{value}"),
            ConditionValue::Integer(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ConditionValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

/// Formats a single condition.
///
/// `Guid` renders as `Field= Guid("...")`, with a space after `=`; the API
/// expects exactly that form.
#[must_use]
pub fn compile_condition(field: &str, value: &ConditionValue, operator: Operator) -> String {
    match operator {
        Operator::Equal | Operator::NotEqual => format!("{field}{}\"{value}\"", operator.as_str()),
        Operator::Guid => format!("{field}= Guid(\"{value}\")"),
        Operator::StartsWith | Operator::EndsWith | Operator::Contains => {
            format!("{field}.{}(\"{value}\")", operator.as_str())
        }
    }
}

/// An ordered list of compiled conditions and logical operators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    terms: Vec<String>,
}

impl Conditions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn condition(mut self, field: &str, value: impl Into<ConditionValue>, operator: Operator) -> Self {
        self.terms
            .push(compile_condition(field, &value.into(), operator));
        self
    }

    /// Like [`Conditions::condition`], with the operator given by name.
    ///
    /// # Errors
    ///
    /// [`XeroError::InvalidArgument`] when `operator` is not one of `==`,
    /// `!=`, `StartsWith`, `EndsWith`, `Contains` or `guid`.
    pub fn add_condition(self, field: &str, value: impl Into<ConditionValue>, operator: &str) -> XeroResult<Self> {
        Ok(self.condition(field, value, operator.parse()?))
    }

    #[must_use]
    pub fn operator(mut self, operator: LogicalOperator) -> Self {
        self.terms.push(operator.as_str().to_string());
        self
    }

    /// Appends `AND` or `OR`.
    ///
    /// # Errors
    ///
    /// [`XeroError::InvalidArgument`] for any other value.
    pub fn add_operator(self, operator: &str) -> XeroResult<Self> {
        Ok(self.operator(operator.parse()?))
    }

    #[must_use]
    pub fn and(self) -> Self {
        self.operator(LogicalOperator::And)
    }

    #[must_use]
    pub fn or(self) -> Self {
        self.operator(LogicalOperator::Or)
    }

    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The `where` expression, or `None` when nothing was added.
    #[must_use]
    pub fn compile(&self) -> Option<String> {
        (!self.terms.is_empty()).then(|| self.terms.join(" "))
    }

    /// The `where` query parameter; empty when nothing was added.
    #[must_use]
    pub fn compile_conditions(&self) -> BTreeMap<&'static str, String> {
        self.compile()
            .map(|filter| ("where", filter))
            .into_iter()
            .collect()
    }
}

/// The `order` query parameter. Only `DESC` sorts descending.
#[must_use]
pub fn order_by(field: &str, direction: &str) -> BTreeMap<&'static str, String> {
    let order = if direction == "DESC" {
        format!("{field} DESC")
    } else {
        field.to_string()
    };
    BTreeMap::from([("order", order)])
}
