//! Filter expression model.
//!
//! A parsed `q` expression becomes a [`FilterExpression`] tree. Leaves are
//! [`AtomicFilter`]s comparing one field against one value; AND, OR and NOT
//! combine them. [`FilterExpression::Identity`] matches everything and
//! [`FilterExpression::Custom`] is the one open extension point.
//!
//! Trees are immutable once built. Interpret them through an
//! [`Evaluator`](eval::Evaluator).

pub mod eval;

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::FilterError;

pub use eval::{Evaluator, JsonEvaluator, RecordEvaluator, StringEvaluator, evaluate_filter};

/// Comparison applied between a resource field and the filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Eq,
    Neq,
    Contains,
    Lt,
    Lte,
    Gt,
    Gte,
    StartsWith,
}

impl Condition {
    pub const ALL: [Condition; 8] = [
        Condition::Eq,
        Condition::Neq,
        Condition::Contains,
        Condition::Lt,
        Condition::Lte,
        Condition::Gt,
        Condition::Gte,
        Condition::StartsWith,
    ];

    /// Wire name used in `filter[<id>][condition]`.
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Neq => "neq",
            Condition::Contains => "contains",
            Condition::Lt => "lt",
            Condition::Lte => "lte",
            Condition::Gt => "gt",
            Condition::Gte => "gte",
            Condition::StartsWith => "starts_with",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| format!("unknown condition '{value}'"))
    }
}

/// Leaf expression: `name condition value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicFilter {
    name: String,
    condition: Condition,
    value: String,
}

impl AtomicFilter {
    /// Build a leaf. Name and value must be non-empty.
    pub fn new(
        name: impl Into<String>,
        condition: Condition,
        value: impl Into<String>,
    ) -> Result<Self, FilterError> {
        let name = name.into();
        let value = value.into();
        if name.is_empty() {
            return Err(FilterError::validation("atomic", "name must not be empty"));
        }
        if value.is_empty() {
            return Err(FilterError::validation(name, "value must not be empty"));
        }
        Ok(AtomicFilter {
            name,
            condition,
            value,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Copy of this filter with another field name.
    pub fn with_name(&self, name: impl Into<String>) -> Result<Self, FilterError> {
        AtomicFilter::new(name, self.condition, self.value.clone())
    }

    /// Copy of this filter with another value.
    pub fn with_value(&self, value: impl Into<String>) -> Result<Self, FilterError> {
        AtomicFilter::new(self.name.clone(), self.condition, value)
    }

    /// Copy of this filter with another condition.
    pub fn with_condition(&self, condition: Condition) -> Self {
        AtomicFilter {
            condition,
            ..self.clone()
        }
    }
}

impl fmt::Display for AtomicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} '{}']", self.name, self.condition, self.value)
    }
}

/// Logical AND of two expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct AndFilter {
    left: Box<FilterExpression>,
    right: Box<FilterExpression>,
}

impl AndFilter {
    pub fn left(&self) -> &FilterExpression {
        &self.left
    }

    pub fn right(&self) -> &FilterExpression {
        &self.right
    }
}

/// Logical OR of two expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct OrFilter {
    left: Box<FilterExpression>,
    right: Box<FilterExpression>,
}

impl OrFilter {
    pub fn left(&self) -> &FilterExpression {
        &self.left
    }

    pub fn right(&self) -> &FilterExpression {
        &self.right
    }
}

/// Logical NOT of one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct NotFilter {
    operand: Box<FilterExpression>,
}

impl NotFilter {
    pub fn operand(&self) -> &FilterExpression {
        &self.operand
    }
}

/// Caller-defined expression.
///
/// Evaluators receive it through [`Evaluator::evaluate_custom`] and recover
/// the concrete type with `as_any().downcast_ref::<T>()`. An evaluator that
/// does not know the type must fail with [`FilterError::Unsupported`].
pub trait CustomFilter: fmt::Debug + fmt::Display + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// A filter expression tree.
#[derive(Debug, Clone)]
pub enum FilterExpression {
    Atomic(AtomicFilter),
    And(AndFilter),
    Or(OrFilter),
    Not(NotFilter),
    /// Matches every resource.
    Identity,
    Custom(Arc<dyn CustomFilter>),
}

impl FilterExpression {
    pub fn atomic(
        name: impl Into<String>,
        condition: Condition,
        value: impl Into<String>,
    ) -> Result<Self, FilterError> {
        AtomicFilter::new(name, condition, value).map(FilterExpression::Atomic)
    }

    pub fn and(left: FilterExpression, right: FilterExpression) -> Self {
        FilterExpression::And(AndFilter {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn or(left: FilterExpression, right: FilterExpression) -> Self {
        FilterExpression::Or(OrFilter {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: FilterExpression) -> Self {
        FilterExpression::Not(NotFilter {
            operand: Box::new(operand),
        })
    }

    pub fn custom(filter: impl CustomFilter + 'static) -> Self {
        FilterExpression::Custom(Arc::new(filter))
    }

    /// Fold expressions left-associatively with AND. `None` for an empty list.
    pub fn all<I>(exprs: I) -> Option<Self>
    where
        I: IntoIterator<Item = FilterExpression>,
    {
        exprs.into_iter().reduce(FilterExpression::and)
    }

    /// Fold expressions left-associatively with OR. `None` for an empty list.
    pub fn any<I>(exprs: I) -> Option<Self>
    where
        I: IntoIterator<Item = FilterExpression>,
    {
        exprs.into_iter().reduce(FilterExpression::or)
    }

    /// Double dispatch: invoke the evaluator method matching this variant.
    pub fn accept<E: Evaluator + ?Sized>(&self, evaluator: &mut E) -> Result<E::Output, FilterError> {
        match self {
            FilterExpression::Atomic(f) => evaluator.evaluate_atomic(f),
            FilterExpression::And(f) => evaluator.evaluate_and(f),
            FilterExpression::Or(f) => evaluator.evaluate_or(f),
            FilterExpression::Not(f) => evaluator.evaluate_not(f),
            FilterExpression::Identity => evaluator.evaluate_identity(),
            FilterExpression::Custom(c) => evaluator.evaluate_custom(c.as_ref()),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, FilterExpression::Identity)
    }

    /// Number of atomic leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            FilterExpression::Atomic(_) => 1,
            FilterExpression::And(f) => f.left.leaf_count() + f.right.leaf_count(),
            FilterExpression::Or(f) => f.left.leaf_count() + f.right.leaf_count(),
            FilterExpression::Not(f) => f.operand.leaf_count(),
            FilterExpression::Identity | FilterExpression::Custom(_) => 0,
        }
    }
}

impl From<AtomicFilter> for FilterExpression {
    fn from(filter: AtomicFilter) -> Self {
        FilterExpression::Atomic(filter)
    }
}

/// Custom expressions compare by identity since their payload is opaque.
impl PartialEq for FilterExpression {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FilterExpression::Atomic(a), FilterExpression::Atomic(b)) => a == b,
            (FilterExpression::And(a), FilterExpression::And(b)) => a == b,
            (FilterExpression::Or(a), FilterExpression::Or(b)) => a == b,
            (FilterExpression::Not(a), FilterExpression::Not(b)) => a == b,
            (FilterExpression::Identity, FilterExpression::Identity) => true,
            (FilterExpression::Custom(a), FilterExpression::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Canonical string form, e.g. `(([a eq '1'] && [b eq '2']) || ![c eq '3'])`.
impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::Atomic(a) => write!(f, "{}", a),
            FilterExpression::And(a) => write!(f, "({} && {})", a.left, a.right),
            FilterExpression::Or(o) => write!(f, "({} || {})", o.left, o.right),
            FilterExpression::Not(n) => write!(f, "!{}", n.operand),
            FilterExpression::Identity => write!(f, "TRUE"),
            FilterExpression::Custom(c) => write!(f, "{}", c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, value: &str) -> FilterExpression {
        FilterExpression::atomic(name, Condition::Eq, value).unwrap()
    }

    #[derive(Debug)]
    struct Geo;

    impl fmt::Display for Geo {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "GEO")
        }
    }

    impl CustomFilter for Geo {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_condition_wire_names() {
        for condition in Condition::ALL {
            assert_eq!(condition.as_str().parse::<Condition>(), Ok(condition));
        }
        assert_eq!("starts_with".parse::<Condition>(), Ok(Condition::StartsWith));
        assert!("EQ".parse::<Condition>().is_err());
        assert!("like".parse::<Condition>().is_err());
    }

    #[test]
    fn test_atomic_requires_fields() {
        assert!(AtomicFilter::new("", Condition::Eq, "1").is_err());
        assert!(AtomicFilter::new("age", Condition::Eq, "").is_err());
        let f = AtomicFilter::new("age", Condition::Gt, "18").unwrap();
        assert_eq!(f.to_string(), "[age gt '18']");
    }

    #[test]
    fn test_display_canonical() {
        let expr = FilterExpression::or(
            FilterExpression::and(leaf("value", "5"), leaf("value", "2")),
            FilterExpression::not(leaf("value", "4")),
        );
        assert_eq!(
            expr.to_string(),
            "(([value eq '5'] && [value eq '2']) || ![value eq '4'])"
        );
        assert_eq!(FilterExpression::Identity.to_string(), "TRUE");
        assert_eq!(FilterExpression::custom(Geo).to_string(), "GEO");
    }

    #[test]
    fn test_all_and_any_fold_left() {
        let expr = FilterExpression::all([leaf("a", "1"), leaf("b", "2"), leaf("c", "3")]).unwrap();
        assert_eq!(
            expr.to_string(),
            "(([a eq '1'] && [b eq '2']) && [c eq '3'])"
        );
        assert_eq!(FilterExpression::any(Vec::new()), None);
        assert_eq!(expr.leaf_count(), 3);
    }

    #[test]
    fn test_custom_equality_is_identity() {
        let a = FilterExpression::custom(Geo);
        let b = FilterExpression::custom(Geo);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
