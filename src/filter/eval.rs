//! Evaluator protocol for filter expressions.
//!
//! An [`Evaluator`] has one method per expression variant and
//! [`FilterExpression::accept`] calls exactly one of them, so new
//! interpretations (stringify, query generation, storage predicates) live
//! outside the expression types.
//!
//! Composite variants evaluate every child even when one fails and report
//! all failures together; see [`combine`].

use serde_json::{Value, json};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::{AndFilter, AtomicFilter, Condition, CustomFilter, FilterExpression, NotFilter, OrFilter};
use crate::error::{FilterError, combine};

/// Interprets a [`FilterExpression`] tree.
///
/// `evaluate_custom` has no default. Evaluators that do not understand a
/// custom expression must return [`FilterError::Unsupported`].
pub trait Evaluator {
    type Output;

    fn evaluate_atomic(&mut self, filter: &AtomicFilter) -> Result<Self::Output, FilterError>;
    fn evaluate_and(&mut self, filter: &AndFilter) -> Result<Self::Output, FilterError>;
    fn evaluate_or(&mut self, filter: &OrFilter) -> Result<Self::Output, FilterError>;
    fn evaluate_not(&mut self, filter: &NotFilter) -> Result<Self::Output, FilterError>;
    fn evaluate_identity(&mut self) -> Result<Self::Output, FilterError>;
    fn evaluate_custom(&mut self, filter: &dyn CustomFilter) -> Result<Self::Output, FilterError>;
}

/// Evaluate `expr` with `evaluator`.
pub fn evaluate_filter<E: Evaluator + ?Sized>(
    evaluator: &mut E,
    expr: &FilterExpression,
) -> Result<E::Output, FilterError> {
    expr.accept(evaluator)
}

/// Produces the canonical string form of a tree.
///
/// Agrees with `Display` for [`FilterExpression`]; custom expressions render
/// through their own `Display`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringEvaluator;

impl Evaluator for StringEvaluator {
    type Output = String;

    fn evaluate_atomic(&mut self, filter: &AtomicFilter) -> Result<String, FilterError> {
        Ok(filter.to_string())
    }

    fn evaluate_and(&mut self, filter: &AndFilter) -> Result<String, FilterError> {
        let (left, right) = combine(filter.left().accept(self), filter.right().accept(self))?;
        Ok(format!("({left} && {right})"))
    }

    fn evaluate_or(&mut self, filter: &OrFilter) -> Result<String, FilterError> {
        let (left, right) = combine(filter.left().accept(self), filter.right().accept(self))?;
        Ok(format!("({left} || {right})"))
    }

    fn evaluate_not(&mut self, filter: &NotFilter) -> Result<String, FilterError> {
        Ok(format!("!{}", filter.operand().accept(self)?))
    }

    fn evaluate_identity(&mut self) -> Result<String, FilterError> {
        Ok("TRUE".to_string())
    }

    fn evaluate_custom(&mut self, filter: &dyn CustomFilter) -> Result<String, FilterError> {
        Ok(filter.to_string())
    }
}

/// Evaluates a tree against a flat record of field values.
///
/// A field missing from the record never matches. Ordering conditions compare
/// numerically when both sides parse as finite numbers and lexicographically
/// otherwise, so `NaN` and `inf` only equal their own spelling.
#[derive(Debug, Clone, Copy)]
pub struct RecordEvaluator<'a> {
    record: &'a HashMap<String, String>,
}

impl<'a> RecordEvaluator<'a> {
    pub fn new(record: &'a HashMap<String, String>) -> Self {
        Self { record }
    }

    /// Convenience wrapper: does `expr` match `record`?
    pub fn matches(
        expr: &FilterExpression,
        record: &'a HashMap<String, String>,
    ) -> Result<bool, FilterError> {
        expr.accept(&mut RecordEvaluator::new(record))
    }
}

fn compare_values(actual: &str, expected: &str) -> Ordering {
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) if a.is_finite() && b.is_finite() => {
            a.partial_cmp(&b).unwrap_or_else(|| actual.cmp(expected))
        }
        _ => actual.cmp(expected),
    }
}

impl Evaluator for RecordEvaluator<'_> {
    type Output = bool;

    fn evaluate_atomic(&mut self, filter: &AtomicFilter) -> Result<bool, FilterError> {
        let Some(actual) = self.record.get(filter.name()) else {
            return Ok(false);
        };
        let expected = filter.value();

        Ok(match filter.condition() {
            Condition::Eq => compare_values(actual, expected) == Ordering::Equal,
            Condition::Neq => compare_values(actual, expected) != Ordering::Equal,
            Condition::Contains => actual.contains(expected),
            Condition::StartsWith => actual.starts_with(expected),
            Condition::Lt => compare_values(actual, expected) == Ordering::Less,
            Condition::Lte => compare_values(actual, expected) != Ordering::Greater,
            Condition::Gt => compare_values(actual, expected) == Ordering::Greater,
            Condition::Gte => compare_values(actual, expected) != Ordering::Less,
        })
    }

    fn evaluate_and(&mut self, filter: &AndFilter) -> Result<bool, FilterError> {
        let (left, right) = combine(filter.left().accept(self), filter.right().accept(self))?;
        Ok(left && right)
    }

    fn evaluate_or(&mut self, filter: &OrFilter) -> Result<bool, FilterError> {
        let (left, right) = combine(filter.left().accept(self), filter.right().accept(self))?;
        Ok(left || right)
    }

    fn evaluate_not(&mut self, filter: &NotFilter) -> Result<bool, FilterError> {
        Ok(!filter.operand().accept(self)?)
    }

    fn evaluate_identity(&mut self) -> Result<bool, FilterError> {
        Ok(true)
    }

    fn evaluate_custom(&mut self, filter: &dyn CustomFilter) -> Result<bool, FilterError> {
        Err(FilterError::unsupported(format!(
            "record evaluation of custom expression {filter}"
        )))
    }
}

/// Renders a tree as JSON.
///
/// Atomic filters become `{"name", "condition", "value"}` objects, composites
/// `{"and": [l, r]}`, `{"or": [l, r]}` and `{"not": x}`, identity `true`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEvaluator;

impl Evaluator for JsonEvaluator {
    type Output = Value;

    fn evaluate_atomic(&mut self, filter: &AtomicFilter) -> Result<Value, FilterError> {
        Ok(json!({
            "name": filter.name(),
            "condition": filter.condition().as_str(),
            "value": filter.value(),
        }))
    }

    fn evaluate_and(&mut self, filter: &AndFilter) -> Result<Value, FilterError> {
        let (left, right) = combine(filter.left().accept(self), filter.right().accept(self))?;
        Ok(json!({ "and": [left, right] }))
    }

    fn evaluate_or(&mut self, filter: &OrFilter) -> Result<Value, FilterError> {
        let (left, right) = combine(filter.left().accept(self), filter.right().accept(self))?;
        Ok(json!({ "or": [left, right] }))
    }

    fn evaluate_not(&mut self, filter: &NotFilter) -> Result<Value, FilterError> {
        Ok(json!({ "not": filter.operand().accept(self)? }))
    }

    fn evaluate_identity(&mut self) -> Result<Value, FilterError> {
        Ok(Value::Bool(true))
    }

    fn evaluate_custom(&mut self, filter: &dyn CustomFilter) -> Result<Value, FilterError> {
        Err(FilterError::unsupported(format!(
            "JSON rendering of custom expression {filter}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::fmt;

    fn leaf(name: &str, condition: Condition, value: &str) -> FilterExpression {
        FilterExpression::atomic(name, condition, value).unwrap()
    }

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[derive(Debug)]
    struct Within(u32);

    impl fmt::Display for Within {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "<within {}km>", self.0)
        }
    }

    impl CustomFilter for Within {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Counts leaves and understands `Within`.
    struct LeafCounter;

    impl Evaluator for LeafCounter {
        type Output = usize;

        fn evaluate_atomic(&mut self, _: &AtomicFilter) -> Result<usize, FilterError> {
            Ok(1)
        }
        fn evaluate_and(&mut self, f: &AndFilter) -> Result<usize, FilterError> {
            let (l, r) = combine(f.left().accept(self), f.right().accept(self))?;
            Ok(l + r)
        }
        fn evaluate_or(&mut self, f: &OrFilter) -> Result<usize, FilterError> {
            let (l, r) = combine(f.left().accept(self), f.right().accept(self))?;
            Ok(l + r)
        }
        fn evaluate_not(&mut self, f: &NotFilter) -> Result<usize, FilterError> {
            f.operand().accept(self)
        }
        fn evaluate_identity(&mut self) -> Result<usize, FilterError> {
            Ok(0)
        }
        fn evaluate_custom(&mut self, f: &dyn CustomFilter) -> Result<usize, FilterError> {
            match f.as_any().downcast_ref::<Within>() {
                Some(w) => Ok(w.0 as usize),
                None => Err(FilterError::unsupported("unknown custom filter")),
            }
        }
    }

    #[test]
    fn test_string_evaluator_matches_display() {
        let expr = FilterExpression::or(
            FilterExpression::and(
                leaf("value", Condition::Eq, "5"),
                FilterExpression::custom(Within(3)),
            ),
            FilterExpression::not(leaf("value", Condition::Eq, "4")),
        );
        let rendered = evaluate_filter(&mut StringEvaluator, &expr).unwrap();
        assert_eq!(rendered, expr.to_string());
        assert_eq!(rendered, "(([value eq '5'] && <within 3km>) || ![value eq '4'])");
    }

    #[test]
    fn test_custom_dispatch() {
        let expr = FilterExpression::and(
            leaf("a", Condition::Eq, "1"),
            FilterExpression::custom(Within(7)),
        );
        assert_eq!(evaluate_filter(&mut LeafCounter, &expr), Ok(8));
    }

    #[test]
    fn test_record_conditions() {
        let rec = record(&[("age", "30"), ("name", "Johnson"), ("city", "Berlin")]);
        let cases = [
            (leaf("age", Condition::Eq, "30.0"), true),
            (leaf("age", Condition::Neq, "31"), true),
            (leaf("age", Condition::Gt, "4"), true),
            (leaf("age", Condition::Gte, "30"), true),
            (leaf("age", Condition::Lt, "30"), false),
            (leaf("age", Condition::Lte, "29"), false),
            (leaf("name", Condition::Contains, "ohn"), true),
            (leaf("name", Condition::StartsWith, "John"), true),
            (leaf("city", Condition::Lt, "Cairo"), true),
            (leaf("missing", Condition::Neq, "x"), false),
        ];
        for (expr, expected) in cases {
            assert_eq!(RecordEvaluator::matches(&expr, &rec), Ok(expected), "{expr}");
        }
    }

    #[test]
    fn test_record_non_finite() {
        let rec = record(&[("score", "NaN"), ("code", "inf")]);
        let cases = [
            (leaf("score", Condition::Eq, "5"), false),
            (leaf("score", Condition::Neq, "5"), true),
            (leaf("score", Condition::Lte, "5"), false),
            (leaf("score", Condition::Eq, "NaN"), true),
            (leaf("code", Condition::Eq, "infinity"), false),
            (leaf("code", Condition::Eq, "inf"), true),
        ];
        for (expr, expected) in cases {
            assert_eq!(RecordEvaluator::matches(&expr, &rec), Ok(expected), "{expr}");
        }
    }

    #[test]
    fn test_record_composites() {
        let rec = record(&[("age", "30")]);
        let expr = FilterExpression::or(
            FilterExpression::not(leaf("age", Condition::Gt, "18")),
            FilterExpression::Identity,
        );
        assert_eq!(RecordEvaluator::matches(&expr, &rec), Ok(true));
    }

    #[test]
    fn test_failures_are_aggregated() {
        let rec = record(&[]);
        let expr = FilterExpression::and(
            FilterExpression::custom(Within(1)),
            FilterExpression::or(
                leaf("a", Condition::Eq, "1"),
                FilterExpression::custom(Within(2)),
            ),
        );
        let err = RecordEvaluator::matches(&expr, &rec).unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert!(err.errors().iter().all(|e| matches!(e, FilterError::Unsupported(_))));
    }

    #[test]
    fn test_json_evaluator() {
        let expr = FilterExpression::and(
            leaf("age", Condition::Gte, "18"),
            FilterExpression::not(leaf("name", Condition::StartsWith, "J")),
        );
        let value = evaluate_filter(&mut JsonEvaluator, &expr).unwrap();
        assert_eq!(
            value,
            json!({
                "and": [
                    { "name": "age", "condition": "gte", "value": "18" },
                    { "not": { "name": "name", "condition": "starts_with", "value": "J" } }
                ]
            })
        );
        assert!(evaluate_filter(&mut JsonEvaluator, &FilterExpression::custom(Within(1))).is_err());
    }
}
