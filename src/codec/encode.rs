//! Expression tree to query parameters.

use std::collections::BTreeMap;

use super::params::{FIELD_CONDITION, FIELD_NAME, FIELD_VALUE, QUERY_KEY, group_key};
use crate::error::{FilterError, combine};
use crate::filter::{
    AndFilter, AtomicFilter, CustomFilter, Evaluator, FilterExpression, NotFilter, OrFilter,
};

/// Evaluator that writes atomic filters into a parameter map.
///
/// Each atomic filter gets the next positional id (`p1`, `p2`, ...) in
/// pre-order. The counter belongs to this value, so independent serializations
/// never share ids.
#[derive(Debug, Default)]
pub struct QueryGenerator {
    counter: usize,
    params: BTreeMap<String, String>,
}

impl QueryGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("p{}", self.counter)
    }

    /// Parameters written so far, without `q`.
    pub fn into_params(self) -> BTreeMap<String, String> {
        self.params
    }
}

impl Evaluator for QueryGenerator {
    type Output = String;

    fn evaluate_atomic(&mut self, filter: &AtomicFilter) -> Result<String, FilterError> {
        let id = self.next_id();
        self.params
            .insert(group_key(&id, FIELD_NAME), filter.name().to_string());
        self.params
            .insert(group_key(&id, FIELD_CONDITION), filter.condition().to_string());
        self.params
            .insert(group_key(&id, FIELD_VALUE), filter.value().to_string());
        Ok(id)
    }

    fn evaluate_and(&mut self, filter: &AndFilter) -> Result<String, FilterError> {
        let (left, right) = combine(filter.left().accept(self), filter.right().accept(self))?;
        Ok(format!("{left} AND {right}"))
    }

    fn evaluate_or(&mut self, filter: &OrFilter) -> Result<String, FilterError> {
        let (left, right) = combine(filter.left().accept(self), filter.right().accept(self))?;
        Ok(format!("{left} OR {right}"))
    }

    fn evaluate_not(&mut self, filter: &NotFilter) -> Result<String, FilterError> {
        Ok(format!("NOT {}", filter.operand().accept(self)?))
    }

    fn evaluate_identity(&mut self) -> Result<String, FilterError> {
        Err(FilterError::unsupported(
            "identity expression has no query parameter form",
        ))
    }

    fn evaluate_custom(&mut self, filter: &dyn CustomFilter) -> Result<String, FilterError> {
        Err(FilterError::unsupported(format!(
            "custom expression {filter} has no query parameter form"
        )))
    }
}

/// Whether re-parsing the serialized `q` rebuilds the same tree shape.
///
/// The wire syntax has no parentheses, so only trees already shaped by the
/// precedence table survive: no OR under AND, no composite under NOT and no
/// right-nested chain of the same operator.
pub fn is_round_trippable(expr: &FilterExpression) -> bool {
    use FilterExpression as E;

    let unary = |e: &FilterExpression| matches!(e, E::Atomic(_) | E::Not(_));

    match expr {
        E::Atomic(_) => true,
        E::Not(n) => unary(n.operand()) && is_round_trippable(n.operand()),
        E::And(a) => {
            matches!(a.left(), E::Atomic(_) | E::Not(_) | E::And(_))
                && unary(a.right())
                && is_round_trippable(a.left())
                && is_round_trippable(a.right())
        }
        E::Or(o) => {
            !matches!(o.left(), E::Identity | E::Custom(_))
                && matches!(o.right(), E::Atomic(_) | E::Not(_) | E::And(_))
                && is_round_trippable(o.left())
                && is_round_trippable(o.right())
        }
        E::Identity | E::Custom(_) => false,
    }
}

/// Serialize an expression into query parameters, `q` included.
///
/// Identity and custom expressions have no wire form and fail with
/// [`FilterError::Unsupported`].
pub fn serialize(expr: &FilterExpression) -> Result<BTreeMap<String, String>, FilterError> {
    let mut generator = QueryGenerator::new();
    let query = expr.accept(&mut generator)?;

    if !is_round_trippable(expr) {
        tracing::warn!(
            "Filter {} cannot be expressed without grouping; re-parsing q='{}' will regroup it",
            expr,
            query
        );
    }

    let mut params = generator.into_params();
    tracing::debug!("Serialized filter to q='{}' ({} leaves)", query, expr.leaf_count());
    params.insert(QUERY_KEY.to_string(), query);
    Ok(params)
}

/// Serialize an expression into a URL-encoded query string.
pub fn to_query_string(expr: &FilterExpression) -> Result<String, FilterError> {
    let params = serialize(expr)?;
    serde_urlencoded::to_string(&params).map_err(|e| FilterError::Encoding(e.to_string()))
}
