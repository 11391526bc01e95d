//! Field rules: declarative transformers loaded from configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Transformer, TransformerMux};
use crate::error::FilterError;
use crate::filter::{AtomicFilter, FilterExpression};
use crate::filter::Condition;

/// What a client may do with one public field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldRule {
    /// Backend name the field is rewritten to. Kept as is when absent.
    pub column: Option<String>,
    /// Allowed conditions. Empty allows every condition.
    pub conditions: Vec<Condition>,
}

impl FieldRule {
    pub fn allows(&self, condition: Condition) -> bool {
        self.conditions.is_empty() || self.conditions.contains(&condition)
    }
}

impl Transformer for FieldRule {
    fn transform(&self, filter: AtomicFilter) -> Result<FilterExpression, FilterError> {
        if !self.allows(filter.condition()) {
            return Err(FilterError::transform(
                filter.name(),
                format!("condition '{}' is not allowed", filter.condition()),
            ));
        }

        let filter = match &self.column {
            Some(column) => filter.with_name(column.as_str())?,
            None => filter,
        };
        Ok(FilterExpression::Atomic(filter))
    }
}

impl TransformerMux {
    /// Build a registry with one [`FieldRule`] per field name.
    pub fn from_rules(strict: bool, rules: &HashMap<String, FieldRule>) -> Self {
        rules
            .iter()
            .fold(TransformerMux::new().with_strict(strict), |mux, (name, rule)| {
                mux.register(name.clone(), rule.clone())
            })
    }
}
