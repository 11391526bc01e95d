//! Per-leaf rewrite hook applied while parsing.
//!
//! Every atomic filter resolved from the query goes through a [`Transformer`]
//! before it is inserted into the tree. This is where leaves get renamed,
//! coerced, expanded into richer sub-expressions or rejected.

mod rules;

use std::collections::HashMap;
use std::fmt;

use crate::error::FilterError;
use crate::filter::{AtomicFilter, FilterExpression};

pub use rules::FieldRule;

/// Rewrites one atomic filter into an expression.
pub trait Transformer: Send + Sync {
    fn transform(&self, filter: AtomicFilter) -> Result<FilterExpression, FilterError>;
}

/// Plain functions and closures are transformers.
///
/// ```
/// use qfilter::filter::{AtomicFilter, FilterExpression};
/// use qfilter::transform::Transformer;
///
/// let uppercase = |f: AtomicFilter| {
///     let value = f.value().to_uppercase();
///     f.with_value(value).map(FilterExpression::from)
/// };
/// ```
impl<F> Transformer for F
where
    F: Fn(AtomicFilter) -> Result<FilterExpression, FilterError> + Send + Sync,
{
    fn transform(&self, filter: AtomicFilter) -> Result<FilterExpression, FilterError> {
        self(filter)
    }
}

/// Returns every filter unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl Transformer for Passthrough {
    fn transform(&self, filter: AtomicFilter) -> Result<FilterExpression, FilterError> {
        Ok(FilterExpression::Atomic(filter))
    }
}

/// Dispatches to a transformer registered under the filter's `name`.
///
/// In lenient mode an unregistered name passes through unchanged. In strict
/// mode it is rejected with a [`FilterError::Transform`].
#[derive(Default)]
pub struct TransformerMux {
    strict: bool,
    transformers: HashMap<String, Box<dyn Transformer>>,
}

impl TransformerMux {
    /// An empty, lenient registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to strict mode.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Register `transformer` for filters named `name`, replacing any previous entry.
    pub fn register(mut self, name: impl Into<String>, transformer: impl Transformer + 'static) -> Self {
        self.transformers.insert(name.into(), Box::new(transformer));
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transformers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl fmt::Debug for TransformerMux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.transformers.keys().collect();
        names.sort();
        f.debug_struct("TransformerMux")
            .field("strict", &self.strict)
            .field("names", &names)
            .finish()
    }
}

impl Transformer for TransformerMux {
    fn transform(&self, filter: AtomicFilter) -> Result<FilterExpression, FilterError> {
        match self.transformers.get(filter.name()) {
            Some(transformer) => transformer.transform(filter),
            None if self.strict => Err(FilterError::transform(filter.name(), "unknown filter name")),
            None => {
                tracing::trace!("No transformer for '{}', passing through", filter.name());
                Passthrough.transform(filter)
            }
        }
    }
}
