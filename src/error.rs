//! Error taxonomy for parsing, transforming, evaluating and serializing filters.

use thiserror::Error;

/// Every failure the filter language can report.
///
/// Composite operations never stop at the first failing child. They collect
/// all failures and report them together as [`FilterError::Multiple`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Malformed token stream: empty input, leading or trailing operator,
    /// adjacent identifiers.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// An identifier referenced in `q` has a missing or incomplete parameter group.
    #[error("filter[{id}] is invalid: {reason}")]
    Validation { id: String, reason: String },

    /// A transformer rejected or failed on an atomic filter.
    #[error("transform failed for '{name}': {reason}")]
    Transform { name: String, reason: String },

    /// The consumer does not implement this variant (identity, custom).
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Input is larger than the configured parser limits allow.
    #[error("{what} limit exceeded: {actual} > {max}")]
    LimitExceeded {
        what: &'static str,
        max: usize,
        actual: usize,
    },

    /// A raw URL query string could not be decoded or encoded.
    #[error("query string encoding: {0}")]
    Encoding(String),

    /// Several independent failures collected in one pass.
    #[error("{}", join_messages(.0))]
    Multiple(Vec<FilterError>),
}

fn join_messages(errors: &[FilterError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FilterError {
    pub fn syntax(message: impl Into<String>) -> Self {
        FilterError::Syntax(message.into())
    }

    pub fn validation(id: impl Into<String>, reason: impl Into<String>) -> Self {
        FilterError::Validation {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn transform(name: impl Into<String>, reason: impl Into<String>) -> Self {
        FilterError::Transform {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        FilterError::Unsupported(message.into())
    }

    /// Aggregate errors into one, flattening nested `Multiple` values.
    ///
    /// Returns `None` when the iterator yields nothing and unwraps a single
    /// error instead of wrapping it.
    pub fn join<I>(errors: I) -> Option<FilterError>
    where
        I: IntoIterator<Item = FilterError>,
    {
        let mut flat = Vec::new();
        for err in errors {
            match err {
                FilterError::Multiple(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(FilterError::Multiple(flat)),
        }
    }

    /// Individual errors carried by this value.
    pub fn errors(&self) -> &[FilterError] {
        match self {
            FilterError::Multiple(inner) => inner,
            other => std::slice::from_ref(other),
        }
    }
}

/// Combine two independently computed results, keeping both errors on failure.
pub fn combine<A, B>(
    left: Result<A, FilterError>,
    right: Result<B, FilterError>,
) -> Result<(A, B), FilterError> {
    match (left, right) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(a), Ok(_)) => Err(a),
        (Ok(_), Err(b)) => Err(b),
        (Err(a), Err(b)) => Err(FilterError::Multiple(
            a.errors().iter().chain(b.errors()).cloned().collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_flattens_nested() {
        let nested = FilterError::Multiple(vec![
            FilterError::syntax("a"),
            FilterError::unsupported("b"),
        ]);
        let joined = FilterError::join([nested, FilterError::validation("p1", "c")]).unwrap();
        assert_eq!(joined.errors().len(), 3);
    }

    #[test]
    fn test_join_single_and_empty() {
        assert_eq!(FilterError::join(Vec::new()), None);
        assert_eq!(
            FilterError::join([FilterError::syntax("x")]),
            Some(FilterError::syntax("x"))
        );
    }

    #[test]
    fn test_combine_keeps_both_errors() {
        let left: Result<(), _> = Err(FilterError::syntax("left"));
        let right: Result<(), _> = Err(FilterError::syntax("right"));
        let err = combine(left, right).unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert_eq!(err.to_string(), "syntax error: left; syntax error: right");
    }
}
