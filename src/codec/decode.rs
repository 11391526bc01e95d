//! Query parameters to expression tree.

use std::collections::BTreeMap;
use std::fmt;

use super::params::{ParamGroups, ParamSource};
use crate::dsl::{Limits, Node, TokenKind, build_ast};
use crate::error::{FilterError, combine};
use crate::filter::FilterExpression;
use crate::transform::{Passthrough, Transformer};

/// Parses filter query parameters into a [`FilterExpression`].
///
/// Holds no per-call state, so one parser can serve any number of threads.
pub struct FilterParser {
    transformer: Box<dyn Transformer>,
    limits: Limits,
}

impl Default for FilterParser {
    fn default() -> Self {
        Self {
            transformer: Box::new(Passthrough),
            limits: Limits::default(),
        }
    }
}

impl fmt::Debug for FilterParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterParser")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl FilterParser {
    /// A passthrough parser with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformer = Box::new(transformer);
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Parse a parameter map.
    ///
    /// A missing or blank `q` yields [`FilterExpression::Identity`]. Any
    /// failure aborts the parse; failures from independent leaves are all
    /// reported together.
    pub fn parse<P: ParamSource + ?Sized>(&self, params: &P) -> Result<FilterExpression, FilterError> {
        let groups = ParamGroups::extract(params);

        let Some(query) = groups.query().filter(|q| !q.trim().is_empty()) else {
            tracing::debug!("No filter expression, using identity");
            return Ok(FilterExpression::Identity);
        };

        let ast = build_ast(query, &self.limits)?;
        tracing::debug!("Parsed filter expression: {}", ast);

        let expr = self.substitute(&ast, &groups)?;
        tracing::debug!("Filter: {}", expr);
        Ok(expr)
    }

    /// Decode a raw URL query string (`q=p1&filter%5Bp1%5D%5Bname%5D=...`) and parse it.
    ///
    /// When a key repeats, the first occurrence wins.
    pub fn parse_query_string(&self, raw: &str) -> Result<FilterExpression, FilterError> {
        let params = decode_query_string(raw)?;
        self.parse(&params)
    }

    /// Replace every node of the syntax tree with its expression equivalent.
    fn substitute(&self, node: &Node, groups: &ParamGroups) -> Result<FilterExpression, FilterError> {
        match node.token.kind {
            TokenKind::Variable => {
                let id = node.token.text.as_str();
                let filter = groups.resolve(id)?;
                tracing::trace!("Resolved {} to {}", id, filter);
                self.transformer.transform(filter)
            }
            TokenKind::Not => {
                let operand = self.substitute(child(node, &node.left)?, groups)?;
                Ok(FilterExpression::not(operand))
            }
            TokenKind::And | TokenKind::Or => {
                let left = child(node, &node.left).and_then(|n| self.substitute(n, groups));
                let right = child(node, &node.right).and_then(|n| self.substitute(n, groups));
                let (left, right) = combine(left, right)?;
                Ok(match node.token.kind {
                    TokenKind::And => FilterExpression::and(left, right),
                    _ => FilterExpression::or(left, right),
                })
            }
        }
    }
}

fn child<'n>(parent: &Node, slot: &'n Option<Box<Node>>) -> Result<&'n Node, FilterError> {
    slot.as_deref().ok_or_else(|| {
        FilterError::syntax(format!("operator '{}' is missing an operand", parent.token.text))
    })
}

/// Decode a URL query string into a parameter map, first occurrence winning.
pub fn decode_query_string(raw: &str) -> Result<BTreeMap<String, String>, FilterError> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(raw).map_err(|e| FilterError::Encoding(e.to_string()))?;

    let mut params = BTreeMap::new();
    for (key, value) in pairs {
        params.entry(key).or_insert(value);
    }
    Ok(params)
}

/// Parse with a passthrough transformer and default limits.
pub fn parse<P: ParamSource + ?Sized>(params: &P) -> Result<FilterExpression, FilterError> {
    FilterParser::default().parse(params)
}

/// Parse, passing every atomic filter through `transformer`.
pub fn parse_with_transform<P, T>(params: &P, transformer: T) -> Result<FilterExpression, FilterError>
where
    P: ParamSource + ?Sized,
    T: Transformer + 'static,
{
    FilterParser::new().with_transformer(transformer).parse(params)
}

/// Decode and parse a raw URL query string with the default parser.
pub fn parse_query_string(raw: &str) -> Result<FilterExpression, FilterError> {
    FilterParser::default().parse_query_string(raw)
}
