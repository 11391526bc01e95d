use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::codec::FilterParser;
use crate::dsl::Limits;
use crate::error::FilterError;
use crate::filter::{Condition, FilterExpression};
use crate::transform::{FieldRule, TransformerMux};

/// Parser configuration file.
///
/// ```yaml
/// limits:
///   max_tokens: 256
/// transform:
///   strict: true
///   fields:
///     age: { column: users.age, conditions: [eq, gt, lt] }
/// ```
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub transform: TransformConfig,
}

impl FilterConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Build a parser honouring these limits and field rules.
    pub fn parser(&self) -> FilterParser {
        FilterParser::new()
            .with_limits(self.limits)
            .with_transformer(self.transform.build())
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct TransformConfig {
    /// Reject filter names without a rule.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub fields: HashMap<String, FieldRule>,
}

impl TransformConfig {
    pub fn build(&self) -> TransformerMux {
        TransformerMux::from_rules(self.strict, &self.fields)
    }
}

/// Expression tree written by hand in YAML or JSON.
///
/// ```yaml
/// any:
///   - all:
///       - { name: age, condition: gte, value: 18 }
///       - not: { name: city, condition: eq, value: Berlin }
///   - { name: vip, condition: eq, value: true }
/// ```
///
/// `all` and `any` lists fold left-associatively.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExprSpec {
    Leaf {
        name: String,
        condition: Condition,
        value: LeafValue,
    },
    All {
        all: Vec<ExprSpec>,
    },
    Any {
        any: Vec<ExprSpec>,
    },
    Not {
        not: Box<ExprSpec>,
    },
}

/// Scalars allowed as a leaf value. Everything ends up as a string on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LeafValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for LeafValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafValue::Bool(b) => write!(f, "{}", b),
            LeafValue::Int(i) => write!(f, "{}", i),
            LeafValue::Float(x) => write!(f, "{}", x),
            LeafValue::Text(s) => f.write_str(s),
        }
    }
}

impl ExprSpec {
    /// Read a YAML (or JSON) expression file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Build the expression tree, reporting every invalid leaf.
    pub fn build(&self) -> Result<FilterExpression, FilterError> {
        match self {
            ExprSpec::Leaf {
                name,
                condition,
                value,
            } => FilterExpression::atomic(name.as_str(), *condition, value.to_string()),
            ExprSpec::All { all } => {
                let exprs = build_all(all)?;
                FilterExpression::all(exprs)
                    .ok_or_else(|| FilterError::syntax("'all' needs at least one expression"))
            }
            ExprSpec::Any { any } => {
                let exprs = build_all(any)?;
                FilterExpression::any(exprs)
                    .ok_or_else(|| FilterError::syntax("'any' needs at least one expression"))
            }
            ExprSpec::Not { not } => not.build().map(FilterExpression::not),
        }
    }
}

fn build_all(specs: &[ExprSpec]) -> Result<Vec<FilterExpression>, FilterError> {
    let (built, errors): (Vec<_>, Vec<_>) = specs
        .iter()
        .map(ExprSpec::build)
        .partition(Result::is_ok);

    match FilterError::join(errors.into_iter().filter_map(Result::err)) {
        Some(err) => Err(err),
        None => Ok(built.into_iter().filter_map(Result::ok).collect()),
    }
}
