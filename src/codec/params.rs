//! Access to the flat query parameter map.
//!
//! Each variable of `q` names a parameter group made of three keys:
//! `filter[<id>][name]`, `filter[<id>][condition]` and `filter[<id>][value]`.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use winnow::combinator::eof;
use winnow::prelude::*;
use winnow::token::take_till;

use crate::error::FilterError;
use crate::filter::{AtomicFilter, Condition};

/// Key holding the expression.
pub const QUERY_KEY: &str = "q";

pub const FIELD_NAME: &str = "name";
pub const FIELD_CONDITION: &str = "condition";
pub const FIELD_VALUE: &str = "value";

/// Key of one field of a parameter group, e.g. `filter[p1][name]`.
pub fn group_key(id: &str, field: &str) -> String {
    format!("filter[{id}][{field}]")
}

/// A flat string-keyed parameter map.
pub trait ParamSource {
    fn params(&self) -> impl Iterator<Item = (&str, &str)>;
}

impl<S: BuildHasher> ParamSource for HashMap<String, String, S> {
    fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl ParamSource for BTreeMap<String, String> {
    fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl ParamSource for [(String, String)] {
    fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl ParamSource for Vec<(String, String)> {
    fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.as_slice().params()
    }
}

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

/// Parse `filter[<id>][<field>]` into `(id, field)`.
fn lex_group_key<'i>(input: &mut &'i str) -> PResult<(&'i str, &'i str)> {
    (
        "filter[",
        take_till(1.., ']'),
        "][",
        take_till(1.., ']'),
        "]",
        eof,
    )
        .map(|(_, id, _, field, _, _)| (id, field))
        .parse_next(input)
}

/// Split a parameter key into group id and field, if it is a group key.
pub fn parse_group_key(key: &str) -> Option<(&str, &str)> {
    let mut input = key;
    lex_group_key(&mut input).ok()
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// The raw, unvalidated fields of one parameter group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamGroup {
    pub name: Option<String>,
    pub condition: Option<String>,
    pub value: Option<String>,
}

impl ParamGroup {
    /// Validate the group and build its atomic filter.
    ///
    /// Every problem with the group is reported, not only the first.
    pub fn resolve(&self, id: &str) -> Result<AtomicFilter, FilterError> {
        let mut errors = Vec::new();

        let name = present(&self.name);
        if name.is_none() {
            errors.push(FilterError::validation(
                id,
                format!("{} is required", group_key(id, FIELD_NAME)),
            ));
        }

        let condition = match present(&self.condition) {
            None => {
                errors.push(FilterError::validation(
                    id,
                    format!("{} is required", group_key(id, FIELD_CONDITION)),
                ));
                None
            }
            Some(raw) => match raw.parse::<Condition>() {
                Ok(condition) => Some(condition),
                Err(reason) => {
                    errors.push(FilterError::validation(id, reason));
                    None
                }
            },
        };

        let value = present(&self.value);
        if value.is_none() {
            errors.push(FilterError::validation(
                id,
                format!("{} is required", group_key(id, FIELD_VALUE)),
            ));
        }

        match (name, condition, value) {
            (Some(name), Some(condition), Some(value)) => {
                AtomicFilter::new(name, condition, value)
            }
            _ => Err(FilterError::join(errors)
                .unwrap_or_else(|| FilterError::validation(id, "incomplete parameter group"))),
        }
    }
}

/// The `q` expression and parameter groups found in a parameter map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamGroups {
    query: Option<String>,
    groups: BTreeMap<String, ParamGroup>,
}

impl ParamGroups {
    /// Scan a parameter map. Keys that are neither `q` nor a group field are ignored.
    ///
    /// When a key occurs more than once the first occurrence wins.
    pub fn extract<P: ParamSource + ?Sized>(source: &P) -> Self {
        let mut extracted = ParamGroups::default();

        for (key, value) in source.params() {
            if key == QUERY_KEY {
                extracted.query.get_or_insert_with(|| value.to_string());
                continue;
            }

            let Some((id, field)) = parse_group_key(key) else {
                continue;
            };

            let group = extracted.groups.entry(id.to_string()).or_default();
            let slot = match field {
                FIELD_NAME => &mut group.name,
                FIELD_CONDITION => &mut group.condition,
                FIELD_VALUE => &mut group.value,
                other => {
                    tracing::debug!("Ignoring unknown filter field '{}' for '{}'", other, id);
                    continue;
                }
            };
            slot.get_or_insert_with(|| value.to_string());
        }

        extracted
    }

    /// The `q` expression, if present.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&ParamGroup> {
        self.groups.get(id)
    }

    /// Group ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Resolve the atomic filter for the variable `id`.
    pub fn resolve(&self, id: &str) -> Result<AtomicFilter, FilterError> {
        match self.groups.get(id) {
            Some(group) => group.resolve(id),
            None => Err(FilterError::validation(
                id,
                format!("no {}/condition/value parameters", group_key(id, FIELD_NAME)),
            )),
        }
    }
}
