//! Boolean filter expressions carried in URL query parameters.
//!
//! ```text
//! ?q=p1 AND p2 OR NOT p3
//!  &filter[p1][name]=age&filter[p1][condition]=gte&filter[p1][value]=18
//!  ...
//! ```
//!
//! [`codec::parse`] turns such parameters into a [`FilterExpression`] tree,
//! [`codec::serialize`] turns a tree back into parameters, and an
//! [`Evaluator`] interprets the tree for a backend.

pub mod codec;
pub mod config;
pub mod dsl;
pub mod error;
pub mod filter;
pub mod transform;

pub use codec::{FilterParser, parse, parse_query_string, parse_with_transform, serialize};
pub use error::FilterError;
pub use filter::{
    AndFilter, AtomicFilter, Condition, CustomFilter, Evaluator, FilterExpression, NotFilter,
    OrFilter,
};
pub use transform::{Passthrough, Transformer, TransformerMux};
