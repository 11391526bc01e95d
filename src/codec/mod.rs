//! Bidirectional codec between expression trees and URL query parameters.
//!
//! Wire format:
//!
//! ```text
//! q=p1 AND p2 OR NOT p3
//! filter[p1][name]=age        filter[p1][condition]=gt   filter[p1][value]=18
//! filter[p2][name]=city       ...
//! ```
//!
//! [`parse`] turns parameters into a [`FilterExpression`](crate::filter::FilterExpression),
//! [`serialize`] goes the other way and assigns positional ids to leaves.

mod params;
mod decode;
mod encode;

pub use params::{
    FIELD_CONDITION, FIELD_NAME, FIELD_VALUE, ParamGroup, ParamGroups, ParamSource, QUERY_KEY,
    group_key, parse_group_key,
};
pub use decode::{
    FilterParser, decode_query_string, parse, parse_query_string, parse_with_transform,
};
pub use encode::{QueryGenerator, is_round_trippable, serialize, to_query_string};
