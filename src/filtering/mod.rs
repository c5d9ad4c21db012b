//! # Query Parameter Filtering
//!
//! Turns arbitrary query string parameters into a typed [`FilterQuery`] and
//! then into Sea-ORM conditions.
//!
//! ## Query Parameter Examples
//!
//! ```rust,ignore
//! // Substring match on a text column
//! GET /items?name=foo
//!
//! // Equality or id list on integer columns and associations
//! GET /items?priority=3
//! GET /items?priority=3,4
//! GET /items?owner=12
//!
//! // Negation with a trailing `!`
//! GET /items?status!=done
//!
//! // Column of a joined relation (not validated)
//! GET /items?owner_name=alice
//!
//! // Update window, Unix seconds
//! GET /items?since=1000000000&until=2000000000
//!
//! // Sorting
//! GET /items?orderBy=name&orderBySort=DESC
//! ```
//!
//! Unknown fields, blank values and values that don't fit their field are
//! dropped silently so a client can pass loosely built query strings.

pub mod builder;
pub mod conditions;
pub mod fields;
pub mod params;
pub mod predicate;

pub use builder::{QueryFilterBuilder, parse_timestamp};
pub use conditions::{build_condition, column_expr, order_exprs, predicate_expr};
pub use fields::{EntityMetadata, FieldDescriptor, FieldKind, FieldTable, field_exists, resolve};
pub use params::{FilterParam, ListQuery, RESERVED_PARAMS, merge_params};
pub use predicate::{
    FieldPath, FilterOperator, FilterQuery, OrderBy, PredicateError, PredicateValue,
    QueryPredicate, SortDirection,
};
