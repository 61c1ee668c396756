//! # Shorthand Translation
//!
//! Pure, synchronous building blocks that turn the shorthand pieces of a
//! [`QueryOptions`](crate::QueryOptions) into the native argument shape.
//!
//! ## Main Components
//!
//! - **[`conditions`]**: `"field:operator"` filter maps to condition trees
//! - **[`nested`]**: field lists to nested `select`/`include` trees
//! - **[`search`]**: free-text search to an `OR` of `contains` conditions
//! - **[`pagination`]**: page/limit or skip/take to `skip`/`take`
//! - **[`sort`]**: ordered `field -> asc|desc` entries
//!
//! ## Examples
//!
//! ### Filters
//! ```rust,ignore
//! // Comparison operators
//! {"age:gte": 18, "age:lte": 65}          // {"age": {"gte": 18, "lte": 65}}
//!
//! // String matching is case-insensitive
//! {"name:contains": "mo"}                  // {"name": {"contains": "mo", "caseInsensitive": true}}
//!
//! // List membership; a scalar is wrapped
//! {"id:in": 3}                             // {"id": {"in": [3]}}
//!
//! // Relation filters pass through untouched
//! {"posts": {"some": {"published": true}}}
//! ```
//!
//! ### Field selection
//! ```rust,ignore
//! ["id", {"profile": ["id", "bio"]}]
//! // {"id": true, "profile": {"select": {"id": true, "bio": true}}}
//! ```

pub mod conditions;
pub mod nested;
pub mod pagination;
pub mod search;
pub mod sort;

pub use conditions::{FilterOperator, merge_condition, merge_field, merge_maps, parse_filters};
pub use nested::{FieldMode, FieldSet, FieldSpec, Relation, RelationArgs, build_nested_fields};
pub use pagination::Pagination;
pub use search::{SearchSpec, build_search_condition};
pub use sort::{OrderBy, SortOrder};
