use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::filtering::nested::FieldSet;
use crate::filtering::pagination::Pagination;
use crate::filtering::search::SearchSpec;
use crate::filtering::sort::{OrderBy, SortOrder};

/// Flat filter map; keys are bare field names or `"field:operator"`.
pub type FilterMap = Map<String, Value>;

/// Shorthand description of a query or mutation.
///
/// # Filtering
/// `filters` maps `"field:operator"` keys to values, for example:
/// ```json
/// {"age:gte": 18, "name:contains": "mo", "posts": {"some": {"published": true}}}
/// ```
///
/// # Field selection
/// `selectFields` / `includeFields` accept a list of names and relation
/// entries, for example:
/// ```json
/// ["id", "name", {"profile": ["id", "bio"]}]
/// ```
///
/// # Pagination
/// Either `{"page": 2, "limit": 10}` (1-indexed) or `{"skip": 10, "take": 10}`.
///
/// # Search
/// `{"term": "mo", "fields": ["name", "bio"]}` matches rows where any listed
/// field contains the term.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryOptions {
    pub filters: Option<FilterMap>,
    pub select_fields: Option<FieldSet>,
    pub include_fields: Option<FieldSet>,
    pub search: Option<SearchSpec>,
    pub pagination: Option<Pagination>,
    pub order_by: Option<OrderBy>,
    /// Passed through untouched as `_aggregate`
    pub aggregate: Option<Map<String, Value>>,
    /// Exclude soft-deleted rows
    pub soft_delete: bool,
    /// Native select entries laid over the ones built from `selectFields`
    pub select: Option<Map<String, Value>>,
    /// Native include entries laid over the ones built from `includeFields`
    pub include: Option<Map<String, Value>>,
    /// Write payload for create and update calls
    pub data: Option<Value>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one filter entry
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters
            .get_or_insert_with(FilterMap::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: FilterMap) -> Self {
        self.filters = Some(filters);
        self
    }

    #[must_use]
    pub fn select_fields(mut self, fields: impl Into<FieldSet>) -> Self {
        self.select_fields = Some(fields.into());
        self
    }

    #[must_use]
    pub fn include_fields(mut self, fields: impl Into<FieldSet>) -> Self {
        self.include_fields = Some(fields.into());
        self
    }

    #[must_use]
    pub fn search<I, S>(mut self, term: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search = Some(SearchSpec::new(term, fields));
        self
    }

    #[must_use]
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Append an ordering entry; earlier entries take precedence
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.get_or_insert_with(OrderBy::new).push(field, order);
        self
    }

    #[must_use]
    pub fn aggregate(mut self, aggregate: Map<String, Value>) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    #[must_use]
    pub fn soft_delete(mut self, soft_delete: bool) -> Self {
        self.soft_delete = soft_delete;
        self
    }

    #[must_use]
    pub fn select(mut self, select: Map<String, Value>) -> Self {
        self.select = Some(select);
        self
    }

    #[must_use]
    pub fn include(mut self, include: Map<String, Value>) -> Self {
        self.include = Some(include);
        self
    }

    #[must_use]
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// Arguments in the exact shape the delegate expects.
///
/// Keys that are absent are not serialized, and every map is key-sorted, so
/// two equal `NativeArgs` always serialize to the same JSON text.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeArgs {
    #[serde(rename = "where")]
    pub where_clause: Option<Map<String, Value>>,
    pub select: Option<Map<String, Value>>,
    pub include: Option<Map<String, Value>>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<Value>,
    pub data: Option<Value>,
    #[serde(rename = "_aggregate")]
    pub aggregate: Option<Map<String, Value>>,
    /// Other native keys (`create`, `update`, `by`, `cursor`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NativeArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments holding only a condition
    #[must_use]
    pub fn with_where(where_clause: Map<String, Value>) -> Self {
        Self {
            where_clause: Some(where_clause),
            ..Self::default()
        }
    }

    /// Arguments holding only a payload
    #[must_use]
    pub fn with_data(data: impl Into<Value>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// Set any other native key
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Whether no key is set at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Serialize to the JSON object handed to a delegate
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_native_args_skip_absent_keys() {
        let args = NativeArgs {
            skip: Some(10),
            ..NativeArgs::default()
        };
        assert_eq!(args.to_value(), json!({"skip": 10}));
    }

    #[test]
    fn test_native_args_rename_keys() {
        let mut aggregate = Map::new();
        aggregate.insert("_count".into(), json!(true));
        let mut where_clause = Map::new();
        where_clause.insert("id".into(), json!(1));
        let args = NativeArgs {
            where_clause: Some(where_clause),
            order_by: Some(json!({"name": "asc"})),
            aggregate: Some(aggregate),
            ..NativeArgs::default()
        };
        assert_eq!(
            args.to_value(),
            json!({"where": {"id": 1}, "orderBy": {"name": "asc"}, "_aggregate": {"_count": true}})
        );
    }

    #[test]
    fn test_native_args_keep_unknown_keys() {
        let args: NativeArgs = serde_json::from_value(json!({
            "where": {"id": 1},
            "create": {"name": "a"},
            "update": {"name": "b"},
        }))
        .unwrap();
        assert_eq!(args.extra["create"], json!({"name": "a"}));
        assert_eq!(args.to_value()["update"], json!({"name": "b"}));
    }

    #[test]
    fn test_empty_native_args() {
        assert!(NativeArgs::new().is_empty());
        assert!(!NativeArgs::with_data(json!({})).is_empty());
        assert_eq!(NativeArgs::new().to_value(), json!({}));
    }

    #[test]
    fn test_query_options_deserialize_camel_case() {
        let options: QueryOptions = serde_json::from_value(json!({
            "filters": {"age:gte": 18},
            "selectFields": ["id"],
            "softDelete": true,
            "orderBy": {"name": "asc"},
        }))
        .unwrap();
        assert!(options.soft_delete);
        assert!(options.select_fields.is_some());
        assert_eq!(options.filters.unwrap()["age:gte"], json!(18));
    }

    #[test]
    fn test_query_options_builder() {
        let options = QueryOptions::new()
            .filter("age:gte", 18)
            .filter("name:contains", "mo")
            .order_by("name", SortOrder::Asc)
            .soft_delete(true);
        assert_eq!(options.filters.as_ref().map(Map::len), Some(2));
        assert!(options.soft_delete);
        assert_eq!(options.order_by.map(|o| o.len()), Some(1));
    }
}
