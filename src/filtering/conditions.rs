use serde_json::{Map, Value};

use crate::models::FilterMap;

/// Separates a field name from its operator suffix, as in `"age:gte"`
pub const OPERATOR_SEPARATOR: char = ':';

/// Flag attached to string-matching conditions
pub const CASE_INSENSITIVE: &str = "caseInsensitive";

/// Equality key used when a bare value has to share a field with operators
pub const EQUALS: &str = "equals";

pub const AND: &str = "AND";
pub const OR: &str = "OR";
pub const NOT: &str = "NOT";

/// Comparison operators understood in filter keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// `field:eq`
    Eq,
    /// `field:ne` or `field:not`
    Not,
    /// `field:gt`
    Gt,
    /// `field:gte`
    Gte,
    /// `field:lt`
    Lt,
    /// `field:lte`
    Lte,
    /// `field:contains`
    Contains,
    /// `field:startsWith` or `field:starts`
    StartsWith,
    /// `field:endsWith` or `field:ends`
    EndsWith,
    /// `field:in`
    In,
    /// `field:notIn`
    NotIn,
}

impl FilterOperator {
    /// Parse an operator from the part of a filter key after the separator
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "eq" => Some(Self::Eq),
            "ne" | "not" => Some(Self::Not),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "contains" => Some(Self::Contains),
            "startsWith" | "starts" => Some(Self::StartsWith),
            "endsWith" | "ends" => Some(Self::EndsWith),
            "in" => Some(Self::In),
            "notIn" => Some(Self::NotIn),
            _ => None,
        }
    }

    /// Key this operator is written under in a condition object
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => EQUALS,
            Self::Not => "not",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::In => "in",
            Self::NotIn => "notIn",
        }
    }

    /// Build the condition for a single field
    ///
    /// Equality is the bare value; string matching carries the
    /// case-insensitive flag; `in`/`notIn` always hold a sequence.
    #[must_use]
    pub fn condition(self, value: Value) -> Value {
        let mut condition = Map::new();
        match self {
            Self::Eq => return value,
            Self::Not | Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                condition.insert(self.as_str().to_owned(), value);
            }
            Self::Contains | Self::StartsWith | Self::EndsWith => {
                condition.insert(self.as_str().to_owned(), value);
                condition.insert(CASE_INSENSITIVE.to_owned(), Value::Bool(true));
            }
            Self::In | Self::NotIn => {
                condition.insert(self.as_str().to_owned(), into_sequence(value));
            }
        }
        Value::Object(condition)
    }
}

fn into_sequence(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        other => Value::Array(vec![other]),
    }
}

/// Split `"field:operator"` on the first separator.
///
/// Field names that themselves contain the separator cannot be expressed;
/// everything after the first `:` is read as the operator.
#[must_use]
pub fn split_filter_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(OPERATOR_SEPARATOR)
}

/// Convert a flat filter map into a condition tree.
///
/// ```rust,ignore
/// {"age:gte": 18, "name:contains": "mo", "posts": {"some": {"published": true}}}
/// // becomes
/// {"age": {"gte": 18}, "name": {"contains": "mo", "caseInsensitive": true},
///  "posts": {"some": {"published": true}}}
/// ```
///
/// Keys whose value is a plain object pass through untouched so native
/// relation filters keep working. Unknown operators degrade to equality.
#[must_use]
pub fn parse_filters(filters: &FilterMap) -> Map<String, Value> {
    let mut condition = Map::new();

    for (key, value) in filters {
        match split_filter_key(key) {
            Some((field, suffix)) if !value.is_object() => {
                let parsed = if let Some(operator) = FilterOperator::from_suffix(suffix) {
                    operator.condition(value.clone())
                } else {
                    tracing::trace!(key = %key, "Unknown filter operator, using equality");
                    value.clone()
                };
                merge_field(&mut condition, field, parsed);
            }
            _ => merge_field(&mut condition, key, value.clone()),
        }
    }

    condition
}

/// Merge every entry of `incoming` into `target`, field by field
pub fn merge_maps(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (field, value) in incoming {
        merge_field(target, &field, value);
    }
}

/// Add a condition for one field without dropping what is already there.
///
/// Two operator objects are merged key by key. A bare value meeting an
/// operator object becomes its `equals` entry. `AND` lists are
/// concatenated, and a second `OR`/`NOT` is pushed into `AND` so both stay
/// in conjunction.
pub fn merge_field(target: &mut Map<String, Value>, field: &str, incoming: Value) {
    match field {
        AND => append_conjunction(target, incoming),
        OR | NOT if target.contains_key(field) => {
            let mut clause = Map::new();
            clause.insert(field.to_owned(), incoming);
            append_conjunction(target, Value::Object(clause));
        }
        _ => match target.get_mut(field) {
            Some(existing) => merge_condition(existing, incoming),
            None => {
                target.insert(field.to_owned(), incoming);
            }
        },
    }
}

/// Merge a condition into an existing one for the same field
pub fn merge_condition(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(current), Value::Object(next)) => merge_maps(current, next),
        (Value::Object(current), scalar) => {
            current.insert(EQUALS.to_owned(), scalar);
        }
        (slot, Value::Object(mut next)) => {
            let previous = std::mem::take(slot);
            next.entry(EQUALS).or_insert(previous);
            *slot = Value::Object(next);
        }
        (slot, scalar) => *slot = scalar,
    }
}

fn append_conjunction(target: &mut Map<String, Value>, clause: Value) {
    let entry = target
        .entry(AND)
        .or_insert_with(|| Value::Array(Vec::new()));

    if !entry.is_array() {
        let previous = std::mem::take(entry);
        *entry = Value::Array(vec![previous]);
    }

    if let Value::Array(clauses) = entry {
        match clause {
            Value::Array(items) => clauses.extend(items),
            other => clauses.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filters(value: Value) -> FilterMap {
        match value {
            Value::Object(map) => map,
            other => panic!("test filters must be an object, got {other}"),
        }
    }

    #[test]
    fn test_operator_mapping_is_exhaustive() {
        let cases = vec![
            ("eq", json!(5), json!(5)),
            ("ne", json!(5), json!({"not": 5})),
            ("not", json!(5), json!({"not": 5})),
            ("gt", json!(5), json!({"gt": 5})),
            ("gte", json!(5), json!({"gte": 5})),
            ("lt", json!(5), json!({"lt": 5})),
            ("lte", json!(5), json!({"lte": 5})),
            ("contains", json!("mo"), json!({"contains": "mo", "caseInsensitive": true})),
            ("startsWith", json!("mo"), json!({"startsWith": "mo", "caseInsensitive": true})),
            ("starts", json!("mo"), json!({"startsWith": "mo", "caseInsensitive": true})),
            ("endsWith", json!("mo"), json!({"endsWith": "mo", "caseInsensitive": true})),
            ("ends", json!("mo"), json!({"endsWith": "mo", "caseInsensitive": true})),
            ("in", json!([1, 2]), json!({"in": [1, 2]})),
            ("notIn", json!([1, 2]), json!({"notIn": [1, 2]})),
        ];

        for (suffix, value, expected) in cases {
            let mut input = FilterMap::new();
            input.insert(format!("field:{suffix}"), value);
            let parsed = parse_filters(&input);
            assert_eq!(parsed.get("field"), Some(&expected), "operator {suffix}");
        }
    }

    #[test]
    fn test_in_coerces_scalar_to_sequence() {
        let parsed = parse_filters(&filters(json!({"id:in": 3, "id:notIn": "a"})));
        assert_eq!(parsed["id"], json!({"in": [3], "notIn": ["a"]}));
    }

    #[test]
    fn test_unknown_operator_falls_back_to_equality() {
        let parsed = parse_filters(&filters(json!({"age:between": 5})));
        assert_eq!(Value::Object(parsed), json!({"age": 5}));
    }

    #[test]
    fn test_bare_key_passes_through() {
        let parsed = parse_filters(&filters(json!({
            "status": "active",
            "posts": {"some": {"published": true}},
        })));
        assert_eq!(parsed["status"], json!("active"));
        assert_eq!(parsed["posts"], json!({"some": {"published": true}}));
    }

    #[test]
    fn test_suffixed_key_with_object_value_passes_through() {
        let parsed = parse_filters(&filters(json!({"posts:some": {"published": true}})));
        assert_eq!(parsed["posts:some"], json!({"published": true}));
        assert!(!parsed.contains_key("posts"));
    }

    #[test]
    fn test_array_value_is_not_treated_as_object() {
        let parsed = parse_filters(&filters(json!({"tags:in": ["a", "b"]})));
        assert_eq!(parsed["tags"], json!({"in": ["a", "b"]}));
    }

    #[test]
    fn test_split_on_first_separator_only() {
        assert_eq!(split_filter_key("meta:key:gte"), Some(("meta", "key:gte")));
        // "key:gte" is not an operator, so it degrades to equality on "meta"
        let parsed = parse_filters(&filters(json!({"meta:key:gte": 1})));
        assert_eq!(parsed["meta"], json!(1));
    }

    #[test]
    fn test_same_field_operators_are_merged() {
        let parsed = parse_filters(&filters(json!({"age:gte": 18, "age:lte": 65})));
        assert_eq!(parsed["age"], json!({"gte": 18, "lte": 65}));
    }

    #[test]
    fn test_equality_meeting_operator_becomes_equals() {
        let parsed = parse_filters(&filters(json!({"age": 30, "age:gt": 18})));
        assert_eq!(parsed["age"], json!({"equals": 30, "gt": 18}));
    }

    #[test]
    fn test_second_or_moves_into_and() {
        let mut target = Map::new();
        merge_field(&mut target, OR, json!([{"a": 1}]));
        merge_field(&mut target, OR, json!([{"b": 2}]));
        assert_eq!(target[OR], json!([{"a": 1}]));
        assert_eq!(target[AND], json!([{"OR": [{"b": 2}]}]));
    }

    #[test]
    fn test_and_lists_are_concatenated() {
        let mut target = Map::new();
        merge_field(&mut target, AND, json!([{"a": 1}]));
        merge_field(&mut target, AND, json!({"b": 2}));
        assert_eq!(target[AND], json!([{"a": 1}, {"b": 2}]));
    }

    #[test]
    fn test_null_meeting_operator_keeps_both() {
        let mut target = Map::new();
        merge_field(&mut target, "deletedAt", json!({"not": "x"}));
        merge_field(&mut target, "deletedAt", Value::Null);
        assert_eq!(target["deletedAt"], json!({"not": "x", "equals": null}));
    }
}
