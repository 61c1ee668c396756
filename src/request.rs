use serde_json::{Map, Value};

use crate::models::{NativeArgs, QueryOptions};

/// Keys that identify a shorthand request when sniffing
pub const SHORTHAND_KEYS: [&str; 5] = [
    "filters",
    "selectFields",
    "includeFields",
    "search",
    "pagination",
];

/// Keys that identify a native request when sniffing
pub const NATIVE_KEYS: [&str; 4] = ["where", "select", "include", "data"];

/// One call's input, in one of the three accepted shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Already in the delegate's native shape
    Native(NativeArgs),
    /// Shorthand options to be compiled
    Shorthand(QueryOptions),
    /// A bare condition (lookups) or payload (creates)
    Bare(Value),
}

impl Request {
    /// Classify a raw JSON value by the keys it carries.
    ///
    /// Any non-null shorthand key makes it shorthand; otherwise any non-null
    /// native key makes it native; anything else is bare. A record whose own
    /// fields are named like these keys will be misread.
    ///
    /// # Errors
    ///
    /// Returns an error when the value names shorthand or native keys but
    /// does not deserialize into that shape.
    pub fn sniff(value: Value) -> Result<Self, serde_json::Error> {
        let (shorthand, native) = match &value {
            Value::Object(entries) => (
                has_any(entries, &SHORTHAND_KEYS),
                has_any(entries, &NATIVE_KEYS),
            ),
            _ => (false, false),
        };

        if shorthand {
            serde_json::from_value(value).map(Self::Shorthand)
        } else if native {
            serde_json::from_value(value).map(Self::Native)
        } else {
            Ok(Self::Bare(value))
        }
    }

    #[must_use]
    pub fn bare(value: impl Into<Value>) -> Self {
        Self::Bare(value.into())
    }

    /// A request with no arguments at all
    #[must_use]
    pub fn empty() -> Self {
        Self::Native(NativeArgs::default())
    }
}

fn has_any(entries: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter()
        .any(|key| entries.get(*key).is_some_and(|value| !value.is_null()))
}

impl From<NativeArgs> for Request {
    fn from(args: NativeArgs) -> Self {
        Self::Native(args)
    }
}

impl From<QueryOptions> for Request {
    fn from(options: QueryOptions) -> Self {
        Self::Shorthand(options)
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shorthand_keys_win() {
        let request = Request::sniff(json!({"filters": {"age:gte": 18}, "where": {"id": 1}})).unwrap();
        assert!(matches!(request, Request::Shorthand(_)));
    }

    #[test]
    fn test_native_keys() {
        let request = Request::sniff(json!({"where": {"id": 1}, "take": 5})).unwrap();
        match request {
            Request::Native(args) => assert_eq!(args.take, Some(5)),
            other => panic!("expected native, got {other:?}"),
        }
    }

    #[test]
    fn test_backward_cursor_paging_is_native() {
        let raw = json!({"where": {"id": 1}, "cursor": {"id": 10}, "take": -5});
        match Request::sniff(raw.clone()).unwrap() {
            Request::Native(args) => {
                assert_eq!(args.take, Some(-5));
                assert_eq!(args.extra["cursor"], json!({"id": 10}));
                assert_eq!(args.to_value(), raw);
            }
            other => panic!("expected native, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_record_is_bare() {
        let request = Request::sniff(json!({"id": 1, "name": "a"})).unwrap();
        assert_eq!(request, Request::bare(json!({"id": 1, "name": "a"})));
        assert!(matches!(Request::sniff(json!(7)).unwrap(), Request::Bare(_)));
    }

    #[test]
    fn test_null_keys_do_not_count() {
        let request = Request::sniff(json!({"filters": null, "where": null, "id": 1})).unwrap();
        assert!(matches!(request, Request::Bare(_)));
    }

    #[test]
    fn test_malformed_shorthand_is_an_error() {
        assert!(Request::sniff(json!({"pagination": "first page"})).is_err());
        assert!(Request::sniff(json!({"where": 5})).is_err());
        assert!(Request::sniff(json!({"filters": {}, "orderBy": {"name": "up"}})).is_err());
    }
}
