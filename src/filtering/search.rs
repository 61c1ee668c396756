use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::conditions::FilterOperator;

/// Escape LIKE wildcards so a term only matches itself.
/// Backslash is escaped first; pair with `ESCAPE '\'`.
#[must_use]
pub fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Free-text search over a list of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub term: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl SearchSpec {
    #[must_use]
    pub fn new<I, S>(term: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            term: term.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// A search only applies when both the term and the field list are non-empty
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.term.is_empty() && !self.fields.is_empty()
    }
}

/// Build the disjunction of per-field `contains` conditions.
///
/// ```rust,ignore
/// {"term": "mo", "fields": ["name", "bio"]}
/// // becomes
/// [{"name": {"contains": "mo", "caseInsensitive": true}},
///  {"bio": {"contains": "mo", "caseInsensitive": true}}]
/// ```
#[must_use]
pub fn build_search_condition(search: &SearchSpec) -> Option<Value> {
    if !search.is_active() {
        return None;
    }

    let clauses = search
        .fields
        .iter()
        .map(|field| {
            let mut clause = Map::new();
            clause.insert(
                field.clone(),
                FilterOperator::Contains.condition(Value::String(search.term.clone())),
            );
            Value::Object(clause)
        })
        .collect();

    Some(Value::Array(clauses))
}
