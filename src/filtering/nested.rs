//! Nested select/include shorthand.
//!
//! `["id", "name", {"profile": ["id", "bio"]}]` becomes
//! `{"id": true, "name": true, "profile": {"select": {"id": true, "bio": true}}}`.

use serde::de::{self, Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Keys that mark a relation entry as an argument descriptor rather than a
/// nested field map.
const RELATION_ARG_KEYS: [&str; 6] = ["select", "include", "where", "orderBy", "skip", "take"];

/// Which tree is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    Select,
    Include,
}

impl FieldMode {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Include => "include",
        }
    }
}

/// One entry of a field list.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// A scalar field, selected as `true`
    Field(String),
    /// Relation names mapped to their nested shape
    Relations(BTreeMap<String, Relation>),
}

/// The nested shape requested for one relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// `true` / `false`, passed through
    Flag(bool),
    /// Nested field shorthand, built with the enclosing mode
    Nested(FieldSet),
    /// Full descriptor with its own select/include and query arguments
    Args(Box<RelationArgs>),
}

/// Relation descriptor: `{select?, include?, where?, orderBy?, skip?, take?}`.
///
/// `where`, `orderBy`, `skip` and `take` are opaque and copied verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationArgs {
    pub select: Option<FieldSet>,
    pub include: Option<FieldSet>,
    pub where_clause: Option<Value>,
    pub order_by: Option<Value>,
    pub skip: Option<Value>,
    pub take: Option<Value>,
}

/// A whole select/include request: an ordered list, or a map of relations.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSet {
    List(Vec<FieldSpec>),
    Map(BTreeMap<String, Relation>),
}

impl FieldSpec {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub fn relation(name: impl Into<String>, relation: impl Into<Relation>) -> Self {
        let mut relations = BTreeMap::new();
        relations.insert(name.into(), relation.into());
        Self::Relations(relations)
    }

    /// Parse one list entry
    ///
    /// # Errors
    ///
    /// Returns an error for anything but a string or an object.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::String(name) => Ok(Self::Field(name)),
            Value::Object(entries) => relations_from_map(entries).map(Self::Relations),
            other => Err(de::Error::custom(format!(
                "expected a field name or relation map, found {other}"
            ))),
        }
    }
}

impl Relation {
    /// Parse the value of one relation entry
    ///
    /// # Errors
    ///
    /// Returns an error when a nested list or descriptor is malformed.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Bool(flag) => Ok(Self::Flag(flag)),
            Value::Object(entries)
                if RELATION_ARG_KEYS.iter().any(|key| entries.contains_key(*key)) =>
            {
                RelationArgs::from_map(entries).map(|args| Self::Args(Box::new(args)))
            }
            other => FieldSet::from_value(other).map(Self::Nested),
        }
    }
}

impl RelationArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select(mut self, fields: impl Into<FieldSet>) -> Self {
        self.select = Some(fields.into());
        self
    }

    #[must_use]
    pub fn include(mut self, fields: impl Into<FieldSet>) -> Self {
        self.include = Some(fields.into());
        self
    }

    #[must_use]
    pub fn where_clause(mut self, condition: impl Into<Value>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<Value>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: impl Into<Value>) -> Self {
        self.skip = Some(skip.into());
        self
    }

    #[must_use]
    pub fn take(mut self, take: impl Into<Value>) -> Self {
        self.take = Some(take.into());
        self
    }

    fn from_map(mut entries: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut take_present = |key: &str| entries.remove(key).filter(|value| !value.is_null());
        let select = take_present("select");
        let include = take_present("include");
        let where_clause = take_present("where");
        let order_by = take_present("orderBy");
        let skip = take_present("skip");
        let take = take_present("take");

        Ok(Self {
            select: select.map(FieldSet::from_value).transpose()?,
            include: include.map(FieldSet::from_value).transpose()?,
            where_clause,
            order_by,
            skip,
            take,
        })
    }
}

impl FieldSet {
    /// Parse a select/include request
    ///
    /// A single string is read as a one-field list.
    ///
    /// # Errors
    ///
    /// Returns an error for values that are not a string, list or object.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::String(name) => Ok(Self::List(vec![FieldSpec::Field(name)])),
            Value::Array(items) => items
                .into_iter()
                .map(FieldSpec::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Object(entries) => relations_from_map(entries).map(Self::Map),
            other => Err(de::Error::custom(format!(
                "expected a field list or map, found {other}"
            ))),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(specs) => specs.is_empty(),
            Self::Map(relations) => relations.is_empty(),
        }
    }
}

// Null entries are dropped, as if the relation had not been named.
fn relations_from_map(
    entries: Map<String, Value>,
) -> Result<BTreeMap<String, Relation>, serde_json::Error> {
    entries
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| Relation::from_value(value).map(|relation| (name, relation)))
        .collect()
}

impl<'de> Deserialize<'de> for FieldSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        Self::Field(name.to_owned())
    }
}

impl From<String> for FieldSpec {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl From<bool> for Relation {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<FieldSet> for Relation {
    fn from(fields: FieldSet) -> Self {
        Self::Nested(fields)
    }
}

impl From<Vec<FieldSpec>> for Relation {
    fn from(fields: Vec<FieldSpec>) -> Self {
        Self::Nested(FieldSet::List(fields))
    }
}

impl From<RelationArgs> for Relation {
    fn from(args: RelationArgs) -> Self {
        Self::Args(Box::new(args))
    }
}

impl From<Vec<FieldSpec>> for FieldSet {
    fn from(specs: Vec<FieldSpec>) -> Self {
        Self::List(specs)
    }
}

impl<const N: usize> From<[&str; N]> for FieldSet {
    fn from(names: [&str; N]) -> Self {
        Self::List(names.into_iter().map(FieldSpec::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Relation {
    fn from(names: [&str; N]) -> Self {
        Self::Nested(FieldSet::from(names))
    }
}

/// Build a select or include tree.
///
/// Returns `None` when nothing was requested (absent or empty input), which
/// callers must keep apart from an empty tree.
#[must_use]
pub fn build_nested_fields(fields: Option<&FieldSet>, mode: FieldMode) -> Option<Map<String, Value>> {
    let fields = fields.filter(|fields| !fields.is_empty())?;
    let mut tree = Map::new();

    match fields {
        FieldSet::List(specs) => {
            for spec in specs {
                match spec {
                    FieldSpec::Field(name) => {
                        tree.insert(name.clone(), Value::Bool(true));
                    }
                    FieldSpec::Relations(relations) => add_relations(&mut tree, relations, mode),
                }
            }
        }
        FieldSet::Map(relations) => add_relations(&mut tree, relations, mode),
    }

    Some(tree)
}

fn add_relations(tree: &mut Map<String, Value>, relations: &BTreeMap<String, Relation>, mode: FieldMode) {
    for (name, relation) in relations {
        tree.insert(name.clone(), build_relation(relation, mode));
    }
}

fn build_relation(relation: &Relation, mode: FieldMode) -> Value {
    match relation {
        Relation::Flag(flag) => Value::Bool(*flag),
        Relation::Nested(fields) => {
            let mut nested = Map::new();
            if let Some(subtree) = build_nested_fields(Some(fields), mode) {
                nested.insert(mode.key().to_owned(), Value::Object(subtree));
            }
            Value::Object(nested)
        }
        Relation::Args(args) => {
            let mut nested = Map::new();
            if let Some(select) = build_nested_fields(args.select.as_ref(), FieldMode::Select) {
                nested.insert("select".to_owned(), Value::Object(select));
            }
            if let Some(include) = build_nested_fields(args.include.as_ref(), FieldMode::Include) {
                nested.insert("include".to_owned(), Value::Object(include));
            }
            let passthrough = [
                ("where", &args.where_clause),
                ("orderBy", &args.order_by),
                ("skip", &args.skip),
                ("take", &args.take),
            ];
            for (key, value) in passthrough {
                if let Some(value) = value {
                    nested.insert(key.to_owned(), value.clone());
                }
            }
            Value::Object(nested)
        }
    }
}
