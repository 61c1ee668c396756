use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse `asc` or `desc` in any case; other strings are not a direction
    #[must_use]
    pub fn parse(order: &str) -> Option<Self> {
        if order.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if order.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl Serialize for SortOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let order = String::deserialize(deserializer)?;
        Self::parse(&order).ok_or_else(|| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Str(&order), &"\"asc\" or \"desc\"")
        })
    }
}

/// Ordered `field -> direction` entries.
///
/// Entry order is the sort precedence, so it is kept exactly as given, both
/// when reading a JSON object and when reading a list of single-key objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBy(Vec<(String, SortOrder)>);

impl OrderBy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&mut self, field: impl Into<String>, order: SortOrder) {
        self.0.push((field.into(), order));
    }

    #[must_use]
    pub fn then(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.push(field, order);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortOrder)> {
        self.0.iter().map(|(field, order)| (field.as_str(), *order))
    }

    /// Native form of the ordering.
    ///
    /// A single entry is an object; several entries become a list of
    /// single-key objects so their precedence survives key-sorted maps.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut entries: Vec<Value> = self
            .0
            .iter()
            .map(|(field, order)| {
                let mut entry = Map::new();
                entry.insert(field.clone(), Value::String(order.as_str().to_owned()));
                Value::Object(entry)
            })
            .collect();

        if entries.len() == 1 {
            entries.remove(0)
        } else {
            Value::Array(entries)
        }
    }
}

impl<K: Into<String>> FromIterator<(K, SortOrder)> for OrderBy {
    fn from_iter<I: IntoIterator<Item = (K, SortOrder)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(field, order)| (field.into(), order)).collect())
    }
}

impl Serialize for OrderBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, order) in &self.0 {
            map.serialize_entry(field, order)?;
        }
        map.end()
    }
}

struct OrderByVisitor;

impl<'de> Visitor<'de> for OrderByVisitor {
    type Value = OrderBy;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of field to \"asc\"/\"desc\", or a list of such maps")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::new();
        while let Some((field, order)) = access.next_entry::<String, SortOrder>()? {
            entries.push((field, order));
        }
        Ok(OrderBy(entries))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::new();
        while let Some(item) = access.next_element::<BTreeMap<String, SortOrder>>()? {
            entries.extend(item);
        }
        Ok(OrderBy(entries))
    }
}

impl<'de> Deserialize<'de> for OrderBy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OrderByVisitor)
    }
}

/// Read `(field, direction)` pairs back out of a native `orderBy` value.
///
/// Entries whose direction is not a plain `asc`/`desc` string (for example
/// native `{sort, nulls}` objects) are left out.
#[must_use]
pub fn order_entries(order_by: &Value) -> Vec<(String, SortOrder)> {
    match order_by {
        Value::Object(entries) => entries
            .iter()
            .filter_map(|(field, order)| {
                order
                    .as_str()
                    .and_then(SortOrder::parse)
                    .map(|order| (field.clone(), order))
            })
            .collect(),
        Value::Array(items) => items.iter().flat_map(order_entries).collect(),
        _ => Vec::new(),
    }
}
