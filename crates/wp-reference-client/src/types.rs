use std::{collections::BTreeMap, fmt, marker::PhantomData};

use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use time::OffsetDateTime;

/// Persisted wrapper around every cached payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: OffsetDateTime,
}

/// Kind of a search result row, read from the bold label of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Function,
    Hook,
    Class,
    Method,
}

impl ResultKind {
    /// Maps a normalized listing label (`function`, `filter`, `action`, ...).
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "class" => Self::Class,
            "method" => Self::Method,
            "hook" | "action" | "filter" => Self::Hook,
            _ => Self::Function,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Hook => "Hook",
            Self::Class => "Class",
            Self::Method => "Method",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    pub link: String,
    pub source_file: String,
    pub source_line: u32,
    pub description: String,
}

/// Search results keyed by a dense, 1-based row number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Listing(BTreeMap<u32, SearchResultItem>);

impl Listing {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item under the next free row number and returns it.
    pub fn push(&mut self, item: SearchResultItem) -> u32 {
        let index = self.next_index();
        self.0.insert(index, item);
        index
    }

    pub fn extend<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = SearchResultItem>,
    {
        for item in items {
            self.push(item);
        }
    }

    #[must_use]
    pub fn get(&self, index: u32) -> Option<&SearchResultItem> {
        self.0.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &SearchResultItem)> {
        self.0.iter().map(|(index, item)| (*index, item))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn next_index(&self) -> u32 {
        self.0.keys().next_back().map_or(1, |last| last + 1)
    }
}

impl FromIterator<SearchResultItem> for Listing {
    fn from_iter<I: IntoIterator<Item = SearchResultItem>>(iter: I) -> Self {
        let mut listing = Self::new();
        listing.extend(iter);
        listing
    }
}

/// Insertion-ordered string-keyed map, serialized as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `key`, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if let Some(slot) = self.0.iter_mut().find(|(existing, _)| *existing == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map with string keys")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Reference type of a single document, derived from its URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Function,
    Class,
    Method,
    Hooks,
}

impl DocumentKind {
    /// `/hooks/` is a hook, `/classes/<name>` a class, anything deeper under
    /// `/classes/` a method, and every other path a function.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let lowered = url.to_ascii_lowercase();
        if lowered.contains("/hooks/") {
            return Self::Hooks;
        }
        if let Some((_, rest)) = lowered.split_once("/classes/") {
            let segments = rest.split('/').filter(|segment| !segment.is_empty()).count();
            return if segments == 1 { Self::Class } else { Self::Method };
        }
        Self::Function
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Class => "Class",
            Self::Method => "Method",
            Self::Hooks => "Hooks",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    Required,
    #[default]
    Optional,
}

impl Requirement {
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("required") {
            Self::Required
        } else {
            Self::Optional
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Required => "Required",
            Self::Optional => "Optional",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedParameter {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

fn default_parameter_type() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type", default = "default_parameter_type")]
    pub kind: String,
    #[serde(default)]
    pub required: Requirement,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub nested: OrderedMap<NestedParameter>,
}

impl Default for ParameterSpec {
    fn default() -> Self {
        Self {
            kind: default_parameter_type(),
            required: Requirement::default(),
            description: String::new(),
            nested: OrderedMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changelog {
    pub columns: Vec<String>,
    pub rows: Vec<OrderedMap<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub page_url: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub structure: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<OrderedMap<ParameterSpec>>,
    #[serde(rename = "return", default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<ReturnSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<Changelog>,
}

/// Either shape a reference lookup can produce.
///
/// Serialized without a tag; a payload carrying a `structure` field is a
/// [`Document`], anything else is a [`Listing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferencePage {
    Listing(Listing),
    Document(Box<Document>),
}

impl ReferencePage {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Listing(listing) => listing.is_empty(),
            Self::Document(_) => false,
        }
    }
}

impl From<Listing> for ReferencePage {
    fn from(listing: Listing) -> Self {
        Self::Listing(listing)
    }
}

impl From<Document> for ReferencePage {
    fn from(document: Document) -> Self {
        Self::Document(Box::new(document))
    }
}

impl Serialize for ReferencePage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Listing(listing) => listing.serialize(serializer),
            Self::Document(document) => document.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ReferencePage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("structure").is_some() {
            serde_json::from_value::<Document>(value)
                .map(Self::from)
                .map_err(de::Error::custom)
        } else {
            serde_json::from_value::<Listing>(value)
                .map(Self::Listing)
                .map_err(de::Error::custom)
        }
    }
}
