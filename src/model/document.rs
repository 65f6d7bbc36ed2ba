use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

use crate::model::Id;

/// Document collections known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Companies,
    Customers,
    Tags,
    Users,
    Brands,
    Fields,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Companies,
        Collection::Customers,
        Collection::Tags,
        Collection::Users,
        Collection::Brands,
        Collection::Fields,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Companies => "companies",
            Collection::Customers => "customers",
            Collection::Tags => "tags",
            Collection::Users => "users",
            Collection::Brands => "brands",
            Collection::Fields => "fields",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown collection: {}", s))
    }
}

/// Query filter in the store's Mongo-style shape:
/// `{_id: {$in: [...]}}`, `{_id: id}`, `{key: value}` or `{}`.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentFilter {
    IdIn(Vec<Id>),
    Id(Id),
    FieldEq(String, Value),
    All,
}

impl DocumentFilter {
    pub fn ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Id>,
    {
        DocumentFilter::IdIn(ids.into_iter().map(Into::into).collect())
    }

    pub fn id(id: impl Into<Id>) -> Self {
        DocumentFilter::Id(id.into())
    }

    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        DocumentFilter::FieldEq(key.into(), value.into())
    }

    /// Whether a stored document satisfies this filter
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            DocumentFilter::All => true,
            DocumentFilter::Id(id) => document_id(document) == Some(id.as_str()),
            DocumentFilter::IdIn(ids) => document_id(document)
                .map(|doc_id| ids.iter().any(|id| id == doc_id))
                .unwrap_or(false),
            DocumentFilter::FieldEq(key, expected) => match document.get(key) {
                Some(Value::Array(values)) if !expected.is_array() => values.contains(expected),
                Some(actual) => actual == expected,
                None => expected.is_null(),
            },
        }
    }

    /// JSON form of the filter, as logged and as used for cache keys
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}

impl Serialize for DocumentFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DocumentFilter::All => serializer.serialize_map(Some(0))?.end(),
            DocumentFilter::Id(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("_id", id)?;
                map.end()
            }
            DocumentFilter::IdIn(ids) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("_id", &json!({ "$in": ids }))?;
                map.end()
            }
            DocumentFilter::FieldEq(key, value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(key, value)?;
                map.end()
            }
        }
    }
}

/// `_id` of a stored document
pub fn document_id(document: &Value) -> Option<&str> {
    document.get("_id").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_serialize_in_store_shape() {
        assert_eq!(
            DocumentFilter::ids(["a", "b"]).to_json(),
            json!({"_id": {"$in": ["a", "b"]}})
        );
        assert_eq!(DocumentFilter::id("a").to_json(), json!({"_id": "a"}));
        assert_eq!(
            DocumentFilter::eq("contentTypeId", "form-1").to_json(),
            json!({"contentTypeId": "form-1"})
        );
        assert_eq!(DocumentFilter::All.to_json(), json!({}));
    }

    #[test]
    fn test_filter_matching() {
        let doc = json!({"_id": "c1", "state": "lead", "tagIds": ["t1", "t2"]});

        assert!(DocumentFilter::id("c1").matches(&doc));
        assert!(!DocumentFilter::id("c2").matches(&doc));
        assert!(DocumentFilter::ids(["c0", "c1"]).matches(&doc));
        assert!(!DocumentFilter::ids(Vec::<Id>::new()).matches(&doc));
        assert!(DocumentFilter::eq("state", "lead").matches(&doc));
        assert!(DocumentFilter::eq("tagIds", "t2").matches(&doc));
        assert!(!DocumentFilter::eq("tagIds", "t3").matches(&doc));
        assert!(DocumentFilter::eq("ownerId", Value::Null).matches(&doc));
    }

    #[test]
    fn test_collection_parsing() {
        assert_eq!("users".parse::<Collection>(), Ok(Collection::Users));
        assert!("widgets".parse::<Collection>().is_err());
    }
}
