use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{default_timestamp, generate_id, Id};

/// A stored edge between two entities, e.g. company "c1" and customer "u7".
/// Edges are undirected for lookups: either end may be the main entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conformity {
    #[serde(rename = "_id")]
    pub id: Id,
    pub main_type: String,
    pub main_type_id: Id,
    pub rel_type: String,
    pub rel_type_id: Id,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Conformity {
    pub fn new(edge: NewConformity) -> Self {
        Self {
            id: generate_id(),
            main_type: edge.main_type,
            main_type_id: edge.main_type_id,
            rel_type: edge.rel_type,
            rel_type_id: edge.rel_type_id,
            created_at: Utc::now(),
        }
    }

    /// Id of the entity on the other end, if this edge touches
    /// `main_type/main_type_id` and its other end is one of `rel_types`.
    pub fn related_id(&self, query: &ConformityQuery) -> Option<&Id> {
        if self.main_type == query.main_type
            && self.main_type_id == query.main_type_id
            && query.rel_types.contains(&self.rel_type)
        {
            return Some(&self.rel_type_id);
        }
        if self.rel_type == query.main_type
            && self.rel_type_id == query.main_type_id
            && query.rel_types.contains(&self.main_type)
        {
            return Some(&self.main_type_id);
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConformity {
    pub main_type: String,
    pub main_type_id: Id,
    pub rel_type: String,
    pub rel_type_id: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformityQuery {
    pub main_type: String,
    pub main_type_id: Id,
    pub rel_types: Vec<String>,
}

impl ConformityQuery {
    pub fn new(main_type: &str, main_type_id: &Id, rel_types: &[&str]) -> Self {
        Self {
            main_type: main_type.to_string(),
            main_type_id: main_type_id.clone(),
            rel_types: rel_types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Replaces every `rel_type` edge of the main entity with `rel_type_ids`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformityEdit {
    pub main_type: String,
    pub main_type_id: Id,
    pub rel_type: String,
    pub rel_type_ids: Vec<Id>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(main_type: &str, main_id: &str, rel_type: &str, rel_id: &str) -> Conformity {
        Conformity::new(NewConformity {
            main_type: main_type.to_string(),
            main_type_id: main_id.to_string(),
            rel_type: rel_type.to_string(),
            rel_type_id: rel_id.to_string(),
        })
    }

    #[test]
    fn test_related_id_matches_both_directions() {
        let query = ConformityQuery::new("company", &"c1".to_string(), &["customer"]);

        let forward = edge("company", "c1", "customer", "u1");
        let backward = edge("customer", "u2", "company", "c1");
        let other_type = edge("company", "c1", "deal", "d1");
        let other_company = edge("company", "c2", "customer", "u3");

        assert_eq!(forward.related_id(&query), Some(&"u1".to_string()));
        assert_eq!(backward.related_id(&query), Some(&"u2".to_string()));
        assert_eq!(other_type.related_id(&query), None);
        assert_eq!(other_company.related_id(&query), None);
    }
}
