use anyhow::{anyhow, Result};
use itertools::Itertools;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

use crate::model::{
    document_id, generate_id, Collection, Conformity, ConformityEdit, ConformityQuery,
    DocumentFilter, Id, NewConformity,
};
use crate::store::traits::{ConformityStore, DocumentStore};

/// In-process store for tests, demos and running without PostgreSQL
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<Collection, Vec<Value>>>,
    conformities: RwLock<Vec<Conformity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self, collection: Collection) -> usize {
        self.documents
            .read()
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Ensures the document carries a string `_id` and returns it
pub(crate) fn ensure_document_id(document: &mut Value) -> Result<Id> {
    let object = document
        .as_object_mut()
        .ok_or_else(|| anyhow!("Documents must be JSON objects"))?;

    match object.get("_id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            let id = generate_id();
            object.insert("_id".to_string(), Value::String(id.clone()));
            Ok(id)
        }
        Some(other) => Err(anyhow!("Document _id must be a string, got {}", other)),
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, filter: &DocumentFilter) -> Result<Vec<Value>> {
        let documents = self.documents.read();
        Ok(documents
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Value>> {
        let documents = self.documents.read();
        Ok(documents
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn upsert_document(&self, collection: Collection, mut document: Value) -> Result<Id> {
        let id = ensure_document_id(&mut document)?;

        let mut documents = self.documents.write();
        let docs = documents.entry(collection).or_default();
        match docs.iter_mut().find(|d| document_id(d) == Some(id.as_str())) {
            Some(existing) => *existing = document,
            None => docs.push(document),
        }

        Ok(id)
    }

    async fn delete_document(&self, collection: Collection, id: &Id) -> Result<bool> {
        let mut documents = self.documents.write();
        let Some(docs) = documents.get_mut(&collection) else {
            return Ok(false);
        };

        let before = docs.len();
        docs.retain(|d| document_id(d) != Some(id.as_str()));
        Ok(docs.len() < before)
    }
}

#[async_trait::async_trait]
impl ConformityStore for MemoryStore {
    async fn saved_conformity(&self, query: &ConformityQuery) -> Result<Vec<Id>> {
        let conformities = self.conformities.read();
        Ok(conformities
            .iter()
            .filter_map(|edge| edge.related_id(query).cloned())
            .unique()
            .collect())
    }

    async fn add_conformity(&self, edge: NewConformity) -> Result<Conformity> {
        let conformity = Conformity::new(edge);
        self.conformities.write().push(conformity.clone());
        Ok(conformity)
    }

    async fn edit_conformity(&self, edit: &ConformityEdit) -> Result<()> {
        let query = ConformityQuery {
            main_type: edit.main_type.clone(),
            main_type_id: edit.main_type_id.clone(),
            rel_types: vec![edit.rel_type.clone()],
        };

        let mut conformities = self.conformities.write();
        conformities.retain(|edge| edge.related_id(&query).is_none());
        for rel_type_id in edit.rel_type_ids.iter().unique() {
            conformities.push(Conformity::new(NewConformity {
                main_type: edit.main_type.clone(),
                main_type_id: edit.main_type_id.clone(),
                rel_type: edit.rel_type.clone(),
                rel_type_id: rel_type_id.clone(),
            }));
        }

        Ok(())
    }

    async fn remove_conformities(&self, entity_type: &str, entity_id: &Id) -> Result<usize> {
        let mut conformities = self.conformities.write();
        let before = conformities.len();
        conformities.retain(|edge| {
            !((edge.main_type == entity_type && &edge.main_type_id == entity_id)
                || (edge.rel_type == entity_type && &edge.rel_type_id == entity_id))
        });
        Ok(before - conformities.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, FieldType};
    use crate::store::traits::FieldStore;
    use serde_json::json;

    fn edge(main_type: &str, main_id: &str, rel_type: &str, rel_id: &str) -> NewConformity {
        NewConformity {
            main_type: main_type.to_string(),
            main_type_id: main_id.to_string(),
            rel_type: rel_type.to_string(),
            rel_type_id: rel_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let store = MemoryStore::new();
        store
            .upsert_document(Collection::Tags, json!({"_id": "t1", "name": "vip", "type": "company"}))
            .await
            .unwrap();
        store
            .upsert_document(Collection::Tags, json!({"_id": "t2", "name": "new", "type": "company"}))
            .await
            .unwrap();
        store
            .upsert_document(Collection::Tags, json!({"_id": "t1", "name": "gold", "type": "company"}))
            .await
            .unwrap();

        let tags = store.find(Collection::Tags, &DocumentFilter::All).await.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0]["name"], "gold");
        assert_eq!(tags[1]["_id"], "t2");
    }

    #[tokio::test]
    async fn test_upsert_generates_missing_id() {
        let store = MemoryStore::new();
        let id = store
            .upsert_document(Collection::Brands, json!({"name": "Acme"}))
            .await
            .unwrap();

        let doc = store
            .find_one(Collection::Brands, &DocumentFilter::id(id.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["_id"], json!(id));

        assert!(store
            .upsert_document(Collection::Brands, json!(["not", "an", "object"]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_delete_document() {
        let store = MemoryStore::new();
        store
            .upsert_document(Collection::Users, json!({"_id": "u1"}))
            .await
            .unwrap();

        assert!(store.delete_document(Collection::Users, &"u1".to_string()).await.unwrap());
        assert!(!store.delete_document(Collection::Users, &"u1".to_string()).await.unwrap());
        assert_eq!(store.document_count(Collection::Users), 0);
    }

    #[tokio::test]
    async fn test_saved_conformity_both_directions_in_order() {
        let store = MemoryStore::new();
        store.add_conformity(edge("company", "c1", "customer", "u1")).await.unwrap();
        store.add_conformity(edge("customer", "u2", "company", "c1")).await.unwrap();
        store.add_conformity(edge("company", "c1", "deal", "d1")).await.unwrap();
        store.add_conformity(edge("company", "c1", "customer", "u1")).await.unwrap();

        let ids = store
            .saved_conformity(&ConformityQuery::new("company", &"c1".to_string(), &["customer"]))
            .await
            .unwrap();
        assert_eq!(ids, vec!["u1", "u2"]);

        let ids = store
            .saved_conformity(&ConformityQuery::new("customer", &"u2".to_string(), &["company"]))
            .await
            .unwrap();
        assert_eq!(ids, vec!["c1"]);
    }

    #[tokio::test]
    async fn test_edit_conformity_replaces_one_rel_type() {
        let store = MemoryStore::new();
        store.add_conformity(edge("company", "c1", "customer", "u1")).await.unwrap();
        store.add_conformity(edge("customer", "u2", "company", "c1")).await.unwrap();
        store.add_conformity(edge("company", "c1", "deal", "d1")).await.unwrap();

        store
            .edit_conformity(&ConformityEdit {
                main_type: "company".to_string(),
                main_type_id: "c1".to_string(),
                rel_type: "customer".to_string(),
                rel_type_ids: vec!["u3".to_string()],
            })
            .await
            .unwrap();

        let c1 = "c1".to_string();
        let customers = store
            .saved_conformity(&ConformityQuery::new("company", &c1, &["customer"]))
            .await
            .unwrap();
        let deals = store
            .saved_conformity(&ConformityQuery::new("company", &c1, &["deal"]))
            .await
            .unwrap();
        assert_eq!(customers, vec!["u3"]);
        assert_eq!(deals, vec!["d1"]);

        assert_eq!(store.remove_conformities("company", &c1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_field_store_orders_form_fields() {
        let store = MemoryStore::new();
        for (id, order) in [("f1", Some(2)), ("f2", None), ("f3", Some(1))] {
            let mut field = Field::new(FieldType::Input);
            field.id = id.to_string();
            field.content_type_id = Some("form-1".to_string());
            field.order = order;
            store.upsert_field(field).await.unwrap();
        }

        let mut property = Field::new(FieldType::Input);
        property.content_type = "customer".to_string();
        property.is_defined_by_system = true;
        let property = store.upsert_field(property).await.unwrap();
        assert!(!property.id.is_empty());

        let ids: Vec<_> = store
            .list_form_fields(&"form-1".to_string())
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec!["f3", "f1", "f2"]);

        let properties = store.list_system_properties("customer").await.unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].id, property.id);
    }
}
