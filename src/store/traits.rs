use anyhow::{Context, Result};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::model::{
    Collection, Conformity, ConformityEdit, ConformityQuery, DocumentFilter, Field, Id,
    NewConformity,
};

/// Query primitives over schemaless documents keyed by `_id`
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection matching `filter`, in insertion order
    async fn find(&self, collection: Collection, filter: &DocumentFilter) -> Result<Vec<Value>>;
    /// First matching document, if any
    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Value>>;
    /// Insert or replace a document, generating `_id` when it is missing.
    /// Returns the document id.
    async fn upsert_document(&self, collection: Collection, document: Value) -> Result<Id>;
    async fn delete_document(&self, collection: Collection, id: &Id) -> Result<bool>;

    /// Polymorphic getter used by lookups that have no dedicated resolver.
    /// Caching stores override this.
    async fn get_document(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Value>> {
        self.find_one(collection, filter).await
    }
}

/// Typed wrappers over `DocumentStore`
#[async_trait::async_trait]
pub trait DocumentStoreExt: DocumentStore {
    async fn find_as<T: DeserializeOwned + Send + 'static>(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Vec<T>> {
        self.find(collection, filter)
            .await?
            .into_iter()
            .map(|doc| {
                serde_json::from_value(doc)
                    .with_context(|| format!("Failed to decode document from '{}'", collection))
            })
            .collect()
    }

    async fn find_one_as<T: DeserializeOwned + Send + 'static>(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<T>> {
        decode_optional(collection, self.find_one(collection, filter).await?)
    }

    async fn get_document_as<T: DeserializeOwned + Send + 'static>(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<T>> {
        decode_optional(collection, self.get_document(collection, filter).await?)
    }

    async fn upsert_as<T: Serialize + Sync>(&self, collection: Collection, document: &T) -> Result<Id> {
        let value = serde_json::to_value(document)
            .with_context(|| format!("Failed to encode document for '{}'", collection))?;
        self.upsert_document(collection, value).await
    }
}

impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

fn decode_optional<T: DeserializeOwned>(collection: Collection, doc: Option<Value>) -> Result<Option<T>> {
    doc.map(|doc| {
        serde_json::from_value(doc)
            .with_context(|| format!("Failed to decode document from '{}'", collection))
    })
    .transpose()
}

/// Typed associations between entities of possibly different kinds
#[async_trait::async_trait]
pub trait ConformityStore: Send + Sync {
    /// Ids related to the main entity through edges of the requested types,
    /// in edge creation order. Edges match in either direction.
    async fn saved_conformity(&self, query: &ConformityQuery) -> Result<Vec<Id>>;
    async fn add_conformity(&self, edge: NewConformity) -> Result<Conformity>;
    /// Replace every `rel_type` edge of the main entity
    async fn edit_conformity(&self, edit: &ConformityEdit) -> Result<()>;
    /// Drop every edge touching the entity; returns how many were removed
    async fn remove_conformities(&self, entity_type: &str, entity_id: &Id) -> Result<usize>;
}

/// Form fields and system properties, stored in the `fields` collection
#[async_trait::async_trait]
pub trait FieldStore: Send + Sync {
    /// Fields of one form ordered by `order` (unordered fields last)
    async fn list_form_fields(&self, form_id: &Id) -> Result<Vec<Field>>;
    /// System properties a custom field of this content type may bind to
    async fn list_system_properties(&self, content_type: &str) -> Result<Vec<Field>>;
    async fn get_field(&self, id: &Id) -> Result<Option<Field>>;
    async fn upsert_field(&self, field: Field) -> Result<Field>;
    async fn delete_field(&self, id: &Id) -> Result<bool>;
}

#[async_trait::async_trait]
impl<T: DocumentStore> FieldStore for T {
    async fn list_form_fields(&self, form_id: &Id) -> Result<Vec<Field>> {
        let fields: Vec<Field> = self
            .find_as(
                Collection::Fields,
                &DocumentFilter::eq("contentTypeId", form_id.as_str()),
            )
            .await?;

        Ok(fields
            .into_iter()
            .sorted_by_key(|f| (f.order.is_none(), f.order))
            .collect())
    }

    async fn list_system_properties(&self, content_type: &str) -> Result<Vec<Field>> {
        let fields: Vec<Field> = self
            .find_as(Collection::Fields, &DocumentFilter::eq("contentType", content_type))
            .await?;

        Ok(fields.into_iter().filter(|f| f.is_defined_by_system).collect())
    }

    async fn get_field(&self, id: &Id) -> Result<Option<Field>> {
        self.find_one_as(Collection::Fields, &DocumentFilter::id(id.as_str()))
            .await
    }

    async fn upsert_field(&self, mut field: Field) -> Result<Field> {
        let id = self.upsert_as(Collection::Fields, &field).await?;
        field.id = id;
        Ok(field)
    }

    async fn delete_field(&self, id: &Id) -> Result<bool> {
        self.delete_document(Collection::Fields, id).await
    }
}

pub trait Store: DocumentStore + ConformityStore + FieldStore + Send + Sync {}

impl<T: DocumentStore + ConformityStore> Store for T {}
