use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::model::{Collection, Conformity, ConformityEdit, ConformityQuery, DocumentFilter, Id, NewConformity};
use crate::store::traits::{ConformityStore, DocumentStore};

#[derive(Clone, Debug)]
struct CacheEntry {
    document: Value,
    cached_at: Instant,
}

type CacheKey = (Collection, String);

/// In-memory cache for `get_document` lookups with TTL
#[derive(Debug)]
pub struct DocumentCache {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    ttl: Duration,
}

impl DocumentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    fn key(collection: Collection, filter: &DocumentFilter) -> CacheKey {
        (collection, filter.to_json().to_string())
    }

    /// Cached document if present and not expired
    pub async fn get(&self, collection: Collection, filter: &DocumentFilter) -> Option<Value> {
        let key = Self::key(collection, filter);
        let mut entries = self.entries.write().await;

        match entries.get(&key) {
            Some(entry) if entry.cached_at.elapsed() > self.ttl => {
                entries.remove(&key);
                None
            }
            Some(entry) => Some(entry.document.clone()),
            None => None,
        }
    }

    pub async fn put(&self, collection: Collection, filter: &DocumentFilter, document: Value) {
        let mut entries = self.entries.write().await;
        entries.insert(
            Self::key(collection, filter),
            CacheEntry {
                document,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop every cached lookup of a collection
    pub async fn invalidate_collection(&self, collection: Collection) {
        let mut entries = self.entries.write().await;
        entries.retain(|(cached, _), _| *cached != collection);
    }

    /// Drop expired entries, returning how many were removed
    pub async fn clear_expired(&self) -> usize {
        retain_fresh(&mut *self.entries.write().await, self.ttl)
    }

    /// Sweep expired entries every `every` until the returned task is aborted.
    /// Keeps entries that are never read again from piling up.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let entries = self.entries.clone();
        let ttl = self.ttl;
        let every = every.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = retain_fresh(&mut *entries.write().await, ttl);
                if removed > 0 {
                    log::debug!("Document cache swept {} expired entries", removed);
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn retain_fresh(entries: &mut HashMap<CacheKey, CacheEntry>, ttl: Duration) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.cached_at.elapsed() <= ttl);
    before - entries.len()
}

/// Wraps a store so that `get_document` is served from a `DocumentCache`.
/// Writes through the wrapper invalidate the written collection.
#[derive(Debug)]
pub struct CachedStore<S> {
    inner: S,
    cache: DocumentCache,
}

impl<S> CachedStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: DocumentCache::new(ttl),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }
}

#[async_trait::async_trait]
impl<S: DocumentStore> DocumentStore for CachedStore<S> {
    async fn find(&self, collection: Collection, filter: &DocumentFilter) -> Result<Vec<Value>> {
        self.inner.find(collection, filter).await
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Value>> {
        self.inner.find_one(collection, filter).await
    }

    async fn upsert_document(&self, collection: Collection, document: Value) -> Result<Id> {
        let id = self.inner.upsert_document(collection, document).await?;
        self.cache.invalidate_collection(collection).await;
        Ok(id)
    }

    async fn delete_document(&self, collection: Collection, id: &Id) -> Result<bool> {
        let deleted = self.inner.delete_document(collection, id).await?;
        self.cache.invalidate_collection(collection).await;
        Ok(deleted)
    }

    async fn get_document(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Value>> {
        if let Some(document) = self.cache.get(collection, filter).await {
            log::debug!("Document cache hit: {} {}", collection, filter.to_json());
            return Ok(Some(document));
        }

        let document = self.inner.get_document(collection, filter).await?;
        if let Some(ref document) = document {
            self.cache.put(collection, filter, document.clone()).await;
        }
        Ok(document)
    }
}

#[async_trait::async_trait]
impl<S: ConformityStore> ConformityStore for CachedStore<S> {
    async fn saved_conformity(&self, query: &ConformityQuery) -> Result<Vec<Id>> {
        self.inner.saved_conformity(query).await
    }

    async fn add_conformity(&self, edge: NewConformity) -> Result<Conformity> {
        self.inner.add_conformity(edge).await
    }

    async fn edit_conformity(&self, edit: &ConformityEdit) -> Result<()> {
        self.inner.edit_conformity(edit).await
    }

    async fn remove_conformities(&self, entity_type: &str, entity_id: &Id) -> Result<usize> {
        self.inner.remove_conformities(entity_type, entity_id).await
    }
}
