use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::model::{Brand, Collection, DocumentFilter, LeadStatus, QueryParams, Tag};
use crate::store::traits::{DocumentStore, DocumentStoreExt};

/// Callback a filter invokes after it changed the query parameters
pub type Refetch = Arc<dyn Fn() + Send + Sync>;

/// Query parameters shared by every widget of one sidebar
pub type SharedParams = Arc<RwLock<QueryParams>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSection {
    pub key: &'static str,
    pub title: &'static str,
    pub options: Vec<FilterOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarView {
    pub query_params: QueryParams,
    pub sections: Vec<FilterSection>,
}

/// One independent filter widget. Widgets only share the parameter bag and
/// the refetch callback they were built with.
#[async_trait::async_trait]
pub trait SidebarFilter: Send + Sync {
    /// Query parameter this widget controls
    fn key(&self) -> &'static str;
    fn title(&self) -> &'static str;
    fn params(&self) -> &SharedParams;
    fn refetch(&self) -> Option<&Refetch>;

    /// (value, label) pairs the widget offers
    async fn choices(&self, store: &dyn DocumentStore) -> Result<Vec<(String, String)>>;

    async fn render(&self, store: &dyn DocumentStore) -> Result<FilterSection> {
        let choices = self.choices(store).await?;
        let active = self.params().read().get(self.key()).map(str::to_string);

        Ok(FilterSection {
            key: self.key(),
            title: self.title(),
            options: choices
                .into_iter()
                .map(|(value, label)| FilterOption {
                    active: active.as_deref() == Some(value.as_str()),
                    value,
                    label,
                })
                .collect(),
        })
    }

    /// Toggle this widget's parameter and ask the owner to reload
    fn select(&self, value: &str) {
        self.params().write().toggle(self.key(), value);
        log::debug!("Sidebar filter '{}' set to '{}'", self.key(), value);
        if let Some(refetch) = self.refetch() {
            (**refetch)();
        }
    }
}

pub struct TagFilter {
    params: SharedParams,
    refetch: Option<Refetch>,
}

#[async_trait::async_trait]
impl SidebarFilter for TagFilter {
    fn key(&self) -> &'static str {
        QueryParams::TAG
    }

    fn title(&self) -> &'static str {
        "Filter by tags"
    }

    fn params(&self) -> &SharedParams {
        &self.params
    }

    fn refetch(&self) -> Option<&Refetch> {
        self.refetch.as_ref()
    }

    async fn choices(&self, store: &dyn DocumentStore) -> Result<Vec<(String, String)>> {
        let tags: Vec<Tag> = store
            .find_as(Collection::Tags, &DocumentFilter::eq("type", "customer"))
            .await?;
        Ok(tags.into_iter().map(|t| (t.id, t.name)).collect())
    }
}

pub struct BrandFilter {
    params: SharedParams,
    refetch: Option<Refetch>,
}

#[async_trait::async_trait]
impl SidebarFilter for BrandFilter {
    fn key(&self) -> &'static str {
        QueryParams::BRAND
    }

    fn title(&self) -> &'static str {
        "Filter by brands"
    }

    fn params(&self) -> &SharedParams {
        &self.params
    }

    fn refetch(&self) -> Option<&Refetch> {
        self.refetch.as_ref()
    }

    async fn choices(&self, store: &dyn DocumentStore) -> Result<Vec<(String, String)>> {
        let brands: Vec<Brand> = store.find_as(Collection::Brands, &DocumentFilter::All).await?;
        Ok(brands.into_iter().map(|b| (b.id, b.name)).collect())
    }
}

pub struct StatusFilter {
    params: SharedParams,
    refetch: Option<Refetch>,
}

#[async_trait::async_trait]
impl SidebarFilter for StatusFilter {
    fn key(&self) -> &'static str {
        QueryParams::LEAD_STATUS
    }

    fn title(&self) -> &'static str {
        "Filter by lead status"
    }

    fn params(&self) -> &SharedParams {
        &self.params
    }

    fn refetch(&self) -> Option<&Refetch> {
        self.refetch.as_ref()
    }

    async fn choices(&self, _store: &dyn DocumentStore) -> Result<Vec<(String, String)>> {
        Ok(LeadStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), s.label().to_string()))
            .collect())
    }
}

/// Lead list sidebar: tag, brand and status filters over one parameter bag
pub struct Sidebar {
    params: SharedParams,
    filters: Vec<Box<dyn SidebarFilter>>,
}

impl Sidebar {
    pub fn new(query_params: QueryParams, refetch: Option<Refetch>) -> Self {
        let params: SharedParams = Arc::new(RwLock::new(query_params));

        let filters: Vec<Box<dyn SidebarFilter>> = vec![
            Box::new(TagFilter {
                params: params.clone(),
                refetch: refetch.clone(),
            }),
            Box::new(BrandFilter {
                params: params.clone(),
                refetch: refetch.clone(),
            }),
            Box::new(StatusFilter {
                params: params.clone(),
                refetch,
            }),
        ];

        Self { params, filters }
    }

    pub fn filters(&self) -> &[Box<dyn SidebarFilter>] {
        &self.filters
    }

    pub fn query_params(&self) -> QueryParams {
        self.params.read().clone()
    }

    pub async fn render(&self, store: &dyn DocumentStore) -> Result<SidebarView> {
        let mut sections = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            sections.push(filter.render(store).await?);
        }

        Ok(SidebarView {
            query_params: self.query_params(),
            sections,
        })
    }

    /// Route a selection to the widget owning `key`
    pub fn select(&self, key: &str, value: &str) -> Result<()> {
        let filter = self
            .filters
            .iter()
            .find(|f| f.key() == key)
            .ok_or_else(|| anyhow!("No sidebar filter for '{}'", key))?;
        filter.select(value);
        Ok(())
    }
}
