use anyhow::Result;

use crate::model::{Collection, Customer, DocumentFilter, QueryParams};
use crate::store::traits::{DocumentStore, DocumentStoreExt};

/// Leads matching the sidebar's query parameters. This is what a sidebar
/// refetch reloads.
pub struct LeadQuery<'a> {
    params: &'a QueryParams,
}

impl<'a> LeadQuery<'a> {
    pub fn new(params: &'a QueryParams) -> Self {
        Self { params }
    }

    pub fn matches(&self, customer: &Customer) -> bool {
        if let Some(tag) = self.params.tag() {
            if !customer.tag_ids.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(brand) = self.params.brand() {
            if customer.brand_id.as_deref() != Some(brand) {
                return false;
            }
        }
        if let Some(status) = self.params.lead_status() {
            if customer.lead_status.map(|s| s.as_str()) != Some(status) {
                return false;
            }
        }
        true
    }

    pub async fn fetch<S: DocumentStore + ?Sized>(&self, store: &S) -> Result<Vec<Customer>> {
        let leads: Vec<Customer> = store
            .find_as(Collection::Customers, &DocumentFilter::eq("state", "lead"))
            .await?;

        Ok(leads.into_iter().filter(|c| self.matches(c)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomerState, LeadStatus};
    use crate::store::mem::MemoryStore;

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();

        let mut a = Customer::new("Ann", CustomerState::Lead);
        a.id = "a".to_string();
        a.tag_ids = vec!["t1".to_string()];
        a.brand_id = Some("b1".to_string());
        a.lead_status = Some(LeadStatus::New);

        let mut b = Customer::new("Bob", CustomerState::Lead);
        b.id = "b".to_string();
        b.brand_id = Some("b2".to_string());
        b.lead_status = Some(LeadStatus::InProgress);

        let mut c = Customer::new("Cid", CustomerState::Customer);
        c.id = "c".to_string();
        c.tag_ids = vec!["t1".to_string()];

        for customer in [a, b, c] {
            store.upsert_as(Collection::Customers, &customer).await.unwrap();
        }
        store
    }

    async fn ids(params: QueryParams) -> Vec<String> {
        let store = store().await;
        LeadQuery::new(&params)
            .fetch(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect()
    }

    #[tokio::test]
    async fn test_only_leads_are_listed() {
        assert_eq!(ids(QueryParams::new()).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_filters_combine() {
        assert_eq!(ids(QueryParams::new().with(QueryParams::TAG, "t1")).await, vec!["a"]);
        assert_eq!(ids(QueryParams::new().with(QueryParams::BRAND, "b2")).await, vec!["b"]);
        assert_eq!(
            ids(QueryParams::new()
                .with(QueryParams::LEAD_STATUS, "inProgress")
                .with(QueryParams::TAG, "t1"))
            .await,
            Vec::<String>::new()
        );
    }
}
