use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::{Collection, Company, ConformityQuery, Customer, DocumentFilter, Tag, User};
use crate::store::traits::{ConformityStore, DocumentStore, DocumentStoreExt};

/// Relations of a company that can be requested alongside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompanyRelation {
    Customers,
    Tags,
    Owner,
    ParentCompany,
}

impl CompanyRelation {
    pub const ALL: [CompanyRelation; 4] = [
        CompanyRelation::Customers,
        CompanyRelation::Tags,
        CompanyRelation::Owner,
        CompanyRelation::ParentCompany,
    ];
}

impl std::str::FromStr for CompanyRelation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customers" => Ok(CompanyRelation::Customers),
            "tags" | "getTags" => Ok(CompanyRelation::Tags),
            "owner" => Ok(CompanyRelation::Owner),
            "parentCompany" => Ok(CompanyRelation::ParentCompany),
            _ => Err(format!("Unknown company relation: {}", s)),
        }
    }
}

/// A company with the relations that were asked for. Relations that were
/// not requested are omitted from the JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customers: Option<Vec<Customer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_tags: Option<Vec<Tag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Option<User>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_company: Option<Option<Company>>,
}

/// Read-only projections from a company to its related entities.
/// Each resolver is independent; none holds state between calls.
pub struct CompanyResolvers<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ConformityStore> CompanyResolvers<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Customers linked to the company through conformities
    pub async fn customers(&self, company: &Company) -> Result<Vec<Customer>> {
        let customer_ids = self
            .store
            .saved_conformity(&ConformityQuery::new("company", &company.id, &["customer"]))
            .await?;

        if customer_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.store
            .find_as(Collection::Customers, &DocumentFilter::IdIn(customer_ids))
            .await
    }

    pub async fn tags(&self, company: &Company) -> Result<Vec<Tag>> {
        if company.tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.store
            .find_as(Collection::Tags, &DocumentFilter::ids(company.tag_ids.iter().cloned()))
            .await
    }

    pub async fn owner(&self, company: &Company) -> Result<Option<User>> {
        let Some(owner_id) = &company.owner_id else {
            return Ok(None);
        };

        self.store
            .get_document_as(Collection::Users, &DocumentFilter::id(owner_id.as_str()))
            .await
    }

    pub async fn parent_company(&self, company: &Company) -> Result<Option<Company>> {
        let Some(parent_id) = &company.parent_company_id else {
            return Ok(None);
        };

        self.store
            .find_one_as(Collection::Companies, &DocumentFilter::id(parent_id.as_str()))
            .await
    }

    /// Resolve the requested relations concurrently
    pub async fn resolve(
        &self,
        company: Company,
        requested: &HashSet<CompanyRelation>,
    ) -> Result<CompanyDetail> {
        let wants = |relation| requested.contains(&relation);

        let (customers, get_tags, owner, parent_company) = tokio::try_join!(
            async {
                match wants(CompanyRelation::Customers) {
                    true => self.customers(&company).await.map(Some),
                    false => Ok(None),
                }
            },
            async {
                match wants(CompanyRelation::Tags) {
                    true => self.tags(&company).await.map(Some),
                    false => Ok(None),
                }
            },
            async {
                match wants(CompanyRelation::Owner) {
                    true => self.owner(&company).await.map(Some),
                    false => Ok(None),
                }
            },
            async {
                match wants(CompanyRelation::ParentCompany) {
                    true => self.parent_company(&company).await.map(Some),
                    false => Ok(None),
                }
            },
        )?;

        Ok(CompanyDetail {
            company,
            customers,
            get_tags,
            owner,
            parent_company,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomerRelation {
    Companies,
    Tags,
    Owner,
}

impl CustomerRelation {
    pub const ALL: [CustomerRelation; 3] = [
        CustomerRelation::Companies,
        CustomerRelation::Tags,
        CustomerRelation::Owner,
    ];
}

impl std::str::FromStr for CustomerRelation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "companies" => Ok(CustomerRelation::Companies),
            "tags" | "getTags" => Ok(CustomerRelation::Tags),
            "owner" => Ok(CustomerRelation::Owner),
            _ => Err(format!("Unknown customer relation: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companies: Option<Vec<Company>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_tags: Option<Vec<Tag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Option<User>>,
}

/// The customer side of the same relations
pub struct CustomerResolvers<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ConformityStore> CustomerResolvers<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn companies(&self, customer: &Customer) -> Result<Vec<Company>> {
        let company_ids = self
            .store
            .saved_conformity(&ConformityQuery::new("customer", &customer.id, &["company"]))
            .await?;

        if company_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.store
            .find_as(Collection::Companies, &DocumentFilter::IdIn(company_ids))
            .await
    }

    pub async fn tags(&self, customer: &Customer) -> Result<Vec<Tag>> {
        if customer.tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.store
            .find_as(Collection::Tags, &DocumentFilter::ids(customer.tag_ids.iter().cloned()))
            .await
    }

    pub async fn owner(&self, customer: &Customer) -> Result<Option<User>> {
        let Some(owner_id) = &customer.owner_id else {
            return Ok(None);
        };

        self.store
            .get_document_as(Collection::Users, &DocumentFilter::id(owner_id.as_str()))
            .await
    }

    pub async fn resolve(
        &self,
        customer: Customer,
        requested: &HashSet<CustomerRelation>,
    ) -> Result<CustomerDetail> {
        let wants = |relation| requested.contains(&relation);

        let (companies, get_tags, owner) = tokio::try_join!(
            async {
                match wants(CustomerRelation::Companies) {
                    true => self.companies(&customer).await.map(Some),
                    false => Ok(None),
                }
            },
            async {
                match wants(CustomerRelation::Tags) {
                    true => self.tags(&customer).await.map(Some),
                    false => Ok(None),
                }
            },
            async {
                match wants(CustomerRelation::Owner) {
                    true => self.owner(&customer).await.map(Some),
                    false => Ok(None),
                }
            },
        )?;

        Ok(CustomerDetail {
            customer,
            companies,
            get_tags,
            owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomerState, NewConformity};
    use crate::store::mem::MemoryStore;
    use serde_json::json;

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for id in ["t1", "t2", "t3"] {
            store
                .upsert_document(
                    Collection::Tags,
                    json!({"_id": id, "name": format!("tag {}", id), "type": "company"}),
                )
                .await
                .unwrap();
        }
        store
            .upsert_document(Collection::Users, json!({"_id": "u1", "username": "owner"}))
            .await
            .unwrap();
        store
    }

    fn company() -> Company {
        serde_json::from_value(json!({
            "_id": "c1",
            "primaryName": "Acme",
            "tagIds": ["t1", "t2"],
            "ownerId": "u1",
            "parentCompanyId": null
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_tags_returns_exactly_listed_tags() {
        let store = seeded_store().await;
        let tags = CompanyResolvers::new(&store).tags(&company()).await.unwrap();

        let ids: HashSet<_> = tags.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, HashSet::from(["t1".to_string(), "t2".to_string()]));
    }

    #[tokio::test]
    async fn test_tags_empty_without_tag_ids() {
        let store = seeded_store().await;
        let mut untagged = company();
        untagged.tag_ids.clear();

        let tags = CompanyResolvers::new(&store).tags(&untagged).await.unwrap();
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_customers_empty_without_conformities() {
        let store = seeded_store().await;
        let customers = CompanyResolvers::new(&store)
            .customers(&company())
            .await
            .unwrap();
        assert!(customers.is_empty());
    }

    #[tokio::test]
    async fn test_customers_follow_conformities() {
        let store = seeded_store().await;
        for (id, name) in [("cu1", "Ann"), ("cu2", "Bob"), ("cu3", "Cid")] {
            let mut customer = Customer::new(name, CustomerState::Customer);
            customer.id = id.to_string();
            store.upsert_as(Collection::Customers, &customer).await.unwrap();
        }
        store
            .add_conformity(NewConformity {
                main_type: "company".to_string(),
                main_type_id: "c1".to_string(),
                rel_type: "customer".to_string(),
                rel_type_id: "cu1".to_string(),
            })
            .await
            .unwrap();
        store
            .add_conformity(NewConformity {
                main_type: "customer".to_string(),
                main_type_id: "cu3".to_string(),
                rel_type: "company".to_string(),
                rel_type_id: "c1".to_string(),
            })
            .await
            .unwrap();

        let customers = CompanyResolvers::new(&store)
            .customers(&company())
            .await
            .unwrap();
        let ids: Vec<_> = customers.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["cu1", "cu3"]);

        let cu3 = customers[1].clone();
        let companies = CustomerResolvers::new(&store).companies(&cu3).await;
        // c1 was never stored as a document, so the edge resolves to nothing
        assert!(companies.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owner_missing_is_none() {
        let store = seeded_store().await;
        let resolvers = CompanyResolvers::new(&store);

        let owner = resolvers.owner(&company()).await.unwrap();
        assert_eq!(owner.unwrap().username, "owner");

        let mut orphan = company();
        orphan.owner_id = Some("ghost".to_string());
        assert!(resolvers.owner(&orphan).await.unwrap().is_none());

        orphan.owner_id = None;
        assert!(resolvers.owner(&orphan).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_parent_company() {
        let store = seeded_store().await;
        let resolvers = CompanyResolvers::new(&store);
        assert!(resolvers.parent_company(&company()).await.unwrap().is_none());

        let mut parent = Company::new("Acme Holdings");
        parent.id = "p1".to_string();
        store.upsert_as(Collection::Companies, &parent).await.unwrap();

        let mut child = company();
        child.parent_company_id = Some("p1".to_string());
        let resolved = resolvers.parent_company(&child).await.unwrap().unwrap();
        assert_eq!(resolved.primary_name, "Acme Holdings");

        child.parent_company_id = Some("gone".to_string());
        assert!(resolvers.parent_company(&child).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_only_requested_relations() {
        let store = seeded_store().await;
        let requested = HashSet::from([CompanyRelation::Tags, CompanyRelation::Owner]);

        let detail = CompanyResolvers::new(&store)
            .resolve(company(), &requested)
            .await
            .unwrap();
        assert_eq!(detail.get_tags.as_ref().map(Vec::len), Some(2));
        assert!(detail.owner.as_ref().unwrap().is_some());
        assert!(detail.customers.is_none());
        assert!(detail.parent_company.is_none());

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["_id"], "c1");
        assert!(json.get("customers").is_none());
        assert_eq!(json["owner"]["username"], "owner");
    }
}
