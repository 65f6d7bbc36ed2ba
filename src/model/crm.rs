use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{default_timestamp, generate_id, Id};

/// Value collected by a custom field, stored on the owning entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldData {
    pub field: Id,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(default)]
    pub primary_name: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_company_id: Option<Id>,
    #[serde(default)]
    pub tag_ids: Vec<Id>,
    #[serde(default)]
    pub custom_fields_data: Vec<CustomFieldData>,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub modified_at: DateTime<Utc>,
}

impl Company {
    pub fn new(primary_name: impl Into<String>) -> Self {
        let primary_name = primary_name.into();
        let now = Utc::now();
        Self {
            id: generate_id(),
            names: vec![primary_name.clone()],
            primary_name,
            industry: None,
            website: None,
            size: None,
            owner_id: None,
            parent_company_id: None,
            tag_ids: Vec::new(),
            custom_fields_data: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerState {
    Visitor,
    Lead,
    Customer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadStatus {
    New,
    AttemptedToContact,
    InProgress,
    BadTiming,
    Unqualified,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::AttemptedToContact,
        LeadStatus::InProgress,
        LeadStatus::BadTiming,
        LeadStatus::Unqualified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::AttemptedToContact => "attemptedToContact",
            LeadStatus::InProgress => "inProgress",
            LeadStatus::BadTiming => "badTiming",
            LeadStatus::Unqualified => "unqualified",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::AttemptedToContact => "Attempted to contact",
            LeadStatus::InProgress => "In progress",
            LeadStatus::BadTiming => "Bad timing",
            LeadStatus::Unqualified => "Unqualified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_phone: Option<String>,
    #[serde(default = "default_state")]
    pub state: CustomerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_status: Option<LeadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Id>,
    #[serde(default)]
    pub tag_ids: Vec<Id>,
    #[serde(default)]
    pub custom_fields_data: Vec<CustomFieldData>,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_state() -> CustomerState {
    CustomerState::Customer
}

impl Customer {
    pub fn new(first_name: impl Into<String>, state: CustomerState) -> Self {
        Self {
            id: generate_id(),
            first_name: Some(first_name.into()),
            last_name: None,
            primary_email: None,
            primary_phone: None,
            state,
            lead_status: None,
            brand_id: None,
            owner_id: None,
            tag_ids: Vec::new(),
            custom_fields_data: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    /// Entity kind the tag applies to, e.g. "customer" or "company"
    #[serde(rename = "type")]
    pub tag_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<UserDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
