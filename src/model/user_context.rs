use serde::{Deserialize, Serialize};

/// Acting user, taken from request headers and stamped on edited fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

impl UserContext {
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            user_email: None,
            user_name: None,
        }
    }

    pub fn with_details(user_id: String, email: Option<String>, name: Option<String>) -> Self {
        Self {
            user_id,
            user_email: email,
            user_name: name,
        }
    }

    /// Seed loading and other internal writes
    pub fn system() -> Self {
        Self {
            user_id: "system".to_string(),
            user_email: Some("system@crm.internal".to_string()),
            user_name: Some("System".to_string()),
        }
    }

    /// Used when a request carries no user headers (local development)
    pub fn default_user() -> Self {
        Self {
            user_id: "dev-user".to_string(),
            user_email: Some("dev@localhost".to_string()),
            user_name: Some("Development User".to_string()),
        }
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::default_user()
    }
}
