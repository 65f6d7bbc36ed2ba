use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The list page's query-parameter bag shared by every sidebar filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub const TAG: &'static str = "tag";
    pub const BRAND: &'static str = "brand";
    pub const LEAD_STATUS: &'static str = "leadStatus";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Selecting the active value again clears the parameter
    pub fn toggle(&mut self, key: &str, value: &str) {
        if self.get(key) == Some(value) {
            self.remove(key);
        } else {
            self.set(key, value);
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn tag(&self) -> Option<&str> {
        self.get(Self::TAG)
    }

    pub fn brand(&self) -> Option<&str> {
        self.get(Self::BRAND)
    }

    pub fn lead_status(&self) -> Option<&str> {
        self.get(Self::LEAD_STATUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_sets_and_clears() {
        let mut params = QueryParams::new();
        params.toggle(QueryParams::TAG, "t1");
        assert_eq!(params.tag(), Some("t1"));

        params.toggle(QueryParams::TAG, "t2");
        assert_eq!(params.tag(), Some("t2"));

        params.toggle(QueryParams::TAG, "t2");
        assert_eq!(params.tag(), None);
    }

    #[test]
    fn test_empty_values_read_as_absent() {
        let params = QueryParams::new().with(QueryParams::BRAND, "");
        assert_eq!(params.brand(), None);
    }
}
