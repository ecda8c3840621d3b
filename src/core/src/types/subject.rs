//! Subjects of an authorization check: the acting user and the resource

use super::ids::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User performing an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier
    pub id: UserId,

    /// Additional attributes consulted by gates (e.g., department, plan)
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl User {
    /// Create a new user
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute to the user
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Resource being accessed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier (e.g., "post:42")
    pub id: String,

    /// Resource type (post, invoice, ...)
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Additional attributes (e.g., owner_id, status)
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Resource {
    /// Create a new resource from an ID string.
    ///
    /// The type is taken from the prefix before the first `:`.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let resource_type = id.split(':').next().unwrap_or("resource").to_string();

        Self {
            id,
            resource_type,
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute to the resource
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Whether the resource's `owner_id` attribute names the given user
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.attribute("owner_id") == Some(user.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("alice").with_attribute("department", "support");

        assert_eq!(user.id.as_str(), "alice");
        assert_eq!(user.attribute("department"), Some("support"));
        assert_eq!(user.attribute("missing"), None);
    }

    #[test]
    fn test_resource_creation() {
        let resource = Resource::new("post:42").with_attribute("owner_id", "alice");

        assert_eq!(resource.resource_type, "post");
        assert!(resource.is_owned_by(&User::new("alice")));
        assert!(!resource.is_owned_by(&User::new("bob")));
    }
}
