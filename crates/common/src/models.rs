//! Records kept in the local registry file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level layout of the registry file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub service_instances: Vec<ServiceInstance>,
}

/// A service instance provisioned through a broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Identifier sent to the broker, assigned once
    pub id: String,

    /// User-facing label, unique among instances when non-empty
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub service_id: String,

    #[serde(default)]
    pub service_name: String,

    #[serde(default)]
    pub plan_id: String,

    #[serde(default)]
    pub plan_name: String,

    /// Broker this instance was provisioned on
    #[serde(default)]
    pub broker_url: String,

    /// Bindings in creation order; the first one is the default
    #[serde(default)]
    pub bindings: Vec<ServiceBinding>,

    pub created_at: DateTime<Utc>,
}

/// Credentials issued by a bind call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceBinding {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Stored verbatim, never interpreted by the registry
    #[serde(default)]
    pub credentials: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

/// Catalog service and plan an instance was provisioned from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogOffering {
    pub service_id: String,
    pub service_name: String,
    pub plan_id: String,
    pub plan_name: String,
}

impl ServiceInstance {
    /// Create an empty record with only its identifier set
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            service_id: String::new(),
            service_name: String::new(),
            plan_id: String::new(),
            plan_name: String::new(),
            broker_url: String::new(),
            bindings: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether `id_or_name` addresses this instance
    pub fn matches(&self, id_or_name: &str) -> bool {
        !id_or_name.is_empty() && (self.id == id_or_name || self.name == id_or_name)
    }

    /// Name if set, otherwise the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// The binding shown by convenience lookups
    pub fn default_binding(&self) -> Option<&ServiceBinding> {
        self.bindings.first()
    }

    /// Find a binding by id or name; an empty query selects the default binding
    pub fn find_binding(&self, id_or_name: &str) -> Option<&ServiceBinding> {
        if id_or_name.is_empty() {
            return self.default_binding();
        }
        self.bindings
            .iter()
            .find(|b| b.id == id_or_name || b.name == id_or_name)
    }

    pub fn offering(&self) -> CatalogOffering {
        CatalogOffering {
            service_id: self.service_id.clone(),
            service_name: self.service_name.clone(),
            plan_id: self.plan_id.clone(),
            plan_name: self.plan_name.clone(),
        }
    }
}

impl ServiceBinding {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        credentials: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            credentials,
            created_at: Utc::now(),
        }
    }

    /// Credentials as a structured document.
    ///
    /// Older registry files stored credentials as a JSON-encoded string; those
    /// are decoded here so callers always see the nested form.
    pub fn credentials_document(&self) -> serde_json::Value {
        match &self.credentials {
            serde_json::Value::String(raw) => {
                serde_json::from_str(raw).unwrap_or_else(|_| self.credentials.clone())
            }
            other => other.clone(),
        }
    }
}
