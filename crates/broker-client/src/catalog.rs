//! Broker catalog and name-or-id lookups

use eden_common::{CatalogOffering, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Response of `GET /v2/catalog`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bindable: bool,
    #[serde(default)]
    pub plan_updateable: bool,
    #[serde(default)]
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free: Option<bool>,
}

impl Catalog {
    /// Find a service by name or id
    pub fn find_service(&self, name_or_id: &str) -> Result<&Service> {
        self.services
            .iter()
            .find(|s| s.name == name_or_id || s.id == name_or_id)
            .ok_or_else(|| {
                Error::CatalogLookup(format!("no service '{}' in catalog", name_or_id))
            })
    }

    /// Resolve a service and plan; an empty plan selects the service's first plan
    pub fn resolve_offering(&self, service: &str, plan: &str) -> Result<CatalogOffering> {
        let service = self.find_service(service)?;
        let plan = service.find_plan(plan)?;
        Ok(CatalogOffering {
            service_id: service.id.clone(),
            service_name: service.name.clone(),
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
        })
    }

    /// Problems a strict platform would reject: plan ids must be unique
    /// across the whole catalog
    pub fn validation_errors(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut errors = Vec::new();
        for service in &self.services {
            for plan in &service.plans {
                if !seen.insert(plan.id.as_str()) {
                    errors.push(format!(
                        "Service '{}' Plan '{}' ID '{}' is not unique",
                        service.name, plan.name, plan.id
                    ));
                }
            }
        }
        errors
    }
}

impl Service {
    /// Find a plan by name or id; an empty query selects the first plan
    pub fn find_plan(&self, name_or_id: &str) -> Result<&Plan> {
        if name_or_id.is_empty() {
            return self.plans.first().ok_or_else(|| {
                Error::CatalogLookup(format!("service '{}' has no plans", self.name))
            });
        }
        self.plans
            .iter()
            .find(|p| p.name == name_or_id || p.id == name_or_id)
            .ok_or_else(|| {
                Error::CatalogLookup(format!(
                    "no plan '{}' for service '{}'",
                    name_or_id, self.name
                ))
            })
    }
}
