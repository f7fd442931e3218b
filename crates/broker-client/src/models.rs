//! Request and response bodies of the broker API

use serde::{Deserialize, Serialize};

/// Addresses one service instance on the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRef {
    pub service_id: String,
    pub plan_id: String,
    pub instance_id: String,
}

impl InstanceRef {
    pub fn new(
        service_id: impl Into<String>,
        plan_id: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            plan_id: plan_id.into(),
            instance_id: instance_id.into(),
        }
    }
}

/// Scope of a last-operation status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastOperationQuery {
    pub instance: InstanceRef,

    /// Token returned by the call that started the operation
    pub operation_token: Option<String>,
}

/// Body of `PUT /v2/service_instances/:id`
#[derive(Debug, Serialize)]
pub(crate) struct ProvisionDetails<'a> {
    pub service_id: &'a str,
    pub plan_id: &'a str,
    pub organization_guid: &'a str,
    pub space_guid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<&'a serde_json::Value>,
}

/// Body of `PATCH /v2/service_instances/:id`
#[derive(Debug, Serialize)]
pub(crate) struct UpdateDetails<'a> {
    pub service_id: &'a str,
    pub plan_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<&'a serde_json::Value>,
    pub previous_values: PreviousValues<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PreviousValues<'a> {
    pub service_id: &'a str,
    pub plan_id: &'a str,
}

/// Body of `PUT /v2/service_instances/:id/service_bindings/:binding_id`
#[derive(Debug, Serialize)]
pub(crate) struct BindDetails<'a> {
    pub service_id: &'a str,
    pub plan_id: &'a str,
    pub app_guid: &'a str,
    pub bind_resource: BindResource<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<&'a serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BindResource<'a> {
    pub app_guid: &'a str,
}

/// Body returned by provision, update and deprovision
#[derive(Debug, Default, Deserialize)]
pub(crate) struct OperationBody {
    #[serde(default)]
    pub dashboard_url: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
}

/// Body returned by a bind call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindResponse {
    #[serde(default)]
    pub credentials: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_drain_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_service_url: Option<String>,
}

/// Error body defined by the broker API
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ErrorBody {
    pub fn summary(&self) -> Option<String> {
        match (&self.error, &self.description) {
            (Some(error), Some(description)) => Some(format!("{}: {}", error, description)),
            (None, Some(description)) => Some(description.clone()),
            (Some(error), None) => Some(error.clone()),
            (None, None) => None,
        }
    }
}
