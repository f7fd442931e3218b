//! Asynchronous broker operation types

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a long-running broker operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    /// The initiating request was accepted; no status has been queried yet
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

impl OperationState {
    /// Anything other than `InProgress` stops polling
    pub fn is_terminal(self) -> bool {
        !matches!(self, OperationState::Accepted | OperationState::InProgress)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationState::Accepted => "accepted",
            OperationState::InProgress => "in progress",
            OperationState::Succeeded => "succeeded",
            OperationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Body of a last-operation query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperation {
    pub state: OperationState,

    #[serde(default)]
    pub description: String,
}

impl LastOperation {
    pub fn new(state: OperationState, description: impl Into<String>) -> Self {
        Self {
            state,
            description: description.into(),
        }
    }
}

/// What the broker returned for provision, update or deprovision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationResponse {
    /// True when the broker answered 202 Accepted
    pub is_async: bool,

    /// Correlation token echoed back on last-operation queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
}

/// Remote actions that may complete asynchronously
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Provision,
    Update,
    Deprovision,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Provision => "provision",
            OperationKind::Update => "update",
            OperationKind::Deprovision => "deprovision",
        };
        f.write_str(s)
    }
}
