//! Open Service Broker API client
//!
//! The `Broker` trait is what command orchestrators talk to;
//! `OpenServiceBroker` implements it over HTTP.

pub mod catalog;
pub mod client;
pub mod models;

use async_trait::async_trait;
use eden_common::{LastOperation, OperationResponse, Result};

pub use catalog::{Catalog, Plan, Service};
pub use client::{OpenServiceBroker, DEFAULT_API_VERSION};
pub use models::{BindResponse, InstanceRef, LastOperationQuery};

/// Remote service broker
#[async_trait]
pub trait Broker: Send + Sync {
    /// Base URL of the broker, recorded on provisioned instances
    fn url(&self) -> &str;

    async fn catalog(&self) -> Result<Catalog>;

    async fn provision(
        &self,
        instance: &InstanceRef,
        parameters: Option<&serde_json::Value>,
    ) -> Result<OperationResponse>;

    async fn update(
        &self,
        instance: &InstanceRef,
        parameters: Option<&serde_json::Value>,
    ) -> Result<OperationResponse>;

    async fn deprovision(&self, instance: &InstanceRef) -> Result<OperationResponse>;

    async fn bind(
        &self,
        instance: &InstanceRef,
        binding_id: &str,
        parameters: Option<&serde_json::Value>,
    ) -> Result<BindResponse>;

    async fn unbind(&self, instance: &InstanceRef, binding_id: &str) -> Result<()>;

    /// Status of the last asynchronous operation on an instance.
    ///
    /// A response body that cannot be decoded is reported as
    /// `Error::PollDecodeAmbiguous`, distinct from transport failures.
    async fn last_operation(&self, query: &LastOperationQuery) -> Result<LastOperation>;
}
