//! HTTP client for a remote Open Service Broker

use crate::catalog::Catalog;
use crate::models::{
    BindDetails, BindResource, BindResponse, ErrorBody, InstanceRef, LastOperationQuery,
    OperationBody, PreviousValues, ProvisionDetails, UpdateDetails,
};
use crate::Broker;
use async_trait::async_trait;
use eden_common::{Error, LastOperation, OperationResponse, OperationState, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::debug;

/// Broker API version sent when none is configured
pub const DEFAULT_API_VERSION: &str = "2.14";

const ORGANIZATION_GUID: &str = "eden-unknown-guid";
const SPACE_GUID: &str = "eden-unknown-space";
const APP_GUID: &str = "eden-unknown";

/// Client for a broker speaking the Open Service Broker API
pub struct OpenServiceBroker {
    url: String,
    username: String,
    password: String,
    api_version: String,
    client: reqwest::Client,
}

impl OpenServiceBroker {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            api_version: api_version.into(),
            client: reqwest::Client::new(),
        }
    }

    fn instance_url(&self, instance_id: &str) -> String {
        format!("{}/v2/service_instances/{}", self.url, instance_id)
    }

    fn binding_url(&self, instance_id: &str, binding_id: &str) -> String {
        format!(
            "{}/service_bindings/{}",
            self.instance_url(instance_id),
            binding_id
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .header("X-Broker-API-Version", &self.api_version)
    }

    /// Send a request, mapping transport failures to `RemoteOperationFailed`
    async fn send(&self, action: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::RemoteOperationFailed(format!("{} request failed: {}", action, e)))?;
        debug!("{} returned {}", action, response.status());
        Ok(response)
    }

    /// Turn a provision/update/deprovision response into an `OperationResponse`
    async fn operation_response(&self, action: &str, response: Response) -> Result<OperationResponse> {
        let status = response.status();
        let body = read_body(action, response).await?;

        if !status.is_success() {
            return Err(remote_failure(action, status, &body));
        }

        let parsed: OperationBody = if body.trim().is_empty() {
            OperationBody::default()
        } else {
            serde_json::from_str(&body).map_err(|e| {
                Error::RemoteOperationFailed(format!("{} response could not be decoded: {}", action, e))
            })?
        };

        Ok(OperationResponse {
            is_async: status == StatusCode::ACCEPTED,
            operation_token: parsed.operation.filter(|op| !op.is_empty()),
            dashboard_url: parsed.dashboard_url.filter(|url| !url.is_empty()),
        })
    }
}

#[async_trait]
impl Broker for OpenServiceBroker {
    fn url(&self) -> &str {
        &self.url
    }

    async fn catalog(&self) -> Result<Catalog> {
        let url = format!("{}/v2/catalog", self.url);
        let response = self.send("catalog", self.request(Method::GET, &url)).await?;
        let status = response.status();
        let body = read_body("catalog", response).await?;

        if !status.is_success() {
            return Err(remote_failure("catalog", status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::RemoteOperationFailed(format!("catalog response could not be decoded: {}", e))
        })
    }

    async fn provision(
        &self,
        instance: &InstanceRef,
        parameters: Option<&serde_json::Value>,
    ) -> Result<OperationResponse> {
        let details = ProvisionDetails {
            service_id: &instance.service_id,
            plan_id: &instance.plan_id,
            organization_guid: ORGANIZATION_GUID,
            space_guid: SPACE_GUID,
            parameters,
        };
        let request = self
            .request(Method::PUT, &self.instance_url(&instance.instance_id))
            .query(&[("accepts_incomplete", "true")])
            .json(&details);

        let response = self.send("provision", request).await?;
        self.operation_response("provision", response).await
    }

    async fn update(
        &self,
        instance: &InstanceRef,
        parameters: Option<&serde_json::Value>,
    ) -> Result<OperationResponse> {
        let details = UpdateDetails {
            service_id: &instance.service_id,
            plan_id: &instance.plan_id,
            parameters,
            previous_values: PreviousValues {
                service_id: &instance.service_id,
                plan_id: &instance.plan_id,
            },
        };
        let request = self
            .request(Method::PATCH, &self.instance_url(&instance.instance_id))
            .query(&[("accepts_incomplete", "true")])
            .json(&details);

        let response = self.send("update", request).await?;
        self.operation_response("update", response).await
    }

    async fn deprovision(&self, instance: &InstanceRef) -> Result<OperationResponse> {
        let request = self
            .request(Method::DELETE, &self.instance_url(&instance.instance_id))
            .query(&[
                ("service_id", instance.service_id.as_str()),
                ("plan_id", instance.plan_id.as_str()),
                ("accepts_incomplete", "true"),
            ]);

        let response = self.send("deprovision", request).await?;
        if response.status() == StatusCode::GONE {
            debug!("Instance {} already gone", instance.instance_id);
            return Ok(OperationResponse::default());
        }
        self.operation_response("deprovision", response).await
    }

    async fn bind(
        &self,
        instance: &InstanceRef,
        binding_id: &str,
        parameters: Option<&serde_json::Value>,
    ) -> Result<BindResponse> {
        let details = BindDetails {
            service_id: &instance.service_id,
            plan_id: &instance.plan_id,
            app_guid: APP_GUID,
            bind_resource: BindResource { app_guid: APP_GUID },
            parameters,
        };
        let request = self
            .request(Method::PUT, &self.binding_url(&instance.instance_id, binding_id))
            .json(&details);

        let response = self.send("bind", request).await?;
        let status = response.status();
        let body = read_body("bind", response).await?;

        if !status.is_success() {
            return Err(remote_failure("bind", status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::RemoteOperationFailed(format!("bind response could not be decoded: {}", e))
        })
    }

    async fn unbind(&self, instance: &InstanceRef, binding_id: &str) -> Result<()> {
        let request = self
            .request(Method::DELETE, &self.binding_url(&instance.instance_id, binding_id))
            .query(&[
                ("service_id", instance.service_id.as_str()),
                ("plan_id", instance.plan_id.as_str()),
            ]);

        let response = self.send("unbind", request).await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::GONE {
            return Ok(());
        }

        let body = read_body("unbind", response).await?;
        Err(remote_failure("unbind", status, &body))
    }

    async fn last_operation(&self, query: &LastOperationQuery) -> Result<LastOperation> {
        let url = format!("{}/last_operation", self.instance_url(&query.instance.instance_id));
        let mut params = vec![
            ("service_id", query.instance.service_id.as_str()),
            ("plan_id", query.instance.plan_id.as_str()),
        ];
        if let Some(token) = &query.operation_token {
            params.push(("operation", token.as_str()));
        }
        let request = self.request(Method::GET, &url).query(&params);

        let response = self.send("last operation", request).await?;
        let status = response.status();

        // Polling a deprovision ends with the instance disappearing
        if status == StatusCode::GONE {
            return Ok(LastOperation::new(OperationState::Succeeded, "instance is gone"));
        }

        let body = read_body("last operation", response).await?;
        if !status.is_success() {
            return Err(remote_failure("last operation", status, &body));
        }

        serde_json::from_str(&body).map_err(|e| Error::PollDecodeAmbiguous(e.to_string()))
    }
}

async fn read_body(action: &str, response: Response) -> Result<String> {
    response.text().await.map_err(|e| {
        Error::RemoteOperationFailed(format!("{} response could not be read: {}", action, e))
    })
}

fn remote_failure(action: &str, status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.summary())
        .unwrap_or_else(|| body.trim().to_string());

    if detail.is_empty() {
        Error::RemoteOperationFailed(format!("{} returned {}", action, status))
    } else {
        Error::RemoteOperationFailed(format!("{} returned {}: {}", action, status, detail))
    }
}
