//! `eden provision`: create a service instance and record it

use super::{label, parse_parameters, track_operation, Output};
use crate::poller::PollSettings;
use anyhow::{Context, Result};
use eden_broker::{Broker, InstanceRef, LastOperationQuery};
use eden_common::{OperationKind, OperationState};
use eden_registry::{resolver, Registry};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct ProvisionArgs {
    /// Service name/ID from catalog
    #[arg(short = 's', long = "service-name")]
    pub service: String,

    /// Plan name/ID from catalog (default: first)
    #[arg(short = 'p', long = "plan-name", default_value = "")]
    pub plan: String,

    /// Parameters in JSON format; prefix a filename with '@' to read it (-P @data.json)
    #[arg(short = 'P', long)]
    pub parameters: Option<String>,
}

/// Provision a new instance, named `name` or `<service>-<plan>-<id>`.
///
/// An explicit name that already belongs to a recorded instance is rejected
/// before the broker is contacted.
pub async fn run(
    broker: &dyn Broker,
    registry: &mut Registry,
    poll: PollSettings,
    name: Option<&str>,
    args: &ProvisionArgs,
    out: &mut Output<'_>,
) -> Result<()> {
    let instance_id = Uuid::new_v4().to_string();
    let requested_name = name.unwrap_or_default();
    if !requested_name.is_empty() {
        resolver::ensure_name_available(registry, &instance_id, requested_name)?;
    }
    let parameters = parse_parameters(args.parameters.as_deref())?;

    let catalog = broker
        .catalog()
        .await
        .context("Could not fetch the broker catalog")?;
    let offering = catalog.resolve_offering(&args.service, &args.plan)?;

    let instance_name = if requested_name.is_empty() {
        format!(
            "{}-{}-{}",
            offering.service_name, offering.plan_name, instance_id
        )
    } else {
        requested_name.to_string()
    };

    let target = InstanceRef::new(&offering.service_id, &offering.plan_id, &instance_id);
    let response = broker
        .provision(&target, parameters.as_ref())
        .await
        .context("Failed to provision service instance")?;

    resolver::resolve_for_creation(registry, &instance_id, &instance_name);
    registry.update_instance_fields(&instance_id, &offering, broker.url())?;
    info!("Provisioned {} as {}", instance_name, instance_id);

    let prefix = label(OperationKind::Provision);
    if !out.json {
        out.line(format!(
            "{} {}/{} - name: {}",
            prefix, offering.service_name, offering.plan_name, instance_name
        ))?;
    }

    let mut state = OperationState::Succeeded;
    if response.is_async {
        let query = LastOperationQuery {
            instance: target,
            operation_token: response.operation_token.clone(),
        };
        state = track_operation(broker, poll, OperationKind::Provision, query, out)
            .await?
            .state;
    }

    if out.json {
        let instance = resolver::resolve_for_mutation(registry, &instance_id)?;
        return out.write_json(&json!({
            "instance": instance,
            "state": state,
            "dashboard_url": response.dashboard_url,
        }));
    }

    match &response.dashboard_url {
        Some(url) => out.line(format!("{} done - {}", prefix, url)),
        None => out.line(format!("{} done", prefix)),
    }
}
