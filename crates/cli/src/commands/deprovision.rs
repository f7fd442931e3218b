//! `eden deprovision`: destroy an instance and forget it

use super::{instance_ref, label, require_instance, track_operation, Output};
use crate::poller::PollSettings;
use anyhow::{Context, Result};
use eden_broker::{Broker, LastOperationQuery};
use eden_common::OperationKind;
use eden_registry::{resolver, Registry};
use tracing::info;

/// Deprovision on the broker using the recorded service and plan.
///
/// The record is only removed once the broker reports success, so a failed
/// deprovision can be retried.
pub async fn run(
    broker: &dyn Broker,
    registry: &mut Registry,
    poll: PollSettings,
    instance: Option<&str>,
    out: &mut Output<'_>,
) -> Result<()> {
    let query = require_instance("deprovision", instance)?;
    let instance = resolver::resolve_for_mutation(registry, query)?;

    let target = instance_ref(&instance);
    let response = broker
        .deprovision(&target)
        .await
        .context("Failed to deprovision service instance")?;

    let prefix = label(OperationKind::Deprovision);
    out.line(format!(
        "{} {}/{} - guid: {}",
        prefix, instance.service_name, instance.plan_name, instance.id
    ))?;

    if response.is_async {
        let query = LastOperationQuery {
            instance: target,
            operation_token: response.operation_token,
        };
        track_operation(broker, poll, OperationKind::Deprovision, query, out).await?;
    }

    registry.remove_instance(&instance.id)?;
    info!("Deprovisioned {}", instance.id);

    out.line(format!("{} done", prefix))
}
