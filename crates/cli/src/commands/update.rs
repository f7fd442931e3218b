//! `eden update`: change the parameters of an instance

use super::{instance_ref, label, parse_parameters, require_instance, track_operation, Output};
use crate::poller::PollSettings;
use anyhow::{Context, Result};
use eden_broker::{Broker, LastOperationQuery};
use eden_common::OperationKind;
use eden_registry::{resolver, Registry};

#[derive(Debug, Clone, Default, clap::Args)]
pub struct UpdateArgs {
    /// Parameters in JSON format; prefix a filename with '@' to read it (-P @data.json)
    #[arg(short = 'P', long)]
    pub parameters: Option<String>,
}

pub async fn run(
    broker: &dyn Broker,
    registry: &Registry,
    poll: PollSettings,
    instance: Option<&str>,
    args: &UpdateArgs,
    out: &mut Output<'_>,
) -> Result<()> {
    let query = require_instance("update", instance)?;
    let instance = resolver::resolve_for_mutation(registry, query)?;
    let parameters = parse_parameters(args.parameters.as_deref())?;

    let target = instance_ref(&instance);
    let response = broker
        .update(&target, parameters.as_ref())
        .await
        .context("Failed to update service instance")?;

    let prefix = label(OperationKind::Update);
    out.line(format!("{} name: {}", prefix, instance.display_name()))?;

    if response.is_async {
        let query = LastOperationQuery {
            instance: target,
            operation_token: response.operation_token,
        };
        track_operation(broker, poll, OperationKind::Update, query, out).await?;
    }

    out.line(format!("{} done", prefix))
}
