//! `eden bind`: generate credentials for an instance

use super::{instance_ref, parse_parameters, require_instance, Output};
use anyhow::{Context, Result};
use eden_broker::Broker;
use eden_common::Error;
use eden_registry::{resolver, Registry};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct BindArgs {
    /// Binding ID to create (default: generated)
    #[arg(short = 'b', long = "bind")]
    pub binding_id: Option<String>,

    /// Parameters in JSON format; prefix a filename with '@' to read it (-P @data.json)
    #[arg(short = 'P', long)]
    pub parameters: Option<String>,
}

pub async fn run(
    broker: &dyn Broker,
    registry: &mut Registry,
    instance: Option<&str>,
    args: &BindArgs,
    out: &mut Output<'_>,
) -> Result<()> {
    let query = require_instance("bind", instance)?;
    let instance = resolver::resolve_for_mutation(registry, query)?;

    let binding_id = args
        .binding_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if instance.bindings.iter().any(|b| b.id == binding_id) {
        return Err(Error::DuplicateBinding {
            instance: instance.display_name().to_string(),
            binding: binding_id,
        }
        .into());
    }
    let binding_name = format!("{}-{}", instance.service_name, binding_id);
    let parameters = parse_parameters(args.parameters.as_deref())?;

    let response = broker
        .bind(&instance_ref(&instance), &binding_id, parameters.as_ref())
        .await
        .context("Failed to bind to service instance")?;

    registry
        .add_binding(
            &instance.id,
            &binding_id,
            &binding_name,
            response.credentials.clone(),
        )
        .context("Failed to store binding")?;

    if out.json {
        return out.write_json(&json!({
            "instance": instance,
            "binding": response,
            "binding_id": binding_id,
            "binding_name": binding_name,
        }));
    }

    out.line("Success")?;
    out.line("")?;
    out.line(format!(
        "Run 'eden credentials -i {} -b {}' to see credentials",
        instance.display_name(),
        binding_name
    ))
}
