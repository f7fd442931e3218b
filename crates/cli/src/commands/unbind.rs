//! `eden unbind`: revoke credentials of an instance

use super::{instance_ref, require_instance, Output};
use anyhow::{Context, Result};
use eden_broker::Broker;
use eden_registry::{resolver, Registry};

#[derive(Debug, Clone, Default, clap::Args)]
pub struct UnbindArgs {
    /// Binding name/ID to destroy
    #[arg(short = 'b', long = "bind")]
    pub binding: String,
}

/// Unbind on the broker, then forget the binding locally.
///
/// A recorded binding name is translated to its id; anything else is sent to
/// the broker as given.
pub async fn run(
    broker: &dyn Broker,
    registry: &mut Registry,
    instance: Option<&str>,
    args: &UnbindArgs,
    out: &mut Output<'_>,
) -> Result<()> {
    let query = require_instance("unbind", instance)?;
    if args.binding.is_empty() {
        anyhow::bail!("unbind command requires --bind [NAME|GUID]");
    }
    let instance = resolver::resolve_for_mutation(registry, query)?;

    let binding_id = instance
        .find_binding(&args.binding)
        .map(|b| b.id.clone())
        .unwrap_or_else(|| args.binding.clone());

    broker
        .unbind(&instance_ref(&instance), &binding_id)
        .await
        .context("Failed to unbind from service instance")?;
    registry.remove_binding(&instance.id, &binding_id)?;

    out.line("Success")
}
