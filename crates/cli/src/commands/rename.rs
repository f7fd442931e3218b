//! `eden rename`: give an instance a new local name

use super::{require_instance, Output};
use anyhow::Result;
use eden_registry::{resolver, Registry};

#[derive(Debug, Clone, Default, clap::Args)]
pub struct RenameArgs {
    /// New name for the instance
    pub new_name: String,
}

pub fn run(
    registry: &mut Registry,
    instance: Option<&str>,
    args: &RenameArgs,
    out: &mut Output<'_>,
) -> Result<()> {
    let query = require_instance("rename", instance)?;
    if args.new_name.is_empty() {
        anyhow::bail!("USAGE: eden rename -i [old-name] [new-name]");
    }
    let instance = resolver::resolve_for_mutation(registry, query)?;

    registry.rename_instance(&instance.id, &args.new_name)?;
    out.line(format!(
        "Renamed '{}' to '{}'",
        instance.display_name(),
        args.new_name
    ))
}
