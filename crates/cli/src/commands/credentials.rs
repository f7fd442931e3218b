//! `eden credentials`: print the credentials of a binding

use super::{require_instance, Output};
use anyhow::Result;
use eden_common::Error;
use eden_registry::{resolver, Registry};
use serde_json::Value;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct CredentialsArgs {
    /// Binding to display (default: first)
    #[arg(short = 'b', long = "bind")]
    pub binding: Option<String>,

    /// Only display a single attribute from credentials
    #[arg(short = 'a', long)]
    pub attribute: Option<String>,
}

pub fn run(
    registry: &Registry,
    instance: Option<&str>,
    args: &CredentialsArgs,
    out: &mut Output<'_>,
) -> Result<()> {
    let query = require_instance("credentials", instance)?;
    let instance = resolver::resolve_for_mutation(registry, query)?;

    if instance.bindings.is_empty() {
        return out.line("No bindings.");
    }

    let wanted = args.binding.as_deref().unwrap_or_default();
    let binding = instance
        .find_binding(wanted)
        .ok_or_else(|| Error::BindingNotFound {
            instance: query.to_string(),
            binding: wanted.to_string(),
        })?;
    let credentials = binding.credentials_document();

    match args.attribute.as_deref().filter(|a| !a.is_empty()) {
        None => out.line(serde_json::to_string_pretty(&credentials)?),
        Some(attribute) => match credentials.get(attribute) {
            Some(Value::String(text)) => out.line(text),
            Some(value) => out.line(value.to_string()),
            None => {
                let mut keys: Vec<&str> = credentials
                    .as_object()
                    .map(|obj| obj.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                keys.sort_unstable();
                anyhow::bail!(
                    "credentials --attribute key '{}' was unknown; try: {}",
                    attribute,
                    keys.join(", ")
                )
            }
        },
    }
}
