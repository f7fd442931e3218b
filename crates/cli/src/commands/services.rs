//! `eden services`: show recorded instances

use super::Output;
use crate::format::Table;
use anyhow::Result;
use eden_common::ServiceInstance;
use eden_registry::{resolver, Registry};

/// List every instance, or show one in detail when `instance` is given
pub fn run(registry: &Registry, instance: Option<&str>, out: &mut Output<'_>) -> Result<()> {
    match instance.filter(|i| !i.is_empty()) {
        Some(query) => {
            let instance = resolver::resolve_for_mutation(registry, query)?;
            show_instance(&instance, out)
        }
        None => list_instances(registry.list_instances(), out),
    }
}

fn list_instances(instances: &[ServiceInstance], out: &mut Output<'_>) -> Result<()> {
    if out.json {
        return out.write_json(instances);
    }

    let mut table = Table::new(["Name", "Service", "Plan", "Binding", "Broker URL"]);
    for inst in instances {
        let binding = inst
            .default_binding()
            .map(|b| b.name.as_str())
            .unwrap_or("n/a");
        table.row([
            inst.display_name(),
            inst.service_name.as_str(),
            inst.plan_name.as_str(),
            binding,
            inst.broker_url.as_str(),
        ]);
    }
    table.write_to(out.writer)?;
    Ok(())
}

fn show_instance(instance: &ServiceInstance, out: &mut Output<'_>) -> Result<()> {
    if out.json {
        return out.write_json(instance);
    }

    out.line(format!("Instance Name: {}", instance.display_name()))?;
    out.line(format!("Instance ID:   {}", instance.id))?;
    out.line(format!(
        "Service/Plan:  {}/{}",
        instance.service_name, instance.plan_name
    ))?;
    out.line(format!("Broker URL:    {}", instance.broker_url))?;

    if instance.bindings.is_empty() {
        return out.line("No bindings.");
    }
    out.line("Bindings:")?;
    for binding in &instance.bindings {
        out.line(format!("- {}", binding.name))?;
    }
    Ok(())
}
