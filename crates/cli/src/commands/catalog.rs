//! `eden catalog`: list the broker's services and plans

use super::Output;
use crate::format::Table;
use anyhow::{Context, Result};
use eden_broker::Broker;
use eden_common::Error;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct CatalogArgs {
    /// Validate the catalog the way a strict platform would (unique plan ids)
    #[arg(long, env = "EDEN_STRICT")]
    pub strict: bool,
}

pub async fn run(broker: &dyn Broker, args: &CatalogArgs, out: &mut Output<'_>) -> Result<()> {
    let catalog = broker
        .catalog()
        .await
        .context("Could not fetch the broker catalog")?;

    if args.strict {
        let errors = catalog.validation_errors();
        if !errors.is_empty() {
            return Err(Error::InvalidCatalog(errors).into());
        }
    }

    if out.json {
        return out.write_json(&catalog);
    }

    let mut table = Table::new(["Service", "Plan", "Free", "Description"]);
    for service in &catalog.services {
        for plan in &service.plans {
            let free = match plan.free {
                Some(true) | None => "yes",
                Some(false) => "no",
            };
            table.row([
                service.name.as_str(),
                plan.name.as_str(),
                free,
                plan.description.as_str(),
            ]);
        }
    }
    table.write_to(out.writer)?;
    Ok(())
}
