//! Command orchestrators
//!
//! One module per CLI command. Each resolves the instance it operates on,
//! talks to the broker, waits for asynchronous operations and records the
//! outcome in the registry.

pub mod bind;
pub mod catalog;
pub mod credentials;
pub mod deprovision;
pub mod provision;
pub mod rename;
pub mod services;
pub mod unbind;
pub mod update;

use crate::poller::{OperationPoller, PollOutcome, PollSettings};
use anyhow::{Context, Result};
use eden_broker::{Broker, InstanceRef, LastOperationQuery};
use eden_common::{Error, OperationKind, OperationState, ServiceInstance};
use serde::Serialize;
use std::fs;
use std::io::Write;

/// Where command output goes, and in which form
pub struct Output<'a> {
    pub writer: &'a mut dyn Write,
    pub json: bool,
}

impl<'a> Output<'a> {
    pub fn new(writer: &'a mut dyn Write, json: bool) -> Self {
        Self { writer, json }
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.writer, "{}", text.as_ref())?;
        Ok(())
    }

    /// Single-line JSON document
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let body = serde_json::to_string(value)?;
        self.line(body)
    }
}

/// Parse `--parameters`: inline JSON, or `@path` to read JSON from a file
pub fn parse_parameters(raw: Option<&str>) -> Result<Option<serde_json::Value>> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    let input = match raw.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Could not read parameters file '{}'", path))?,
        None => raw.to_string(),
    };

    let value = serde_json::from_str(&input)
        .map_err(|e| Error::InvalidParameters(format!("not valid JSON: {}", e)))?;
    Ok(Some(value))
}

/// The `--instance` value, required by every command except provision,
/// catalog and services
pub fn require_instance<'a>(command: &str, instance: Option<&'a str>) -> Result<&'a str> {
    match instance.filter(|i| !i.is_empty()) {
        Some(instance) => Ok(instance),
        None => anyhow::bail!(
            "{} command requires --instance [NAME|GUID], or $EDEN_SERVICE",
            command
        ),
    }
}

/// Broker address of a recorded instance
pub fn instance_ref(instance: &ServiceInstance) -> InstanceRef {
    InstanceRef::new(&instance.service_id, &instance.plan_id, &instance.id)
}

/// Output prefix, padded so `provision`, `update` and `deprovision` lines align
pub fn label(kind: OperationKind) -> String {
    format!("{:<12}", format!("{}:", kind))
}

/// Poll an accepted operation to completion, printing each status.
///
/// A remote `failed` state is returned as `Error::OperationFailed`.
pub async fn track_operation(
    broker: &dyn Broker,
    settings: PollSettings,
    kind: OperationKind,
    query: LastOperationQuery,
    out: &mut Output<'_>,
) -> Result<PollOutcome> {
    let prefix = label(kind);
    let quiet = out.json;
    if !quiet {
        out.line(format!("{} in-progress", prefix))?;
    }

    let mut written: std::io::Result<()> = Ok(());
    let writer = &mut *out.writer;
    let outcome = OperationPoller::new(broker, settings)
        .wait(&query, |status| {
            if !quiet && written.is_ok() {
                written = writeln!(writer, "{} {} - {}", prefix, status.state, status.description);
            }
        })
        .await?;
    written?;

    if outcome.state == OperationState::Failed {
        return Err(Error::OperationFailed {
            operation: kind.to_string(),
            description: outcome.description,
        }
        .into());
    }

    Ok(outcome)
}
