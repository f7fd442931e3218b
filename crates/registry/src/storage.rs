//! File-backed registry of service instances
//!
//! Data model (YAML):
//! - service_instances → ordered list of instances
//! - service_instances[].bindings → ordered list of bindings with credentials
//!
//! Lookups are linear scans; the registry holds tens of records, not more.

use crate::lock::RegistryLock;
use eden_common::{
    CatalogOffering, Error, RegistryDocument, Result, ServiceBinding, ServiceInstance,
};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// How long a write waits for another process holding the lock
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry of instances provisioned by this client
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    document: RegistryDocument,
    /// Hash of the file content this registry was loaded from or last wrote;
    /// `None` when there was no file
    fingerprint: Option<String>,
    /// Ids of records created in memory and not written yet
    unsaved: Vec<String>,
    lock_timeout: Duration,
}

impl Registry {
    /// Load the registry at `path`; a missing file yields an empty registry
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let (document, fingerprint) = match read_if_exists(&path)? {
            Some(bytes) => {
                let document = parse_document(&path, &bytes)?;
                (document, Some(fingerprint(&bytes)))
            }
            None => {
                debug!("No registry file at {}, starting empty", path.display());
                (RegistryDocument::default(), None)
            }
        };

        debug!(
            "Loaded {} service instance(s) from {}",
            document.service_instances.len(),
            path.display()
        );

        Ok(Self {
            path,
            document,
            fingerprint,
            unsaved: Vec::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    /// Override how long writes wait for a concurrent writer
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All instances in insertion order
    pub fn list_instances(&self) -> &[ServiceInstance] {
        &self.document.service_instances
    }

    /// Find an instance by id, falling back to name. Empty queries never match.
    pub fn find_instance(&self, id_or_name: &str) -> Option<&ServiceInstance> {
        self.position(id_or_name)
            .map(|idx| &self.document.service_instances[idx])
    }

    /// Return the instance addressed by `id_or_name`, appending a new record
    /// with that id when there is none. Only the in-memory collection changes;
    /// the record is written by the next mutation.
    pub fn find_or_create_instance(&mut self, id_or_name: &str) -> ServiceInstance {
        if let Some(idx) = self.position(id_or_name) {
            return self.document.service_instances[idx].clone();
        }
        self.append(ServiceInstance::new(id_or_name))
    }

    /// Provision-time lookup: match on `id`, then on a non-empty `name`,
    /// otherwise append a record carrying both.
    pub fn find_or_create_by_id_and_name(&mut self, id: &str, name: &str) -> ServiceInstance {
        let instances = &self.document.service_instances;
        let existing = instances
            .iter()
            .position(|inst| inst.id == id)
            .or_else(|| {
                if name.is_empty() {
                    None
                } else {
                    instances.iter().position(|inst| inst.name == name)
                }
            });

        if let Some(idx) = existing {
            return self.document.service_instances[idx].clone();
        }

        let mut instance = ServiceInstance::new(id);
        instance.name = name.to_string();
        self.append(instance)
    }

    /// Record the catalog offering and broker of a freshly provisioned instance
    pub fn update_instance_fields(
        &mut self,
        id: &str,
        offering: &CatalogOffering,
        broker_url: &str,
    ) -> Result<()> {
        self.mutate(|doc| {
            let instance = doc
                .service_instances
                .iter_mut()
                .find(|inst| inst.id == id)
                .ok_or_else(|| Error::InstanceNotFound(id.to_string()))?;

            instance.service_id = offering.service_id.clone();
            instance.service_name = offering.service_name.clone();
            instance.plan_id = offering.plan_id.clone();
            instance.plan_name = offering.plan_name.clone();
            instance.broker_url = broker_url.to_string();

            info!(
                "Recorded {}/{} for instance {}",
                offering.service_name, offering.plan_name, id
            );
            Ok(Some(()))
        })?;
        Ok(())
    }

    /// Change an instance's name.
    ///
    /// A name already used by a different instance is rejected.
    pub fn rename_instance(&mut self, id_or_name: &str, new_name: &str) -> Result<()> {
        self.mutate(|doc| {
            let idx = position(&doc.service_instances, id_or_name)
                .ok_or_else(|| Error::InstanceNotFound(id_or_name.to_string()))?;

            let id = doc.service_instances[idx].id.clone();
            let taken = !new_name.is_empty()
                && doc
                    .service_instances
                    .iter()
                    .any(|inst| inst.id != id && inst.name == new_name);
            if taken {
                return Err(Error::DuplicateInstanceName(new_name.to_string()));
            }

            doc.service_instances[idx].name = new_name.to_string();
            info!("Renamed instance {} to '{}'", id, new_name);
            Ok(Some(()))
        })?;
        Ok(())
    }

    /// Append a binding to an instance
    pub fn add_binding(
        &mut self,
        instance_id_or_name: &str,
        binding_id: &str,
        name: &str,
        credentials: serde_json::Value,
    ) -> Result<ServiceBinding> {
        let added = self.mutate(|doc| {
            let idx = position(&doc.service_instances, instance_id_or_name)
                .ok_or_else(|| Error::InstanceNotFound(instance_id_or_name.to_string()))?;

            let instance = &mut doc.service_instances[idx];
            let clash = instance
                .bindings
                .iter()
                .find(|b| b.id == binding_id || (!name.is_empty() && b.name == name));
            if let Some(existing) = clash {
                return Err(Error::DuplicateBinding {
                    instance: instance.display_name().to_string(),
                    binding: existing.name.clone(),
                });
            }

            let binding = ServiceBinding::new(binding_id, name, credentials);
            instance.bindings.push(binding.clone());
            info!("Added binding {} to instance {}", binding_id, instance.id);
            Ok(Some(binding))
        })?;

        added.ok_or_else(|| Error::InstanceNotFound(instance_id_or_name.to_string()))
    }

    /// Drop every binding of the instance whose id or name equals
    /// `binding_id_or_name`. Unknown bindings are ignored.
    pub fn remove_binding(
        &mut self,
        instance_id_or_name: &str,
        binding_id_or_name: &str,
    ) -> Result<()> {
        self.mutate(|doc| {
            let idx = position(&doc.service_instances, instance_id_or_name)
                .ok_or_else(|| Error::InstanceNotFound(instance_id_or_name.to_string()))?;

            let instance = &mut doc.service_instances[idx];
            let before = instance.bindings.len();
            instance
                .bindings
                .retain(|b| b.id != binding_id_or_name && b.name != binding_id_or_name);

            if instance.bindings.len() == before {
                debug!(
                    "No binding '{}' on instance {}, nothing to remove",
                    binding_id_or_name, instance.id
                );
                return Ok(None);
            }

            info!(
                "Removed binding {} from instance {}",
                binding_id_or_name, instance.id
            );
            Ok(Some(()))
        })?;
        Ok(())
    }

    /// Drop every instance matching `id_or_name`. Unknown identities are ignored.
    pub fn remove_instance(&mut self, id_or_name: &str) -> Result<()> {
        self.mutate(|doc| {
            let before = doc.service_instances.len();
            doc.service_instances
                .retain(|inst| !inst.matches(id_or_name));

            if doc.service_instances.len() == before {
                debug!("No instance '{}', nothing to remove", id_or_name);
                return Ok(None);
            }

            info!("Removed instance {}", id_or_name);
            Ok(Some(()))
        })?;
        Ok(())
    }

    /// Write the in-memory collection, on top of whatever another process
    /// saved since this registry was loaded
    pub fn save(&mut self) -> Result<()> {
        self.mutate(|_| Ok(Some(())))?;
        Ok(())
    }

    /// Run `change` against the latest file content while holding the
    /// registry lock, then write the result.
    ///
    /// `change` returns `Ok(None)` when it left the document untouched, in
    /// which case nothing is written.
    fn mutate<T>(
        &mut self,
        change: impl FnOnce(&mut RegistryDocument) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        let _lock = RegistryLock::acquire(&self.path, self.lock_timeout)?;
        self.refresh()?;

        let Some(value) = change(&mut self.document)? else {
            return Ok(None);
        };

        let yaml = serde_yaml::to_string(&self.document)?;
        write_atomic(&self.path, yaml.as_bytes())?;
        self.fingerprint = Some(fingerprint(yaml.as_bytes()));
        self.unsaved.clear();

        debug!(
            "Saved {} service instance(s) to {}",
            self.document.service_instances.len(),
            self.path.display()
        );
        Ok(Some(value))
    }

    /// Reload the file if another process rewrote it, carrying over records
    /// created in memory that were never written. Caller holds the lock.
    fn refresh(&mut self) -> Result<()> {
        let bytes = read_if_exists(&self.path)?;
        let on_disk = bytes.as_deref().map(fingerprint);
        if on_disk == self.fingerprint {
            return Ok(());
        }

        info!(
            "Registry {} changed since it was loaded, reloading",
            self.path.display()
        );
        let mut document = match &bytes {
            Some(bytes) => parse_document(&self.path, bytes)?,
            None => RegistryDocument::default(),
        };
        for instance in &self.document.service_instances {
            let pending = self.unsaved.contains(&instance.id)
                && !document.service_instances.iter().any(|i| i.id == instance.id);
            if pending {
                document.service_instances.push(instance.clone());
            }
        }

        self.document = document;
        self.fingerprint = on_disk;
        Ok(())
    }

    fn position(&self, id_or_name: &str) -> Option<usize> {
        position(&self.document.service_instances, id_or_name)
    }

    fn append(&mut self, instance: ServiceInstance) -> ServiceInstance {
        debug!("Creating registry record for instance '{}'", instance.id);
        self.unsaved.push(instance.id.clone());
        self.document.service_instances.push(instance.clone());
        instance
    }
}

/// Index of the instance with id `id_or_name`, else the first one with that
/// name. Empty queries never match.
fn position(instances: &[ServiceInstance], id_or_name: &str) -> Option<usize> {
    if id_or_name.is_empty() {
        return None;
    }
    instances
        .iter()
        .position(|inst| inst.id == id_or_name)
        .or_else(|| instances.iter().position(|inst| inst.name == id_or_name))
}

fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::RegistryIo {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_document(path: &Path, bytes: &[u8]) -> Result<RegistryDocument> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(RegistryDocument::default());
    }
    serde_yaml::from_slice(bytes).map_err(|source| Error::RegistryUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Write to a temporary file beside `path`, restrict it to the owner, then
/// rename it over `path`
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let io_err = |source: std::io::Error| Error::RegistryIo {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(&dir).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
    tmp.write_all(contents).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    restrict_to_owner(tmp.path()).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    restrict_to_owner(path).map_err(io_err)
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
