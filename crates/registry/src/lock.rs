//! Exclusive lock file guarding registry writes across processes

use eden_common::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// A lock older than this is left over from a killed process
const STALE_AFTER: Duration = Duration::from_secs(30);

const RETRY_DELAY: Duration = Duration::from_millis(50);

/// Held while a registry file is re-read and replaced; released on drop.
///
/// The lock file carries a token naming its holder. Stale-lock cleanup and
/// release only delete the file while it still carries the expected token;
/// a lock taken in the short window between that check and the removal is
/// not protected.
#[derive(Debug)]
pub struct RegistryLock {
    path: PathBuf,
    token: String,
}

impl RegistryLock {
    /// Lock file path used for a registry file
    pub fn path_for(registry_path: &Path) -> PathBuf {
        let mut name = registry_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        registry_path.with_file_name(name)
    }

    /// Acquire the lock, waiting up to `timeout` for another holder
    pub fn acquire(registry_path: &Path, timeout: Duration) -> Result<Self> {
        let path = Self::path_for(registry_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| Error::RegistryIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let token = holder_token();
                    if let Err(source) = file.write_all(token.as_bytes()) {
                        let _ = fs::remove_file(&path);
                        return Err(Error::RegistryIo { path, source });
                    }
                    debug!("Acquired registry lock {}", path.display());
                    return Ok(Self { path, token });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let removed = stale_holder(&path)
                        .is_some_and(|stale| remove_if_held_by(&path, &stale));
                    if removed {
                        continue;
                    }
                    if started.elapsed() >= timeout {
                        return Err(Error::RegistryLocked(registry_path.to_path_buf()));
                    }
                    thread::sleep(RETRY_DELAY);
                }
                Err(source) => return Err(Error::RegistryIo { path, source }),
            }
        }
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(holder) if holder == self.token => {
                if let Err(e) = fs::remove_file(&self.path) {
                    warn!("Failed to release registry lock {}: {}", self.path.display(), e);
                }
            }
            Ok(holder) => warn!(
                "Registry lock {} is now held by '{}', leaving it in place",
                self.path.display(),
                holder
            ),
            Err(e) => warn!("Failed to release registry lock {}: {}", self.path.display(), e),
        }
    }
}

/// Process id plus a timestamp, unique per acquisition
fn holder_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}:{}", std::process::id(), nanos)
}

/// Token of the lock at `path` if it is older than `STALE_AFTER`
fn stale_holder(path: &Path) -> Option<String> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let age = SystemTime::now().duration_since(modified).ok()?;
    if age <= STALE_AFTER {
        return None;
    }
    fs::read_to_string(path).ok()
}

/// Delete the lock at `path` if `stale` still holds it
fn remove_if_held_by(path: &Path, stale: &str) -> bool {
    match fs::read_to_string(path) {
        Ok(holder) if holder == stale => {
            warn!("Removing stale registry lock {} held by '{}'", path.display(), holder);
            fs::remove_file(path).is_ok()
        }
        _ => {
            debug!("Registry lock {} changed hands, not removing", path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path_sits_next_to_registry() {
        let path = RegistryLock::path_for(Path::new("/home/u/.eden/config"));
        assert_eq!(path, PathBuf::from("/home/u/.eden/config.lock"));
    }

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("config");

        let lock = RegistryLock::acquire(&registry, Duration::from_millis(10)).unwrap();
        assert!(RegistryLock::path_for(&registry).exists());

        let second = RegistryLock::acquire(&registry, Duration::from_millis(100));
        assert!(matches!(second, Err(Error::RegistryLocked(_))));

        drop(lock);
        assert!(!RegistryLock::path_for(&registry).exists());

        let third = RegistryLock::acquire(&registry, Duration::from_millis(10));
        assert!(third.is_ok());
    }

    #[test]
    fn test_lock_creates_missing_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("nested").join("config");

        let _lock = RegistryLock::acquire(&registry, Duration::from_millis(10)).unwrap();
        assert!(dir.path().join("nested").join("config.lock").exists());
    }

    #[test]
    fn test_drop_leaves_lock_taken_over_by_another_holder() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("config");
        let lock_path = RegistryLock::path_for(&registry);

        let lock = RegistryLock::acquire(&registry, Duration::from_millis(10)).unwrap();
        fs::write(&lock_path, "4242:1").unwrap();
        drop(lock);

        assert_eq!(fs::read_to_string(&lock_path).unwrap(), "4242:1");
    }

    #[test]
    fn test_stale_lock_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("config");
        let lock_path = RegistryLock::path_for(&registry);

        fs::write(&lock_path, "4242:1").unwrap();
        let old = SystemTime::now() - STALE_AFTER - Duration::from_secs(5);
        fs::File::options()
            .write(true)
            .open(&lock_path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let lock = RegistryLock::acquire(&registry, Duration::from_millis(10)).unwrap();
        let holder = fs::read_to_string(&lock_path).unwrap();
        assert_eq!(holder, lock.token);
        assert!(holder.starts_with(&format!("{}:", std::process::id())));

        drop(lock);
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_stale_lock_removed_only_when_token_matches() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("config.lock");

        fs::write(&lock_path, "7:2").unwrap();
        assert!(!remove_if_held_by(&lock_path, "4242:1"));
        assert!(lock_path.exists());

        assert!(remove_if_held_by(&lock_path, "7:2"));
        assert!(!lock_path.exists());
    }
}
