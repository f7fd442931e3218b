//! Local registry of service instances
//!
//! Keeps the YAML file recording every instance this client provisioned and
//! the credentials of its bindings. The file is rewritten in full on every
//! mutation under a lock, re-reading the file if another process changed it.

pub mod lock;
pub mod resolver;
pub mod storage;

pub use lock::RegistryLock;
pub use storage::Registry;
