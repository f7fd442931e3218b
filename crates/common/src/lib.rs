pub mod error;
pub mod models;
pub mod operation;

pub use error::{Error, Result};
pub use models::{CatalogOffering, RegistryDocument, ServiceBinding, ServiceInstance};
pub use operation::{LastOperation, OperationKind, OperationResponse, OperationState};
