pub mod gce;
pub mod poll;
pub mod provisioner;
pub mod request;
pub mod types;

#[cfg(test)]
mod fake;

use std::time::Duration;

use async_trait::async_trait;
use types::{EXTERNAL_NAT, InstanceDetails, InstanceRequest, OperationHandle};

pub use poll::{PollPolicy, wait_for_operation};
pub use provisioner::{ProvisionConfig, ProvisionReport, Provisioner, UnitOutcome, plan_batches};
pub use request::build_request;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("gce error: {0}")]
    Gce(#[from] gce_api::Error),

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("operation {operation} failed: {message}")]
    ProvisionFailure { operation: String, message: String },

    #[error("operation {operation} not done after {waited:?}")]
    Timeout { operation: String, waited: Duration },

    #[error("cancelled before start")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`], used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidTemplate,
    InvalidConfig,
    ProvisionFailure,
    TransientApi,
    Timeout,
    Cancelled,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTemplate(_) => ErrorKind::InvalidTemplate,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::ProvisionFailure { .. } => ErrorKind::ProvisionFailure,
            Self::Gce(_) => ErrorKind::TransientApi,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Creates instances and reads back their live state.
#[async_trait]
pub trait InstanceService: Send + Sync + 'static {
    /// Submit a creation request. Returns as soon as the provider has
    /// accepted it; completion is tracked through the returned operation.
    async fn create_instance(&self, request: &InstanceRequest) -> Result<OperationHandle>;

    async fn get_instance(&self, zone: &str, name: &str) -> Result<InstanceDetails>;

    /// Name of the access config whose NAT IP is the instance's external IP.
    fn external_access_config(&self) -> &str {
        EXTERNAL_NAT
    }
}

/// Reports progress of operations returned by [`InstanceService`].
#[async_trait]
pub trait OperationService: Send + Sync + 'static {
    async fn get_operation(&self, operation: &OperationHandle) -> Result<OperationHandle>;
}
