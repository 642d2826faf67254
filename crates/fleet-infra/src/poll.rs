use std::time::Duration;

use crate::types::{OperationHandle, OperationStatus};
use crate::{Error, OperationService, Result};

/// Backoff and deadline for waiting on a single operation.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Upper bound on the whole wait, including slow poll calls.
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            max_wait: Duration::from_secs(600),
        }
    }
}

impl PollPolicy {
    fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier.max(1.0)).min(self.max_interval)
    }
}

/// Poll `operation` until it is done, fails, or `policy.max_wait` elapses.
pub async fn wait_for_operation(
    operations: &dyn OperationService,
    operation: &OperationHandle,
    policy: &PollPolicy,
) -> Result<OperationHandle> {
    match tokio::time::timeout(policy.max_wait, poll_until_done(operations, operation, policy))
        .await
    {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation = %operation.id, waited = ?policy.max_wait, "operation timed out");
            Err(Error::Timeout {
                operation: operation.id.clone(),
                waited: policy.max_wait,
            })
        }
    }
}

async fn poll_until_done(
    operations: &dyn OperationService,
    operation: &OperationHandle,
    policy: &PollPolicy,
) -> Result<OperationHandle> {
    let mut interval = policy.initial_interval;
    let mut polls = 0u32;

    loop {
        let current = operations.get_operation(operation).await?;
        polls += 1;

        if let Some(message) = current.error {
            return Err(Error::ProvisionFailure {
                operation: current.id,
                message,
            });
        }
        if current.status == OperationStatus::Done {
            tracing::debug!(operation = %current.id, polls, "operation complete");
            return Ok(current);
        }

        tracing::trace!(operation = %current.id, status = ?current.status, next_poll = ?interval, "operation pending");
        tokio::time::sleep(interval).await;
        interval = policy.next_interval(interval);
    }
}
