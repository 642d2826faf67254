//! Batched fleet provisioning.
//!
//! Units are created in consecutive batches of at most `batch_size`. Each
//! unit is created, its operation polled to a terminal state, and the live
//! instance read back for its external IP. A failed unit is recorded and the
//! run moves on. Batches are separated by a fixed delay to stay under
//! provider rate limits; there is no delay after the last batch.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::poll::{PollPolicy, wait_for_operation};
use crate::request::build_request;
use crate::types::{InstanceTemplate, ProvisionedInstance};
use crate::{Error, InstanceService, OperationService, Result};

#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
    pub poll: PollPolicy,
    /// Run the units of a batch concurrently instead of one after another.
    pub parallel: bool,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            batch_size: 2,
            inter_batch_delay: Duration::from_secs(60),
            poll: PollPolicy::default(),
            parallel: false,
        }
    }
}

/// Split `1..=total` into consecutive ranges of at most `batch_size`.
pub fn plan_batches(total: usize, batch_size: usize) -> Result<Vec<RangeInclusive<usize>>> {
    if batch_size == 0 {
        return Err(Error::InvalidConfig("batch size must be at least 1".into()));
    }
    Ok((1..=total)
        .step_by(batch_size)
        .map(|start| start..=start.saturating_add(batch_size - 1).min(total))
        .collect())
}

/// What happened to one unit of a run.
#[derive(Debug)]
pub struct UnitOutcome {
    /// 1-based position in the run.
    pub index: usize,
    /// 1-based batch number.
    pub batch: usize,
    pub instance_name: String,
    pub result: Result<ProvisionedInstance>,
}

#[derive(Debug)]
pub struct ProvisionReport {
    pub batches: usize,
    /// One entry per unit, in submission order.
    pub outcomes: Vec<UnitOutcome>,
    pub cancelled: bool,
}

impl ProvisionReport {
    pub fn provisioned(&self) -> impl Iterator<Item = &ProvisionedInstance> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

pub struct Provisioner {
    instances: Arc<dyn InstanceService>,
    operations: Arc<dyn OperationService>,
    config: ProvisionConfig,
}

impl Provisioner {
    pub fn new(
        instances: Arc<dyn InstanceService>,
        operations: Arc<dyn OperationService>,
        config: ProvisionConfig,
    ) -> Self {
        Self {
            instances,
            operations,
            config,
        }
    }

    /// Create `total` instances from `template`.
    ///
    /// Only an invalid template or batch size fails the whole call, and
    /// both are detected before any API request. Everything else is
    /// reported per unit. Cancelling `cancel` stops new units from starting;
    /// units already in flight run to completion and nothing is rolled back.
    pub async fn provision(
        &self,
        template: &InstanceTemplate,
        total: usize,
        cancel: &CancellationToken,
    ) -> Result<ProvisionReport> {
        template.validate()?;
        let batches = plan_batches(total, self.config.batch_size)?;

        info!(
            total,
            batches = batches.len(),
            batch_size = self.config.batch_size,
            parallel = self.config.parallel,
            "provisioning fleet"
        );

        let mut outcomes = Vec::new();
        for (i, range) in batches.iter().enumerate() {
            let batch = i + 1;

            if cancel.is_cancelled() {
                outcomes.extend(
                    range
                        .clone()
                        .map(|index| Self::cancelled(template, index, batch)),
                );
                continue;
            }

            info!(
                batch,
                of = batches.len(),
                first = *range.start(),
                last = *range.end(),
                "starting batch"
            );

            let results = if self.config.parallel {
                join_all(
                    range
                        .clone()
                        .map(|index| self.run_unit(template, index, batch, cancel)),
                )
                .await
            } else {
                let mut results = Vec::with_capacity(range.clone().count());
                for index in range.clone() {
                    results.push(self.run_unit(template, index, batch, cancel).await);
                }
                results
            };

            let failed = results.iter().filter(|o| o.result.is_err()).count();
            info!(batch, succeeded = results.len() - failed, failed, "batch finished");
            outcomes.extend(results);

            if batch < batches.len() && !cancel.is_cancelled() {
                info!(delay = ?self.config.inter_batch_delay, "waiting before next batch");
                tokio::select! {
                    _ = tokio::time::sleep(self.config.inter_batch_delay) => {}
                    _ = cancel.cancelled() => warn!("cancelled while waiting for next batch"),
                }
            }
        }

        Ok(ProvisionReport {
            batches: batches.len(),
            outcomes,
            cancelled: cancel.is_cancelled(),
        })
    }

    fn cancelled(template: &InstanceTemplate, index: usize, batch: usize) -> UnitOutcome {
        UnitOutcome {
            index,
            batch,
            instance_name: template.instance_name(index),
            result: Err(Error::Cancelled),
        }
    }

    async fn run_unit(
        &self,
        template: &InstanceTemplate,
        index: usize,
        batch: usize,
        cancel: &CancellationToken,
    ) -> UnitOutcome {
        if cancel.is_cancelled() {
            return Self::cancelled(template, index, batch);
        }

        let instance_name = template.instance_name(index);
        let result = self.provision_one(template, index).await;
        match &result {
            Ok(instance) => info!(
                instance = %instance_name,
                external_ip = instance.external_ip.as_deref().unwrap_or("-"),
                "instance ready"
            ),
            Err(e) => warn!(
                instance = %instance_name,
                kind = ?e.kind(),
                error = %e,
                "instance failed"
            ),
        }

        UnitOutcome {
            index,
            batch,
            instance_name,
            result,
        }
    }

    async fn provision_one(
        &self,
        template: &InstanceTemplate,
        index: usize,
    ) -> Result<ProvisionedInstance> {
        let request = build_request(template, index)?;

        let operation = self.instances.create_instance(&request).await?;
        info!(
            instance = %request.instance_name,
            operation = %operation.id,
            "create submitted, waiting for operation"
        );

        wait_for_operation(&*self.operations, &operation, &self.config.poll).await?;

        let details = self
            .instances
            .get_instance(&request.zone, &request.instance_name)
            .await?;
        let external_ip = details.external_ip(self.instances.external_access_config());

        Ok(ProvisionedInstance {
            instance_name: request.instance_name,
            external_ip,
            zone: request.zone,
            machine_type: request.machine_type,
        })
    }
}
