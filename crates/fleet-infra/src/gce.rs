use async_trait::async_trait;
use tracing::info;

use crate::types::{
    AccessConfigDetails, InstanceDetails, InstanceRequest, InterfaceDetails, OperationHandle,
    OperationStatus,
};
use crate::{InstanceService, OperationService, Result};

/// Compute Engine provider.
///
/// Delegates to `gce_api::GceClient` for all HTTP calls.
pub struct GceProvider {
    client: gce_api::GceClient,
}

impl GceProvider {
    pub fn new(client: gce_api::GceClient) -> Self {
        Self { client }
    }

    /// Create for `project`. `GCE_API_BASE_URL` (optional) overrides the
    /// endpoint; credentials as resolved by [`gce_api::auth::from_env`].
    pub fn from_env_for_project(project: impl Into<String>) -> Result<Self> {
        let credentials = gce_api::auth::from_env()?;
        let mut client = gce_api::GceClient::new(project, credentials);
        if let Ok(base) = std::env::var("GCE_API_BASE_URL") {
            client = client.with_base_url(base);
        }
        Ok(Self::new(client))
    }

    fn to_instance(req: &InstanceRequest) -> gce_api::Instance {
        let scheduling = if req.preemptible {
            gce_api::Scheduling {
                preemptible: true,
                automatic_restart: Some(false),
                on_host_maintenance: Some("TERMINATE".into()),
            }
        } else {
            gce_api::Scheduling::default()
        };

        let access_configs = req
            .network_interface
            .external_access
            .iter()
            .map(|name| gce_api::AccessConfig {
                name: Some(name.clone()),
                kind: Some("ONE_TO_ONE_NAT".into()),
                network_tier: Some("PREMIUM".into()),
                nat_ip: None,
            })
            .collect();

        gce_api::Instance {
            name: req.instance_name.clone(),
            zone: Some(req.zone.clone()),
            machine_type: req.machine_type_ref.clone(),
            disks: vec![gce_api::AttachedDisk {
                disk_type: req.boot_disk.persistent.then(|| "PERSISTENT".to_string()),
                boot: req.boot_disk.boot,
                auto_delete: req.boot_disk.auto_delete,
                initialize_params: Some(gce_api::AttachedDiskInitializeParams {
                    source_image: req.boot_disk.source_image.clone(),
                    disk_size_gb: None,
                }),
            }],
            network_interfaces: vec![gce_api::NetworkInterface {
                network: Some(req.network_interface.network.clone()),
                network_ip: None,
                access_configs,
            }],
            metadata: Some(gce_api::Metadata {
                items: req
                    .metadata
                    .iter()
                    .map(|(key, value)| gce_api::MetadataItem {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            }),
            scheduling: Some(scheduling),
            ..Default::default()
        }
    }

    fn to_handle(zone: &str, op: gce_api::Operation) -> OperationHandle {
        let status = match op.status {
            gce_api::OperationStatus::Pending => OperationStatus::Pending,
            gce_api::OperationStatus::Running => OperationStatus::Running,
            gce_api::OperationStatus::Done => OperationStatus::Done,
        };
        OperationHandle {
            id: op.name,
            zone: zone.to_string(),
            status,
            error: op.error.map(|e| e.summary()),
        }
    }

    fn to_details(instance: gce_api::Instance) -> InstanceDetails {
        InstanceDetails {
            name: instance.name,
            network_interfaces: instance
                .network_interfaces
                .into_iter()
                .map(|iface| InterfaceDetails {
                    access_configs: iface
                        .access_configs
                        .into_iter()
                        .map(|ac| AccessConfigDetails {
                            name: ac.name.unwrap_or_default(),
                            nat_ip: ac.nat_ip,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl InstanceService for GceProvider {
    async fn create_instance(&self, request: &InstanceRequest) -> Result<OperationHandle> {
        let op = self
            .client
            .insert_instance(&request.zone, &Self::to_instance(request))
            .await?;

        info!(instance = %request.instance_name, operation = %op.name, "gce: insert accepted");
        Ok(Self::to_handle(&request.zone, op))
    }

    async fn get_instance(&self, zone: &str, name: &str) -> Result<InstanceDetails> {
        let instance = self.client.get_instance(zone, name).await?;
        Ok(Self::to_details(instance))
    }
}

#[async_trait]
impl OperationService for GceProvider {
    async fn get_operation(&self, operation: &OperationHandle) -> Result<OperationHandle> {
        let op = self
            .client
            .get_zone_operation(&operation.zone, &operation.id)
            .await?;
        Ok(Self::to_handle(&operation.zone, op))
    }
}
