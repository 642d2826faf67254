use std::collections::BTreeMap;

use serde::Serialize;

/// Access config that carries an instance's ephemeral external IP on GCE.
pub const EXTERNAL_NAT: &str = "External NAT";

/// Metadata key the guest agent executes on first boot.
pub const STARTUP_SCRIPT_KEY: &str = "startup-script";

/// Image family the boot disk is created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootImage {
    pub project: String,
    pub family: String,
}

impl BootImage {
    pub fn source_image(&self) -> String {
        format!("projects/{}/global/images/family/{}", self.project, self.family)
    }
}

/// What every instance in a run looks like.
#[derive(Debug, Clone)]
pub struct InstanceTemplate {
    pub name_prefix: String,
    pub zone: String,
    pub machine_type: String,
    pub boot_image: BootImage,
    pub startup_script: String,
    pub preemptible: bool,
}

/// Provider-neutral description of one instance to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    pub instance_name: String,
    pub zone: String,
    /// Bare machine type, e.g. `f1-micro`.
    pub machine_type: String,
    /// Zone-qualified reference, e.g. `zones/us-central1-a/machineTypes/f1-micro`.
    pub machine_type_ref: String,
    pub boot_disk: BootDisk,
    pub network_interface: NetworkInterfaceSpec,
    pub metadata: BTreeMap<String, String>,
    pub preemptible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootDisk {
    pub source_image: String,
    pub persistent: bool,
    pub auto_delete: bool,
    pub boot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterfaceSpec {
    pub network: String,
    /// Name of the ephemeral external-IP access config, if one is requested.
    pub external_access: Option<String>,
}

/// Status of a provider-side asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
}

/// Handle for an in-flight creation, as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub id: String,
    pub zone: String,
    pub status: OperationStatus,
    pub error: Option<String>,
}

/// Live view of a created instance.
#[derive(Debug, Clone, Default)]
pub struct InstanceDetails {
    pub name: String,
    pub network_interfaces: Vec<InterfaceDetails>,
}

#[derive(Debug, Clone, Default)]
pub struct InterfaceDetails {
    pub access_configs: Vec<AccessConfigDetails>,
}

#[derive(Debug, Clone, Default)]
pub struct AccessConfigDetails {
    pub name: String,
    pub nat_ip: Option<String>,
}

impl InstanceDetails {
    /// NAT IP of the first access config named `access_config`.
    pub fn external_ip(&self, access_config: &str) -> Option<String> {
        self.network_interfaces
            .iter()
            .flat_map(|iface| iface.access_configs.iter())
            .find(|ac| ac.name == access_config)
            .and_then(|ac| ac.nat_ip.clone())
    }
}

/// A successfully provisioned instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedInstance {
    pub instance_name: String,
    pub external_ip: Option<String>,
    pub zone: String,
    pub machine_type: String,
}
