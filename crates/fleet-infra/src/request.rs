use std::collections::BTreeMap;

use crate::types::{
    BootDisk, EXTERNAL_NAT, InstanceRequest, InstanceTemplate, NetworkInterfaceSpec,
    STARTUP_SCRIPT_KEY,
};
use crate::{Error, Result};

const DEFAULT_NETWORK: &str = "global/networks/default";

impl InstanceTemplate {
    /// Reject templates that would produce unusable requests.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name prefix", &self.name_prefix),
            ("zone", &self.zone),
            ("machine type", &self.machine_type),
            ("image project", &self.boot_image.project),
            ("image family", &self.boot_image.family),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidTemplate(format!("{field} is empty")));
            }
        }
        Ok(())
    }

    pub fn instance_name(&self, index: usize) -> String {
        format!("{}-{index}", self.name_prefix)
    }
}

/// Build the request for the `index`-th instance (1-based) of a run.
pub fn build_request(template: &InstanceTemplate, index: usize) -> Result<InstanceRequest> {
    template.validate()?;
    if index == 0 {
        return Err(Error::InvalidTemplate("instance index starts at 1".into()));
    }

    let mut metadata = BTreeMap::new();
    metadata.insert(
        STARTUP_SCRIPT_KEY.to_string(),
        template.startup_script.clone(),
    );

    Ok(InstanceRequest {
        instance_name: template.instance_name(index),
        zone: template.zone.clone(),
        machine_type: template.machine_type.clone(),
        machine_type_ref: format!(
            "zones/{}/machineTypes/{}",
            template.zone, template.machine_type
        ),
        boot_disk: BootDisk {
            source_image: template.boot_image.source_image(),
            persistent: true,
            auto_delete: true,
            boot: true,
        },
        network_interface: NetworkInterfaceSpec {
            network: DEFAULT_NETWORK.to_string(),
            external_access: Some(EXTERNAL_NAT.to_string()),
        },
        metadata,
        preemptible: template.preemptible,
    })
}
