//! Scripted in-memory cloud for exercising the provisioner.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::types::{
    AccessConfigDetails, EXTERNAL_NAT, InstanceDetails, InstanceRequest, InterfaceDetails,
    OperationHandle, OperationStatus,
};
use crate::{InstanceService, OperationService, Result};

/// How the fake cloud treats one instance name.
#[derive(Debug, Clone)]
pub(crate) struct UnitScript {
    /// HTTP status and body returned by `create_instance`.
    create_error: Option<(u16, String)>,
    /// Polls answered with `RUNNING` before the terminal answer; `None` never ends.
    pending_polls: Option<u32>,
    op_error: Option<String>,
    hang: bool,
    nat: bool,
}

impl Default for UnitScript {
    fn default() -> Self {
        Self {
            create_error: None,
            pending_polls: Some(0),
            op_error: None,
            hang: false,
            nat: true,
        }
    }
}

impl UnitScript {
    pub(crate) fn done_after(pending: u32) -> Self {
        Self {
            pending_polls: Some(pending),
            ..Self::default()
        }
    }

    pub(crate) fn fails_after(pending: u32, message: &str) -> Self {
        Self {
            pending_polls: Some(pending),
            op_error: Some(message.into()),
            ..Self::default()
        }
    }

    pub(crate) fn never_done() -> Self {
        Self {
            pending_polls: None,
            ..Self::default()
        }
    }

    pub(crate) fn hangs() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub(crate) fn create_fails(status: u16, body: &str) -> Self {
        Self {
            create_error: Some((status, body.into())),
            ..Self::default()
        }
    }

    pub(crate) fn without_nat() -> Self {
        Self {
            nat: false,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, UnitScript>,
    created: Vec<(String, Instant)>,
    polls: HashMap<String, u32>,
}

pub(crate) struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub(crate) fn script(&self, instance: &str, script: UnitScript) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(instance.to_string(), script);
    }

    /// Names passed to `create_instance`, in call order.
    pub(crate) fn created(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .created
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub(crate) fn created_at(&self) -> Vec<Instant> {
        self.state
            .lock()
            .unwrap()
            .created
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    pub(crate) fn polls(&self, instance: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .polls
            .get(instance)
            .copied()
            .unwrap_or(0)
    }

    fn script_for(&self, instance: &str) -> UnitScript {
        self.state
            .lock()
            .unwrap()
            .scripts
            .get(instance)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn ip_for(instance: &str) -> String {
        let n: u32 = instance
            .rsplit('-')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        format!("203.0.113.{n}")
    }
}

#[async_trait]
impl InstanceService for FakeCloud {
    async fn create_instance(&self, request: &InstanceRequest) -> Result<OperationHandle> {
        let script = self.script_for(&request.instance_name);
        self.state
            .lock()
            .unwrap()
            .created
            .push((request.instance_name.clone(), Instant::now()));

        if let Some((status, body)) = script.create_error {
            return Err(gce_api::Error::Api {
                endpoint: "insert instance",
                status: reqwest::StatusCode::from_u16(status).unwrap(),
                body,
            }
            .into());
        }

        Ok(OperationHandle {
            id: format!("op-{}", request.instance_name),
            zone: request.zone.clone(),
            status: OperationStatus::Pending,
            error: None,
        })
    }

    async fn get_instance(&self, _zone: &str, name: &str) -> Result<InstanceDetails> {
        let script = self.script_for(name);
        let access_configs = if script.nat {
            vec![AccessConfigDetails {
                name: EXTERNAL_NAT.into(),
                nat_ip: Some(Self::ip_for(name)),
            }]
        } else {
            vec![AccessConfigDetails {
                name: "custom-nat".into(),
                nat_ip: Some(Self::ip_for(name)),
            }]
        };

        Ok(InstanceDetails {
            name: name.to_string(),
            network_interfaces: vec![InterfaceDetails { access_configs }],
        })
    }
}

#[async_trait]
impl OperationService for FakeCloud {
    async fn get_operation(&self, operation: &OperationHandle) -> Result<OperationHandle> {
        let instance = operation
            .id
            .strip_prefix("op-")
            .unwrap_or(&operation.id)
            .to_string();
        let script = self.script_for(&instance);
        if script.hang {
            std::future::pending::<()>().await;
        }

        let polls = {
            let mut state = self.state.lock().unwrap();
            let count = state.polls.entry(instance).or_insert(0);
            *count += 1;
            *count
        };

        let mut current = operation.clone();
        match script.pending_polls {
            Some(pending) if polls > pending => {
                current.status = OperationStatus::Done;
                current.error = script.op_error;
            }
            _ => current.status = OperationStatus::Running,
        }
        Ok(current)
    }
}
