use std::path::Path;

use crate::error::CliError;

/// Installs Squid, allows all clients, and restarts it.
pub const DEFAULT_STARTUP_SCRIPT: &str = r#"#!/bin/bash
sudo apt-get update
sudo apt-get install -y squid
sudo sed -i "s/http_access deny all/http_access allow all/" /etc/squid/squid.conf
sudo systemctl restart squid
"#;

pub fn load(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        None => Ok(DEFAULT_STARTUP_SCRIPT.to_string()),
        Some(path) => std::fs::read_to_string(path).map_err(|source| CliError::StartupScript {
            path: path.to_path_buf(),
            source,
        }),
    }
}
