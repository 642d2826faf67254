//! Typed Rust client for the Compute Engine v1 REST API.
//!
//! Covers the subset needed for provisioning proxy VMs:
//! instances (insert, get) and zone operations (get).

pub mod auth;
mod types;

use std::sync::Arc;

pub use types::*;

use crate::auth::TokenProvider;

pub const BASE_URL: &str = "https://compute.googleapis.com/compute/v1";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("gce api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gce api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("gce auth failed: {0}")]
    Auth(String),

    #[error("jwt signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the Compute Engine REST API, scoped to one project.
#[derive(Clone)]
pub struct GceClient {
    project: String,
    base_url: String,
    credentials: Arc<dyn TokenProvider>,
    http: reqwest::Client,
}

impl GceClient {
    pub fn new(project: impl Into<String>, credentials: Arc<dyn TokenProvider>) -> Self {
        Self {
            project: project.into(),
            base_url: BASE_URL.to_string(),
            credentials,
            http: reqwest::Client::new(),
        }
    }

    /// Point the client at a different API root (emulators, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, zone: &str, path: &str) -> String {
        format!(
            "{}/projects/{}/zones/{zone}{path}",
            self.base_url, self.project
        )
    }

    async fn auth(&self) -> Result<String> {
        let token = self.credentials.access_token().await?;
        Ok(format!("Bearer {token}"))
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api { endpoint, status, body });
        }
        Ok(resp)
    }

    // ── Instances ────────────────────────────────────────────────────

    /// Submit an `instances.insert` request. The returned operation is
    /// usually still `PENDING` or `RUNNING`.
    pub async fn insert_instance(&self, zone: &str, instance: &Instance) -> Result<Operation> {
        let resp = self
            .http
            .post(self.url(zone, "/instances"))
            .header("Authorization", self.auth().await?)
            .json(instance)
            .send()
            .await?;

        Self::check(resp, "insert instance")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn get_instance(&self, zone: &str, name: &str) -> Result<Instance> {
        let resp = self
            .http
            .get(self.url(zone, &format!("/instances/{name}")))
            .header("Authorization", self.auth().await?)
            .send()
            .await?;

        Self::check(resp, "get instance")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    // ── Zone operations ──────────────────────────────────────────────

    pub async fn get_zone_operation(&self, zone: &str, operation: &str) -> Result<Operation> {
        let resp = self
            .http
            .get(self.url(zone, &format!("/operations/{operation}")))
            .header("Authorization", self.auth().await?)
            .send()
            .await?;

        Self::check(resp, "get zone operation")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }
}
