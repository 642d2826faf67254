use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("no value for {0} (pass the flag, set its env var, or answer the prompt)")]
    Missing(&'static str),

    #[error("failed to read startup script {path}: {source}")]
    StartupScript {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("infra error: {0}")]
    Infra(#[from] fleet_infra::Error),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}
