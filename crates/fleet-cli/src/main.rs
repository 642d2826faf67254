mod config;
mod error;
mod report;
mod script;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use fleet_infra::Provisioner;
use fleet_infra::gce::GceProvider;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, FleetConfig, OutputFormat, Prompter};
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!(error = %e, "squid-fleet failed");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every instance was provisioned.
async fn run(cli: Cli) -> Result<bool, CliError> {
    let config = {
        let prompt = !cli.no_prompt;
        let mut prompter = Prompter::new(std::io::stdin().lock(), std::io::stderr(), prompt);
        FleetConfig::resolve(cli, &mut prompter)?
    };

    tracing::info!(
        project = %config.project,
        zone = %config.template.zone,
        machine_type = %config.template.machine_type,
        count = config.count,
        batch_size = config.provision.batch_size,
        "configuration resolved"
    );

    let provider = Arc::new(GceProvider::from_env_for_project(&config.project)?);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, letting in-flight instances finish");
                cancel.cancel();
            }
        });
    }

    let provisioner = Provisioner::new(provider.clone(), provider, config.provision.clone());
    let report = provisioner
        .provision(&config.template, config.count, &cancel)
        .await?;

    let rendered = match config.output {
        OutputFormat::Table => report::render_table(&report, &config.template),
        OutputFormat::Json => report::render_json(&report, &config.template)?,
    };
    println!("{rendered}");

    Ok(report.all_succeeded())
}
