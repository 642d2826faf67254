use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use fleet_infra::types::{BootImage, InstanceTemplate};
use fleet_infra::{PollPolicy, ProvisionConfig};

use crate::error::CliError;
use crate::script;

#[derive(Parser, Debug)]
#[command(
    name = "squid-fleet",
    about = "Provision a fleet of Squid proxy VMs on Compute Engine"
)]
pub struct Cli {
    /// Google Cloud project ID
    #[arg(long, env = "GCE_PROJECT")]
    pub project: Option<String>,

    #[arg(long, env = "FLEET_ZONE")]
    pub zone: Option<String>,

    /// Instances are named `<prefix>-1`, `<prefix>-2`, ...
    #[arg(long, env = "FLEET_NAME_PREFIX")]
    pub name_prefix: Option<String>,

    #[arg(long, env = "FLEET_COUNT", default_value_t = 100)]
    pub count: usize,

    #[arg(long, env = "FLEET_BATCH_SIZE", default_value_t = 2)]
    pub batch_size: usize,

    #[arg(long, env = "FLEET_MACHINE_TYPE")]
    pub machine_type: Option<String>,

    #[arg(long, env = "FLEET_IMAGE_FAMILY")]
    pub image_family: Option<String>,

    #[arg(long, env = "FLEET_IMAGE_PROJECT")]
    pub image_project: Option<String>,

    /// Replaces the built-in Squid install script
    #[arg(long, env = "FLEET_STARTUP_SCRIPT")]
    pub startup_script_file: Option<PathBuf>,

    /// Create standard VMs instead of preemptible ones
    #[arg(long)]
    pub no_preemptible: bool,

    /// Create the instances of a batch concurrently
    #[arg(long)]
    pub parallel: bool,

    #[arg(long, env = "FLEET_INTER_BATCH_DELAY_SECS", default_value_t = 60)]
    pub inter_batch_delay_secs: u64,

    /// Give up on an instance whose create operation is not done by then
    #[arg(long, env = "FLEET_OPERATION_TIMEOUT_SECS", default_value_t = 600)]
    pub operation_timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Fail on missing values instead of prompting for them
    #[arg(long)]
    pub no_prompt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone)]
pub struct FleetConfig {
    pub project: String,
    pub template: InstanceTemplate,
    pub count: usize,
    pub provision: ProvisionConfig,
    pub output: OutputFormat,
}

/// Asks for values that were not given as flags or env vars.
pub struct Prompter<R, W> {
    input: R,
    output: W,
    enabled: bool,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W, enabled: bool) -> Self {
        Self {
            input,
            output,
            enabled,
        }
    }

    fn value(
        &mut self,
        given: Option<String>,
        label: &'static str,
        example: &str,
    ) -> Result<String, CliError> {
        if let Some(v) = given
            && !v.trim().is_empty()
        {
            return Ok(v.trim().to_string());
        }
        if !self.enabled {
            return Err(CliError::Missing(label));
        }

        loop {
            write!(self.output, "Enter {label} (e.g., {example}): ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(CliError::Missing(label));
            }
            let line = line.trim();
            if !line.is_empty() {
                return Ok(line.to_string());
            }
        }
    }
}

impl FleetConfig {
    pub fn resolve<R: BufRead, W: Write>(
        cli: Cli,
        prompter: &mut Prompter<R, W>,
    ) -> Result<Self, CliError> {
        let project = prompter.value(cli.project, "your Google Cloud project ID", "my-project")?;
        let zone = prompter.value(cli.zone, "the zone", "us-central1-a")?;
        let name_prefix =
            prompter.value(cli.name_prefix, "the base name for the instances", "proxy")?;
        let machine_type = prompter.value(cli.machine_type, "the machine type", "f1-micro")?;
        let family = prompter.value(cli.image_family, "the image family", "debian-12")?;
        let image_project = prompter.value(cli.image_project, "the image project", "debian-cloud")?;
        let startup_script = script::load(cli.startup_script_file.as_deref())?;

        Ok(Self {
            project,
            template: InstanceTemplate {
                name_prefix,
                zone,
                machine_type,
                boot_image: BootImage {
                    project: image_project,
                    family,
                },
                startup_script,
                preemptible: !cli.no_preemptible,
            },
            count: cli.count,
            provision: ProvisionConfig {
                batch_size: cli.batch_size,
                inter_batch_delay: Duration::from_secs(cli.inter_batch_delay_secs),
                poll: PollPolicy {
                    max_wait: Duration::from_secs(cli.operation_timeout_secs),
                    ..PollPolicy::default()
                },
                parallel: cli.parallel,
            },
            output: cli.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("squid-fleet").chain(args.iter().copied())).unwrap()
    }

    fn full_args() -> Vec<&'static str> {
        vec![
            "--project",
            "proxy-project",
            "--zone",
            "europe-west1-b",
            "--name-prefix",
            "squid",
            "--machine-type",
            "e2-micro",
            "--image-family",
            "debian-12",
            "--image-project",
            "debian-cloud",
        ]
    }

    #[test]
    fn flags_fill_the_template_without_prompting() {
        let mut args = full_args();
        args.extend(["--count", "5", "--batch-size", "3", "--parallel", "--output", "json"]);

        let mut out = Vec::new();
        let mut prompter = Prompter::new(Cursor::new(""), &mut out, true);
        let config = FleetConfig::resolve(cli(&args), &mut prompter).unwrap();

        assert!(out.is_empty());
        assert_eq!(config.project, "proxy-project");
        assert_eq!(config.template.zone, "europe-west1-b");
        assert_eq!(config.template.name_prefix, "squid");
        assert_eq!(config.template.machine_type, "e2-micro");
        assert_eq!(config.template.boot_image.family, "debian-12");
        assert!(config.template.preemptible);
        assert!(config.template.startup_script.contains("squid"));
        assert_eq!(config.count, 5);
        assert_eq!(config.provision.batch_size, 3);
        assert!(config.provision.parallel);
        assert_eq!(config.output, OutputFormat::Json);
    }

    #[test]
    fn defaults_follow_the_reference_run() {
        let mut prompter = Prompter::new(Cursor::new(""), Vec::new(), false);
        let config = FleetConfig::resolve(cli(&full_args()), &mut prompter).unwrap();

        assert_eq!(config.count, 100);
        assert_eq!(config.provision.batch_size, 2);
        assert_eq!(config.provision.inter_batch_delay, Duration::from_secs(60));
        assert_eq!(config.provision.poll.max_wait, Duration::from_secs(600));
        assert!(!config.provision.parallel);
        assert_eq!(config.output, OutputFormat::Table);
    }

    #[test]
    fn missing_values_are_prompted_for() {
        let args = [
            "--project",
            "proxy-project",
            "--machine-type",
            "e2-micro",
            "--image-family",
            "debian-12",
            "--image-project",
            "debian-cloud",
        ];
        let mut out = Vec::new();
        let mut prompter = Prompter::new(Cursor::new("\nus-east1-b\n  edge  \n"), &mut out, true);
        let config = FleetConfig::resolve(cli(&args), &mut prompter).unwrap();

        assert_eq!(config.template.zone, "us-east1-b");
        assert_eq!(config.template.name_prefix, "edge");

        let shown = String::from_utf8(out).unwrap();
        assert_eq!(shown.matches("Enter the zone").count(), 2);
        assert!(shown.contains("Enter the base name for the instances (e.g., proxy): "));
    }

    #[test]
    fn missing_value_without_prompt_is_an_error() {
        let mut prompter = Prompter::new(Cursor::new(""), Vec::new(), false);
        let err = FleetConfig::resolve(cli(&["--zone", "us-central1-a"]), &mut prompter)
            .unwrap_err();
        assert!(matches!(err, CliError::Missing("your Google Cloud project ID")));
    }

    #[test]
    fn eof_while_prompting_is_an_error() {
        let mut prompter = Prompter::new(Cursor::new(""), Vec::new(), true);
        let err = FleetConfig::resolve(cli(&[]), &mut prompter).unwrap_err();
        assert!(matches!(err, CliError::Missing(_)));
    }

    #[test]
    fn no_preemptible_flag_creates_standard_vms() {
        let mut args = full_args();
        args.push("--no-preemptible");
        let mut prompter = Prompter::new(Cursor::new(""), Vec::new(), false);
        let config = FleetConfig::resolve(cli(&args), &mut prompter).unwrap();
        assert!(!config.template.preemptible);
    }
}
