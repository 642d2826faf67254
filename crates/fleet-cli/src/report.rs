use fleet_infra::types::InstanceTemplate;
use fleet_infra::{Error, ProvisionReport, UnitOutcome};
use serde::Serialize;

use crate::error::CliError;

/// One row of the final report.
#[derive(Debug, Serialize)]
struct UnitRow<'a> {
    index: usize,
    batch: usize,
    instance_name: &'a str,
    status: &'static str,
    external_ip: Option<&'a str>,
    zone: &'a str,
    machine_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> UnitRow<'a> {
    fn new(outcome: &'a UnitOutcome, template: &'a InstanceTemplate) -> Self {
        let (status, external_ip, zone, machine_type, error) = match &outcome.result {
            Ok(instance) => (
                "ready",
                instance.external_ip.as_deref(),
                instance.zone.as_str(),
                instance.machine_type.as_str(),
                None,
            ),
            Err(Error::Cancelled) => (
                "cancelled",
                None,
                template.zone.as_str(),
                template.machine_type.as_str(),
                None,
            ),
            Err(e) => (
                "failed",
                None,
                template.zone.as_str(),
                template.machine_type.as_str(),
                Some(e.to_string()),
            ),
        };

        Self {
            index: outcome.index,
            batch: outcome.batch,
            instance_name: &outcome.instance_name,
            status,
            external_ip,
            zone,
            machine_type,
            error,
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    batches: usize,
    cancelled: bool,
    ready: usize,
    failed: usize,
    instances: Vec<UnitRow<'a>>,
}

fn rows<'a>(report: &'a ProvisionReport, template: &'a InstanceTemplate) -> Vec<UnitRow<'a>> {
    report
        .outcomes
        .iter()
        .map(|o| UnitRow::new(o, template))
        .collect()
}

pub fn render_json(report: &ProvisionReport, template: &InstanceTemplate) -> Result<String, CliError> {
    let instances = rows(report, template);
    let ready = report.provisioned().count();
    let out = JsonReport {
        batches: report.batches,
        cancelled: report.cancelled,
        ready,
        failed: instances.len() - ready,
        instances,
    };
    Ok(serde_json::to_string_pretty(&out)?)
}

pub fn render_table(report: &ProvisionReport, template: &InstanceTemplate) -> String {
    const HEADERS: [&str; 6] = ["Status", "Instance Name", "External IP", "Zone", "Machine Type", "Error"];

    let cells: Vec<[String; 6]> = rows(report, template)
        .into_iter()
        .map(|r| {
            [
                r.status.to_string(),
                r.instance_name.to_string(),
                r.external_ip.unwrap_or("-").to_string(),
                r.zone.to_string(),
                r.machine_type.to_string(),
                r.error.unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(display_width);
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(display_width(cell));
        }
    }

    let mut out = String::from("Proxy instances:\n");
    push_row(&mut out, &HEADERS, &widths);
    push_row(&mut out, &widths.map(|w| "-".repeat(w)), &widths);
    for row in &cells {
        push_row(&mut out, row, &widths);
    }

    let ready = report.provisioned().count();
    out.push_str(&format!(
        "\n{ready} of {} instances ready",
        report.outcomes.len()
    ));
    if ready < report.outcomes.len() {
        out.push_str(&format!(", {} not provisioned", report.outcomes.len() - ready));
    }
    if report.cancelled {
        out.push_str(" (run was cancelled)");
    }
    out
}

fn push_row<S: AsRef<str>>(out: &mut String, row: &[S], widths: &[usize]) {
    let line = row
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{:w$}", cell.as_ref(), w = *w))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}
