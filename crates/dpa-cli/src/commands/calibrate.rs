//! Per-request cost calibration from a benchmark report

use anyhow::{Context, Result};
use colored::Colorize;
use dpa_lib::scaling::{average_usage, per_request_cost, BenchmarkReport, ResourceUsage};
use dpa_lib::RequestCost;
use serde::Serialize;
use std::path::Path;

use crate::output::{format_cpu, format_memory, print_json, print_warning, OutputFormat};

#[derive(Debug, Serialize)]
struct Calibration {
    completed_requests: u64,
    failed_requests: u64,
    average_usage: ResourceUsage,
    per_request: RequestCost,
}

pub fn read_report(path: &Path) -> Result<BenchmarkReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read benchmark report {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse benchmark report")
}

/// Derive per-request cost from a benchmark report
pub fn calibrate(path: &Path, format: OutputFormat) -> Result<()> {
    let report = read_report(path)?;
    let calibration = Calibration {
        completed_requests: report.completed_requests,
        failed_requests: report.failed_requests,
        average_usage: average_usage(&report.usage)?,
        per_request: per_request_cost(&report)?,
    };

    match format {
        OutputFormat::Json => print_json(&calibration)?,
        OutputFormat::Table => {
            println!("{}", "Benchmark Calibration".bold());
            println!("{}", "=".repeat(40));
            println!("Completed requests:  {}", calibration.completed_requests);
            println!("Failed requests:     {}", calibration.failed_requests);
            println!(
                "Average usage:       cpu {}, memory {}",
                format_cpu(calibration.average_usage.cpu_millicores),
                format_memory(calibration.average_usage.memory_mib)
            );
            if calibration.failed_requests > 0 {
                print_warning("Failed requests are excluded from the per-request cost");
            }
            println!();
            println!("{}", "Add to the target's controller config:".bold());
            println!(
                "cpu_per_request_millicores = {}",
                calibration.per_request.cpu_millicores
            );
            println!(
                "memory_per_request_mib = {}",
                calibration.per_request.memory_mib
            );
        }
    }

    Ok(())
}
