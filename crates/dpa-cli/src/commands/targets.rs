//! Controller status commands

use anyhow::Result;
use colored::Colorize;
use dpa_lib::cycle::TargetSummary;
use tabled::{settings::Style, Table, Tabled};

use crate::client::{split_target_key, ApiClient};
use crate::output::{
    color_direction, color_phase, format_cpu, format_memory, format_rate, format_time,
    print_info, print_json, print_warning, OutputFormat,
};

/// Row for the targets table
#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Replicas")]
    replicas: i32,
    #[tabled(rename = "Current")]
    current_rate: String,
    #[tabled(rename = "Predicted")]
    predicted_rate: String,
    #[tabled(rename = "Bottleneck")]
    bottleneck: String,
    #[tabled(rename = "Max/Pod")]
    max_per_pod: String,
    #[tabled(rename = "Last Decision")]
    decision: String,
    #[tabled(rename = "Phase")]
    phase: String,
}

impl From<&TargetSummary> for TargetRow {
    fn from(summary: &TargetSummary) -> Self {
        let status = &summary.status;
        let dash = || "-".to_string();
        Self {
            target: summary.target.key(),
            replicas: summary.target.replicas,
            current_rate: status
                .last_forecast
                .map(|f| format_rate(f.current_rate))
                .unwrap_or_else(dash),
            predicted_rate: status
                .last_forecast
                .map(|f| format_rate(f.predicted_rate))
                .unwrap_or_else(dash),
            bottleneck: status
                .last_capacity
                .map(|c| c.bottleneck.to_string())
                .unwrap_or_else(dash),
            max_per_pod: status
                .last_capacity
                .map(|c| c.max_workload_per_pod.to_string())
                .unwrap_or_else(dash),
            decision: status
                .last_decision
                .map(|d| {
                    format!(
                        "{} -> {} ({})",
                        d.current_replicas,
                        d.target_replicas,
                        color_direction(d.direction.as_str())
                    )
                })
                .unwrap_or_else(dash),
            phase: status
                .last_phase
                .and_then(|p| serde_json::to_value(p).ok())
                .and_then(|v| v.as_str().map(color_phase))
                .unwrap_or_else(dash),
        }
    }
}

/// List all monitored targets
pub async fn list_targets(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let targets = client.list_targets().await?;

    match format {
        OutputFormat::Json => print_json(&targets)?,
        OutputFormat::Table => {
            if targets.is_empty() {
                print_warning("The controller is not monitoring any targets");
                return Ok(());
            }
            let rows: Vec<TargetRow> = targets.iter().map(TargetRow::from).collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
            println!("\nTotal: {} targets", targets.len());
        }
    }

    Ok(())
}

/// Show one target in detail
pub async fn show_target(client: &ApiClient, key: &str, format: OutputFormat) -> Result<()> {
    let (namespace, name) = split_target_key(key)?;
    let summary = client.get_target(&namespace, &name).await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => print_summary(&summary),
    }

    Ok(())
}

fn print_summary(summary: &TargetSummary) {
    let target = &summary.target;
    let status = &summary.status;

    println!("{}", "Target Status".bold());
    println!("{}", "=".repeat(50));
    println!("Target:       {}", target.key().cyan());
    println!("Replicas:     {}", target.replicas);
    println!("Scrape URL:   {}", target.scrape_url);
    println!(
        "Limits:       cpu {}, memory {}",
        target.limits.cpu_millicores.map(format_cpu).unwrap_or_else(|| "unset".to_string()),
        target.limits.memory_mib.map(format_memory).unwrap_or_else(|| "unset".to_string()),
    );
    match target.request_cost {
        Some(cost) => println!(
            "Per request:  cpu {}, memory {}",
            format_cpu(cost.cpu_millicores),
            format_memory(cost.memory_mib)
        ),
        None => print_warning("No per-request cost configured, run `dpa calibrate` first"),
    }

    println!();
    println!("Cycles run:   {}", status.cycles);
    println!("Last cycle:   {}", format_time(status.last_cycle_at));
    println!("Last scaled:  {}", format_time(status.last_scale_time));

    if let Some(forecast) = status.last_forecast {
        println!(
            "Forecast:     current {} -> predicted {}",
            format_rate(forecast.current_rate),
            format_rate(forecast.predicted_rate)
        );
    }
    if let Some(capacity) = status.last_capacity {
        println!(
            "Capacity:     {} per pod ({}-bound)",
            capacity.max_workload_per_pod, capacity.bottleneck
        );
    }
    if let Some(decision) = status.last_decision {
        println!(
            "Decision:     {} -> {} replicas ({}, {} pods predicted)",
            decision.current_replicas,
            decision.target_replicas,
            color_direction(decision.direction.as_str()),
            decision.predicted_pods
        );
    }
    match &status.last_error {
        Some(error) => println!("Last error:   {}", error.red()),
        None => print_info("Last cycle completed without errors"),
    }
}
