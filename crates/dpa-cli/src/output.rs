//! Output formatting utilities

use chrono::{TimeZone, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a rate with at most two decimals
pub fn format_rate(rate: f64) -> String {
    if rate.fract() == 0.0 {
        format!("{:.0}", rate)
    } else {
        format!("{:.2}", rate)
    }
}

/// Format millicores as a CPU quantity
pub fn format_cpu(millicores: f64) -> String {
    if millicores >= 1000.0 {
        format!("{:.1}", millicores / 1000.0)
    } else {
        format!("{}m", format_rate(millicores))
    }
}

/// Format MiB as a memory quantity
pub fn format_memory(mib: f64) -> String {
    if mib >= 1024.0 {
        format!("{:.2}Gi", mib / 1024.0)
    } else {
        format!("{}Mi", format_rate(mib))
    }
}

/// Format unix seconds as RFC 3339, `-` when absent
pub fn format_time(unix_secs: Option<i64>) -> String {
    unix_secs
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Color a scale direction
pub fn color_direction(direction: &str) -> String {
    match direction {
        "up" => direction.green().to_string(),
        "down" => direction.yellow().to_string(),
        _ => direction.to_string(),
    }
}

/// Color a cycle phase
pub fn color_phase(phase: &str) -> String {
    match phase {
        "applied" => phase.green().to_string(),
        "decided" => phase.blue().to_string(),
        "skipped" => phase.red().to_string(),
        _ => phase.to_string(),
    }
}
