//! Offline capacity and scaling policy planning

use anyhow::{Context, Result};
use colored::Colorize;
use dpa_lib::quantity::{parse_cpu_millicores, parse_memory_mib};
use dpa_lib::scaling::{max_throughput_per_pod, ScalingPolicy};
use dpa_lib::{Capacity, RequestCost, ResourceLimits, ScalingDecision};

use crate::output::{color_direction, format_cpu, format_memory, print_json, print_success, OutputFormat};

/// Inputs of the capacity model as given on the command line
#[derive(Debug, Clone)]
pub struct CapacityInput {
    pub cpu_limit: String,
    pub memory_limit: String,
    pub cpu_per_request: f64,
    pub memory_per_request: f64,
    pub workload: i64,
}

/// Compute the bottleneck and per-pod capacity for the given inputs
pub fn compute_capacity(input: &CapacityInput) -> Result<Capacity> {
    let limits = ResourceLimits {
        cpu_millicores: Some(parse_cpu_millicores(&input.cpu_limit).context("Invalid --cpu-limit")?),
        memory_mib: Some(parse_memory_mib(&input.memory_limit).context("Invalid --memory-limit")?),
    };
    let cost = RequestCost {
        cpu_millicores: input.cpu_per_request,
        memory_mib: input.memory_per_request,
    };
    Ok(max_throughput_per_pod("cli", &limits, Some(&cost), input.workload)?)
}

pub fn show_capacity(input: &CapacityInput, format: OutputFormat) -> Result<()> {
    let capacity = compute_capacity(input)?;

    match format {
        OutputFormat::Json => print_json(&capacity)?,
        OutputFormat::Table => {
            let (limit, cost) = match capacity.bottleneck {
                dpa_lib::Bottleneck::Cpu => (
                    format_cpu(parse_cpu_millicores(&input.cpu_limit)?),
                    format_cpu(input.cpu_per_request),
                ),
                dpa_lib::Bottleneck::Memory => (
                    format_memory(parse_memory_mib(&input.memory_limit)?),
                    format_memory(input.memory_per_request),
                ),
            };
            println!("{}", "Per-Pod Capacity".bold());
            println!("{}", "=".repeat(40));
            println!("Bottleneck:        {}", capacity.bottleneck.to_string().cyan());
            println!("Limit:             {}", limit);
            println!("Cost per request:  {}", cost);
            println!("Current workload:  {}", input.workload);
            println!();
            print_success(&format!(
                "One pod sustains a workload of {}",
                capacity.max_workload_per_pod
            ));
        }
    }

    Ok(())
}

/// Run the scaling policy for the given inputs
pub fn show_decision(
    replicas: i32,
    max_per_pod: i64,
    predicted: i64,
    policy: ScalingPolicy,
    format: OutputFormat,
) -> Result<()> {
    if !(0.0..=1.0).contains(&policy.reduction_ratio) {
        anyhow::bail!("--reduction-ratio must be within [0, 1]");
    }
    let decision = policy.decide(replicas, max_per_pod, predicted);

    match format {
        OutputFormat::Json => print_json(&decision)?,
        OutputFormat::Table => print_decision(&decision),
    }

    Ok(())
}

fn print_decision(decision: &ScalingDecision) {
    println!("{}", "Scaling Decision".bold());
    println!("{}", "=".repeat(40));
    println!("Current replicas:  {}", decision.current_replicas);
    println!("Predicted pods:    {}", decision.predicted_pods);
    println!("Target replicas:   {}", decision.target_replicas);
    println!("Direction:         {}", color_direction(decision.direction.as_str()));
    if decision.scaled && decision.target_replicas == decision.current_replicas {
        println!("{}", "Surplus too small to remove a pod this cycle".dimmed());
    }
}
