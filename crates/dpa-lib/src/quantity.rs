//! Kubernetes resource quantity parsing
//!
//! Limits are handled internally as CPU millicores and memory MiB.

use anyhow::{bail, Context, Result};

const MIB: f64 = 1024.0 * 1024.0;

/// Parse a CPU quantity ("500m", "2", "0.25") into millicores
pub fn parse_cpu_millicores(quantity: &str) -> Result<f64> {
    let q = quantity.trim();
    if q.is_empty() {
        bail!("Empty CPU quantity");
    }

    let millicores = if let Some(milli) = q.strip_suffix('m') {
        parse_number(milli, quantity)?
    } else {
        parse_number(q, quantity)? * 1000.0
    };

    if millicores < 0.0 {
        bail!("Negative CPU quantity: {}", quantity);
    }
    Ok(millicores)
}

/// Parse a memory quantity ("256Mi", "1Gi", "512M", "1048576") into MiB
///
/// Accepts the binary suffixes `Ki` to `Ei`, the decimal suffixes `k` to `E`
/// and `m` (thousandths of a byte).
pub fn parse_memory_mib(quantity: &str) -> Result<f64> {
    let q = quantity.trim();
    if q.is_empty() {
        bail!("Empty memory quantity");
    }

    // Binary suffixes first so that "Mi" is not read as "M"
    const SUFFIXES: &[(&str, f64)] = &[
        ("Ki", 1024.0),
        ("Mi", MIB),
        ("Gi", MIB * 1024.0),
        ("Ti", MIB * 1024.0 * 1024.0),
        ("Pi", MIB * MIB * 1024.0),
        ("Ei", MIB * MIB * MIB),
        ("m", 1e-3),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
        ("E", 1e18),
    ];

    let bytes = SUFFIXES
        .iter()
        .find_map(|(suffix, factor)| q.strip_suffix(suffix).map(|n| (n, *factor)))
        .map(|(number, factor)| parse_number(number, quantity).map(|n| n * factor))
        .unwrap_or_else(|| parse_number(q, quantity))?;

    if bytes < 0.0 {
        bail!("Negative memory quantity: {}", quantity);
    }
    Ok(bytes / MIB)
}

fn parse_number(number: &str, original: &str) -> Result<f64> {
    let value: f64 = number
        .parse()
        .with_context(|| format!("Invalid quantity: {}", original))?;
    if !value.is_finite() {
        bail!("Invalid quantity: {}", original);
    }
    Ok(value)
}
