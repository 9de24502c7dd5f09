//! In-process ONNX oracle using tract
//!
//! The model takes the normalized window as `f32[1, N, 1]` and its first
//! output value is the normalized prediction.

use super::Oracle;
use crate::error::CycleError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Forecasting model executed inside the controller process
pub struct OnnxOracle {
    model: TractModel,
    window_len: usize,
    checksum: String,
}

impl OnnxOracle {
    /// Load a model from bytes for windows of `window_len` samples
    pub fn from_bytes(model_bytes: &[u8], window_len: usize) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, window_len, 1]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self {
            model,
            window_len,
            checksum: sha256_hex(model_bytes),
        })
    }

    /// Load a model file, verifying its SHA-256 first when one is given
    pub fn from_file(path: &Path, window_len: usize, expected_sha256: Option<&str>) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read model from {:?}", path))?;

        if let Some(expected) = expected_sha256 {
            verify_checksum(&bytes, expected)?;
        }

        let oracle = Self::from_bytes(&bytes, window_len)?;
        info!(
            path = %path.display(),
            checksum = %oracle.checksum,
            window_len = window_len,
            "Loaded forecasting model"
        );
        Ok(oracle)
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    fn run(&self, input: &[f64]) -> Result<Option<f64>> {
        let data: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        let tensor: Tensor = tract_ndarray::Array3::from_shape_vec((1, self.window_len, 1), data)
            .context("Failed to shape model input")?
            .into();

        let result = self.model.run(tvec!(tensor.into()))?;
        let output = result.first().context("No output from model")?;
        let view = output.to_array_view::<f32>()?;
        Ok(view.iter().next().map(|v| f64::from(*v)))
    }
}

#[async_trait]
impl Oracle for OnnxOracle {
    async fn predict(&self, input: &[f64]) -> Result<f64, CycleError> {
        if input.len() != self.window_len {
            return Err(CycleError::OracleProtocolError {
                reason: format!(
                    "model expects {} inputs, got {}",
                    self.window_len,
                    input.len()
                ),
            });
        }

        let start = Instant::now();
        let value = self
            .run(input)
            .map_err(|e| CycleError::OracleUnavailable {
                reason: format!("inference failed: {:#}", e),
            })?
            .ok_or_else(|| CycleError::OracleProtocolError {
                reason: "model produced an empty output".to_string(),
            })?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        if !value.is_finite() {
            return Err(CycleError::OracleProtocolError {
                reason: format!("non-finite prediction: {}", value),
            });
        }
        Ok(value)
    }

    fn describe(&self) -> String {
        format!("onnx:{}", &self.checksum[..12.min(self.checksum.len())])
    }
}

/// Hex-encoded SHA-256 digest
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Check bytes against an expected hex SHA-256 (case-insensitive)
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_hex(bytes);
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        anyhow::bail!(
            "Model checksum mismatch: expected {}, got {}",
            expected.trim(),
            actual
        );
    }
    Ok(())
}
