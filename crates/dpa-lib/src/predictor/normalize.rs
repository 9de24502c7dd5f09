//! Min-max scaling of history windows

/// A window scaled to [0, 1] together with the bounds used to scale it
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub scaled: Vec<f64>,
    pub min: f64,
    pub max: f64,
}

impl Normalized {
    /// Map a normalized value back onto the original range.
    ///
    /// A flat window collapses every value to `min`.
    pub fn denormalize(&self, value: f64) -> f64 {
        value * (self.max - self.min) + self.min
    }

    pub fn is_flat(&self) -> bool {
        self.max == self.min
    }
}

/// Scale a window to [0, 1], preserving order.
///
/// A window whose values are all equal scales to all zeros.
pub fn normalize(window: &[f64]) -> Normalized {
    if window.is_empty() {
        return Normalized {
            scaled: Vec::new(),
            min: 0.0,
            max: 0.0,
        };
    }

    let min = window.iter().copied().fold(f64::INFINITY, f64::min);
    let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let scaled = if max == min {
        vec![0.0; window.len()]
    } else {
        let range = max - min;
        window.iter().map(|v| (v - min) / range).collect()
    };

    Normalized { scaled, min, max }
}
