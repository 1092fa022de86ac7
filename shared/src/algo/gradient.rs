//! Numerical gradient of a sampled sequence.
//!
//! Central differences in the interior, one-sided differences at the two
//! ends. Applied to a wavelength grid this yields the local bin width of
//! every pixel, which is what per-bin to per-Angstrom conversions divide by.

use ndarray::{Array1, ArrayView1};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GradientError {
    #[error("Gradient needs at least 2 samples, got {0}")]
    TooFewSamples(usize),
}

/// Gradient of `values` with unit sample spacing.
///
/// `g[0] = v[1] - v[0]`, `g[n-1] = v[n-1] - v[n-2]` and
/// `g[i] = (v[i+1] - v[i-1]) / 2` otherwise.
pub fn gradient(values: ArrayView1<f64>) -> Result<Array1<f64>, GradientError> {
    let n = values.len();
    if n < 2 {
        return Err(GradientError::TooFewSamples(n));
    }

    let mut out = Array1::<f64>::zeros(n);
    out[0] = values[1] - values[0];
    out[n - 1] = values[n - 1] - values[n - 2];
    for i in 1..n - 1 {
        out[i] = (values[i + 1] - values[i - 1]) / 2.0;
    }
    Ok(out)
}
