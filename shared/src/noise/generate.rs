//! Gaussian noise generation with per-element scales.
//!
//! Every element consumes exactly one standard-normal draw from the caller's
//! generator, whatever its scale, so the position of the stream after a call
//! depends only on the array shape. Elements whose scale is zero, negative or
//! non-finite come out equal to the location parameter.

use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;

fn usable_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        0.0
    }
}

/// Draw `loc + scale[i] * z_i` for every element of `scales`.
///
/// # Arguments
/// * `rng` - Generator to advance; one draw per element
/// * `loc` - Mean of every element
/// * `scales` - Standard deviation of each element
pub fn scaled_normal_array<R: Rng>(
    rng: &mut R,
    loc: f64,
    scales: ArrayView1<f64>,
) -> Array1<f64> {
    scales.mapv(|scale| {
        let z: f64 = rng.sample(StandardNormal);
        loc + usable_scale(scale) * z
    })
}

/// Draw `rows` independent rows, each following `scales` column-wise.
///
/// Rows are drawn in order, so row `r` of the result equals what
/// `scaled_normal_array` would return on its `r`-th call.
pub fn scaled_normal_matrix<R: Rng>(
    rng: &mut R,
    loc: f64,
    scales: ArrayView1<f64>,
    rows: usize,
) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((rows, scales.len()));
    for mut row in out.rows_mut() {
        row.assign(&scaled_normal_array(rng, loc, scales));
    }
    out
}
