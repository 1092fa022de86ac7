//! Miscellaneous lookup helpers for sampled spectra.

/// Index of the point of a uniform grid closest to `x`.
///
/// The grid is described by its first value, its step, and its length.
/// Values outside the grid snap to the first or last point, and a value
/// exactly halfway between two points takes the lower one.
pub fn nearest_index(x: f64, start: f64, step: f64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let raw = ((x - start) / step - 0.5).ceil();
    if raw <= 0.0 || !raw.is_finite() {
        0
    } else {
        (raw as usize).min(len - 1)
    }
}
