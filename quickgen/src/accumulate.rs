//! Dense per-spectrum, per-camera accumulation of simulation results.
//!
//! Arrays are shaped `[spectrum, channel, pixel]` with room for every
//! spectrum index below the end of the requested range and for the widest
//! camera. Cameras with fewer pixels leave their trailing pixels at zero.

use ndarray::{s, Array1, Array3, ArrayView1, ArrayView2};

use crate::instrument::SimulationOutput;

/// Variance reduction of the sky model relative to a single fiber, from
/// fitting the sky over ~40 sky fibers.
pub const SKY_DILUTION: f64 = 25.0;

/// Scale of calibrated fluxes relative to erg s⁻¹ cm⁻² Å⁻¹
pub const CALIBRATED_FLUX_SCALE: f64 = 1e17;

/// Diluted sky inverse variance from the total variance and source counts.
///
/// Computes `SKY_DILUTION / (variance - source)` per pixel. When the source
/// count reaches the variance the result would be infinite or negative;
/// those pixels get zero inverse variance instead. Returns the array and the
/// number of pixels replaced.
pub fn sky_inverse_variance(variance: ArrayView1<f64>, source: ArrayView1<f64>) -> (Array1<f64>, usize) {
    let mut replaced = 0;
    let ivar = Array1::from_shape_fn(variance.len(), |i| {
        let value = SKY_DILUTION / (variance[i] - source[i]);
        if value.is_finite() && value > 0.0 {
            value
        } else {
            replaced += 1;
            0.0
        }
    });
    (ivar, replaced)
}

#[derive(Debug, Clone)]
pub struct AccumulatedArrays {
    /// Object electrons
    pub object: Array3<f64>,
    /// Sky electrons
    pub sky: Array3<f64>,
    /// Inverse variance of object + sky
    pub ivar: Array3<f64>,
    /// Diluted inverse variance of the sky model
    pub sky_ivar: Array3<f64>,
    /// Calibrated flux, 1e-17 erg s⁻¹ cm⁻² Å⁻¹
    pub cframe_flux: Array3<f64>,
    /// Inverse variance of calibrated flux
    pub cframe_ivar: Array3<f64>,
    /// Noise realization of object + sky
    pub frame_noise: Array3<f64>,
    /// Independent noise realization of the sky model
    pub sky_noise: Array3<f64>,
    /// `frame_noise` carried into calibrated units
    pub cframe_noise: Array3<f64>,
    sky_ivar_replaced: usize,
}

impl AccumulatedArrays {
    pub fn new(nmax: usize, nchannels: usize, maxbin: usize) -> Self {
        let shape = (nmax, nchannels, maxbin);
        Self {
            object: Array3::zeros(shape),
            sky: Array3::zeros(shape),
            ivar: Array3::zeros(shape),
            sky_ivar: Array3::zeros(shape),
            cframe_flux: Array3::zeros(shape),
            cframe_ivar: Array3::zeros(shape),
            frame_noise: Array3::zeros(shape),
            sky_noise: Array3::zeros(shape),
            cframe_noise: Array3::zeros(shape),
            sky_ivar_replaced: 0,
        }
    }

    /// (spectra, channels, pixels)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.object.dim()
    }

    /// Store everything a science exposure needs from one camera output.
    ///
    /// Returns the diluted sky inverse variance so the caller can draw the
    /// sky-model realization from it.
    pub fn store_science(&mut self, spectrum: usize, channel: usize, output: &SimulationOutput) -> Array1<f64> {
        let n = output.num_pixels();
        let at = s![spectrum, channel, ..n];

        self.object.slice_mut(at).assign(&output.num_source_electrons);
        self.sky.slice_mut(at).assign(&output.num_sky_electrons);
        self.ivar
            .slice_mut(at)
            .assign(&output.variance_electrons.mapv(|v| 1.0 / v));

        self.cframe_flux
            .slice_mut(at)
            .assign(&(&output.observed_flux * CALIBRATED_FLUX_SCALE));
        self.cframe_ivar.slice_mut(at).assign(
            &(&output.flux_inverse_variance / (CALIBRATED_FLUX_SCALE * CALIBRATED_FLUX_SCALE)),
        );

        // Same draw for frame and cframe; no extra sky-subtraction noise.
        self.frame_noise
            .slice_mut(at)
            .assign(&output.random_noise_electrons);
        self.cframe_noise.slice_mut(at).assign(
            &(&output.flux_calibration * &output.random_noise_electrons * CALIBRATED_FLUX_SCALE),
        );

        let (sky_ivar, replaced) = sky_inverse_variance(
            output.variance_electrons.view(),
            output.num_source_electrons.view(),
        );
        self.sky_ivar.slice_mut(at).assign(&sky_ivar);
        self.sky_ivar_replaced += replaced;
        sky_ivar
    }

    pub fn store_sky_noise(&mut self, spectrum: usize, channel: usize, noise: &Array1<f64>) {
        let n = noise.len();
        self.sky_noise.slice_mut(s![spectrum, channel, ..n]).assign(noise);
    }

    /// Arc lamps only use the source electrons and their noise.
    pub fn store_arc(&mut self, spectrum: usize, channel: usize, output: &SimulationOutput) {
        let n = output.num_pixels();
        let at = s![spectrum, channel, ..n];
        self.object.slice_mut(at).assign(&output.num_source_electrons);
        self.frame_noise
            .slice_mut(at)
            .assign(&output.random_noise_electrons);
    }

    /// Pixels whose sky inverse variance was not finite and positive
    pub fn sky_ivar_replaced(&self) -> usize {
        self.sky_ivar_replaced
    }

    /// `[spectrum, pixel]` view of one quantity over a spectrum range
    pub fn window<'a>(
        array: &'a Array3<f64>,
        range: std::ops::Range<usize>,
        channel: usize,
        num_pixels: usize,
    ) -> ArrayView2<'a, f64> {
        array.slice(s![range, channel, ..num_pixels])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn output() -> SimulationOutput {
        SimulationOutput {
            num_source_electrons: array![10.0, 20.0],
            num_sky_electrons: array![5.0, 5.0],
            variance_electrons: array![24.0, 34.0],
            observed_flux: array![2e-17, 4e-17],
            flux_inverse_variance: array![1e34, 4e34],
            flux_calibration: array![2e-18, 2e-18],
            random_noise_electrons: array![1.5, -2.0],
        }
    }

    #[test]
    fn test_sky_inverse_variance_well_behaved() {
        let (ivar, replaced) = sky_inverse_variance(array![24.0, 34.0].view(), array![10.0, 20.0].view());
        assert_eq!(replaced, 0);
        assert_relative_eq!(ivar[0], 25.0 / 14.0);
        assert_relative_eq!(ivar[1], 25.0 / 14.0);
    }

    #[test]
    fn test_sky_inverse_variance_guard() {
        let (ivar, replaced) =
            sky_inverse_variance(array![10.0, 5.0, 9.0].view(), array![10.0, 6.0, 1.0].view());
        assert_eq!(replaced, 2);
        assert_eq!(ivar[0], 0.0);
        assert_eq!(ivar[1], 0.0);
        assert_relative_eq!(ivar[2], 25.0 / 8.0);
    }

    #[test]
    fn test_store_science_scaling_and_shared_noise() {
        let mut acc = AccumulatedArrays::new(4, 3, 5);
        let sky_ivar = acc.store_science(2, 1, &output());

        assert_eq!(acc.object[[2, 1, 0]], 10.0);
        assert_eq!(acc.sky[[2, 1, 1]], 5.0);
        assert_relative_eq!(acc.ivar[[2, 1, 0]], 1.0 / 24.0);
        assert_relative_eq!(acc.cframe_flux[[2, 1, 1]], 4.0, max_relative = 1e-12);
        assert_relative_eq!(acc.cframe_ivar[[2, 1, 1]], 4.0, max_relative = 1e-12);
        assert_eq!(acc.frame_noise[[2, 1, 0]], 1.5);
        assert_relative_eq!(acc.cframe_noise[[2, 1, 0]], 0.3, max_relative = 1e-12);
        assert_relative_eq!(acc.cframe_noise[[2, 1, 1]], -0.4, max_relative = 1e-12);
        assert_eq!(sky_ivar.len(), 2);

        // pixels past this camera's width stay zero
        assert_eq!(acc.object[[2, 1, 2]], 0.0);
        assert_eq!(acc.object[[1, 1, 0]], 0.0);
    }

    #[test]
    fn test_store_arc_only_source_and_noise() {
        let mut acc = AccumulatedArrays::new(1, 3, 2);
        acc.store_arc(0, 0, &output());
        assert_eq!(acc.object[[0, 0, 1]], 20.0);
        assert_eq!(acc.frame_noise[[0, 0, 1]], -2.0);
        assert_eq!(acc.sky[[0, 0, 0]], 0.0);
        assert_eq!(acc.ivar[[0, 0, 0]], 0.0);
    }
}
