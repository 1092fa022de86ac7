//! Conversion from per-bin counts to per-Angstrom densities.
//!
//! Each camera pixel covers a wavelength interval equal to the local
//! gradient of its output grid. Dividing a count by that width gives a
//! density; the inverse variance of a quantity divided by `w` is multiplied
//! by `w²`.

use log::debug;
use ndarray::{s, Array1, Array3, Axis};
use shared::algo::gradient;

use crate::accumulate::AccumulatedArrays;
use crate::error::{QuickGenError, Result};
use crate::instrument::CameraChannel;

/// Divide `[.., channel, ..npix]` of `array` by `dw` along the pixel axis.
pub fn divide_by_bin_width(array: &mut Array3<f64>, channel: usize, dw: &Array1<f64>) {
    let npix = dw.len();
    let mut view = array.slice_mut(s![.., channel, ..npix]);
    for mut row in view.axis_iter_mut(Axis(0)) {
        row /= dw;
    }
}

/// Multiply `[.., channel, ..npix]` of an inverse-variance array by `dw²`.
pub fn scale_inverse_variance(array: &mut Array3<f64>, channel: usize, dw: &Array1<f64>) {
    let npix = dw.len();
    let dw2 = dw.mapv(|w| w * w);
    let mut view = array.slice_mut(s![.., channel, ..npix]);
    for mut row in view.axis_iter_mut(Axis(0)) {
        row *= &dw2;
    }
}

/// Rescale accumulated counts to densities, in place, for every camera.
///
/// Object counts, sky counts and their two noise realizations are divided
/// by the bin width; the combined and sky inverse variances are multiplied
/// by its square. Calibrated quantities are already densities and are left
/// untouched.
pub fn convert_to_density(arrays: &mut AccumulatedArrays, cameras: &[CameraChannel]) -> Result<()> {
    let (_, nchannels, maxbin) = arrays.dim();
    for (channel, camera) in cameras.iter().enumerate() {
        if channel >= nchannels || camera.num_pixels() > maxbin {
            return Err(QuickGenError::ChannelMismatch(format!(
                "camera {} ({} pixels) does not fit accumulation arrays of {} channels x {} pixels",
                camera.channel,
                camera.num_pixels(),
                nchannels,
                maxbin
            )));
        }
        let dw = gradient(camera.wavelength.view())?;

        divide_by_bin_width(&mut arrays.object, channel, &dw);
        divide_by_bin_width(&mut arrays.frame_noise, channel, &dw);
        divide_by_bin_width(&mut arrays.sky, channel, &dw);
        divide_by_bin_width(&mut arrays.sky_noise, channel, &dw);

        scale_inverse_variance(&mut arrays.ivar, channel, &dw);
        scale_inverse_variance(&mut arrays.sky_ivar, channel, &dw);

        debug!(
            "Converted channel {} to per-Angstrom densities (mean bin width {:.3} A)",
            camera.channel,
            dw.mean().unwrap_or(0.0)
        );
    }
    Ok(())
}
