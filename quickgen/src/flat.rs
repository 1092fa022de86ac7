//! Continuum flat-lamp exposures.
//!
//! A flat lamp illuminates every fiber with the same smooth spectrum, so the
//! only product is a fiber-flat: a multiplicative field about 1.0 whose
//! per-pixel scatter follows the photon statistics of the mean lamp
//! spectrum. Nothing is convolved to per-fiber resolution.

use log::debug;
use ndarray::{s, Array1, Array2, Axis};
use shared::algo::{gradient, resample_flux};

use crate::error::{QuickGenError, Result};
use crate::exposure::ExposureMetadata;
use crate::instrument::CameraChannel;
use crate::noise::NoiseGenerator;
use crate::partition::SpectrographWindow;
use crate::products::{FlatFieldProduct, OutputProduct, ProductHeader};
use crate::spectra::{ChannelPhotons, SpectrumSet};

/// Mean lamp photon density over all fibers, resampled to `output_wave`.
pub fn mean_photon_density(photons: &ChannelPhotons, output_wave: &Array1<f64>) -> Result<Array1<f64>> {
    let dw = gradient(photons.wave.view())?;
    let density = &photons.phot / &dw;
    let mean = density
        .mean_axis(Axis(0))
        .ok_or_else(|| QuickGenError::InvalidInput("lamp photons have no fibers".to_string()))?;
    Ok(resample_flux(output_wave.view(), photons.wave.view(), mean.view())?)
}

/// Inverse variance of the fiber-flat, one row per fiber.
///
/// Pixels where the lamp delivered nothing usable carry no information.
pub fn flat_inverse_variance(meanspec: &Array1<f64>, nfibers: usize) -> Array2<f64> {
    let row = meanspec.mapv(|m| if m.is_finite() && m > 0.0 { 1.0 / m } else { 0.0 });
    Array2::from_shape_fn((nfibers, row.len()), |(_, i)| row[i])
}

/// Fiber-flat products for every camera and emitted window.
///
/// One field is drawn per camera, in camera order, for all fibers of the
/// lamp input; windows then take their rows from it.
pub fn flat_field_products(
    lamp: &SpectrumSet,
    cameras: &[CameraChannel],
    windows: &[SpectrographWindow],
    exposure: &ExposureMetadata,
    noise: &mut NoiseGenerator,
) -> Result<Vec<OutputProduct>> {
    let nfibers = lamp.nspec();
    let mut products = Vec::with_capacity(cameras.len() * windows.len());

    for camera in cameras {
        let photons = lamp.channel_photons(camera.channel)?;
        let meanspec = mean_photon_density(photons, &camera.wavelength)?;
        let fiberflat = noise.flat_field(meanspec.view(), nfibers);
        let ivar = flat_inverse_variance(&meanspec, nfibers);
        debug!(
            "Drew fiber-flat for channel {} ({} fibers x {} pixels)",
            camera.channel,
            nfibers,
            camera.num_pixels()
        );

        for window in windows {
            let rows = window.range.clone();
            if rows.end > nfibers {
                return Err(QuickGenError::InvalidInput(format!(
                    "window {} ends at spectrum {} but the lamp has {} fibers",
                    window.index, rows.end, nfibers
                )));
            }
            products.push(OutputProduct::FlatField(FlatFieldProduct {
                header: ProductHeader::new(
                    &exposure.night,
                    exposure.expid,
                    camera.channel,
                    window.index,
                    exposure.flavor_tag(),
                ),
                wave: camera.wavelength.clone(),
                fiberflat: fiberflat.slice(s![rows.clone(), ..]).to_owned(),
                ivar: ivar.slice(s![rows.clone(), ..]).to_owned(),
                mask: Array2::zeros((rows.len(), camera.num_pixels())),
                meanspec: meanspec.clone(),
            }));
        }
    }
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Channel;
    use crate::partition::spectrograph_windows;
    use crate::spectra::FiberRecord;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn flat_lamp(nfibers: usize, level: f64) -> SpectrumSet {
        let fibers = (0..nfibers)
            .map(|i| FiberRecord::new(i as u32, "FLAT", i as u64))
            .collect();
        let wave = Array1::linspace(3000.0, 10000.0, 701);
        let phot = Array2::from_elem((nfibers, 701), level);
        let mut lamp = SpectrumSet::lamp(fibers).unwrap();
        for channel in Channel::ALL {
            lamp = lamp
                .with_channel_photons(channel, wave.clone(), phot.clone())
                .unwrap();
        }
        lamp
    }

    fn cameras() -> Vec<CameraChannel> {
        Channel::ALL
            .iter()
            .enumerate()
            .map(|(k, channel)| {
                let lo = 4000.0 + 2000.0 * k as f64;
                CameraChannel::new(*channel, Array1::linspace(lo, lo + 1000.0, 51), Array2::ones((3, 51)))
            })
            .collect()
    }

    #[test]
    fn test_mean_density_of_uniform_lamp() {
        let lamp = flat_lamp(4, 100.0);
        let photons = lamp.channel_photons(Channel::B).unwrap();
        let out = Array1::linspace(4000.0, 5000.0, 11);
        let meanspec = mean_photon_density(photons, &out).unwrap();
        // 100 photons per 10 A input bin
        for m in meanspec.iter() {
            assert_relative_eq!(*m, 10.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_inverse_variance_guard() {
        let ivar = flat_inverse_variance(&array![4.0, 0.0, -1.0, f64::NAN], 2);
        assert_eq!(ivar.dim(), (2, 4));
        assert_eq!(ivar.row(1).to_vec(), vec![0.25, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_one_product_per_channel_and_window() {
        let lamp = flat_lamp(650, 1.0e4);
        let windows = spectrograph_windows(0, 650, 650);
        let exposure = ExposureMetadata::new("20200315", 7, "flat", 1.0, 10.0);
        let mut noise = NoiseGenerator::new(1);

        let products = flat_field_products(&lamp, &cameras(), &windows, &exposure, &mut noise).unwrap();
        assert_eq!(products.len(), 6);
        let cams: Vec<_> = products.iter().map(|p| p.header().camera.clone()).collect();
        assert_eq!(cams, vec!["b0", "b1", "r0", "r1", "z0", "z1"]);

        match &products[1] {
            OutputProduct::FlatField(ff) => {
                assert_eq!(ff.fiberflat.dim(), (150, 51));
                assert_eq!(ff.mask.dim(), (150, 51));
                assert_eq!(ff.meanspec.len(), 51);
                assert_relative_eq!(ff.fiberflat.mean().unwrap(), 1.0, epsilon = 1e-2);
                assert_relative_eq!(ff.ivar[[0, 10]], 1.0 / ff.meanspec[10], max_relative = 1e-12);
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_dark_pixels_are_flat_and_uninformative() {
        let lamp = flat_lamp(3, 0.0);
        let windows = spectrograph_windows(0, 3, 3);
        let exposure = ExposureMetadata::new("20200315", 7, "flat", 1.0, 10.0);
        let mut noise = NoiseGenerator::new(1);

        let products = flat_field_products(&lamp, &cameras(), &windows, &exposure, &mut noise).unwrap();
        for product in &products {
            assert!(product.flux().iter().all(|v| *v == 1.0));
            assert!(product.ivar().iter().all(|v| *v == 0.0));
        }
    }
}
