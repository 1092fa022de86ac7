//! Synthetic arc-lamp source.
//!
//! Arc exposures are simulated from one line spectrum shared by every fiber.
//! The tabulated photons of each channel's first fiber are binned onto a
//! fine grid spanning all three channels (b, then r, then z, so where the
//! channels overlap the redder channel's photons replace the bluer ones) and
//! converted to a flux density
//! as if collected by one fiber in a short exposure, with perfect fiber
//! coupling and electrons counted as photons.

use std::f64::consts::PI;

use log::info;
use ndarray::Array1;
use shared::algo::{gradient, nearest_index};

use crate::error::Result;
use crate::instrument::{Channel, FluxUnit, SourceInput};
use crate::spectra::SpectrumSet;

/// First point of the unified arc grid, Angstroms
pub const ARC_GRID_START: f64 = 3533.0;
/// Spacing of the unified arc grid, Angstroms
pub const ARC_GRID_STEP: f64 = 0.2;
/// Points in the unified arc grid (3533.0 to 9913.0 inclusive)
pub const ARC_GRID_LEN: usize = 31_901;

/// Nominal arc exposure time, seconds
pub const ARC_EXPOSURE_S: f64 = 5.0;
/// Fiber core diameter, cm
pub const FIBER_DIAMETER_CM: f64 = 1.07e-2;

/// Planck constant times speed of light, erg Å
pub const HC_ERG_ANGSTROM: f64 = 6.62607015e-27 * 2.99792458e10 * 1e8;

/// Object type under which lamp light reaches the simulator
pub const ARC_OBJECT_TYPE: &str = "perfect";

/// Cross-sectional area of one fiber, cm²
pub fn fiber_area_cm2() -> f64 {
    PI * (FIBER_DIAMETER_CM / 2.0).powi(2)
}

#[derive(Debug, Clone)]
pub struct ArcSpectrum {
    wave: Array1<f64>,
    flux: Array1<f64>,
}

impl ArcSpectrum {
    /// Build the line spectrum from the lamp photons of all three channels.
    ///
    /// A grid point takes the photons of the last sample snapped onto it.
    pub fn from_lamp(lamp: &SpectrumSet) -> Result<Self> {
        let wave = Array1::from_shape_fn(ARC_GRID_LEN, |i| ARC_GRID_START + ARC_GRID_STEP * i as f64);
        let mut phot = Array1::<f64>::zeros(ARC_GRID_LEN);

        for channel in Channel::ALL {
            let photons = lamp.channel_photons(channel)?;
            for (lambda, count) in photons.wave.iter().zip(photons.phot.row(0)) {
                phot[nearest_index(*lambda, ARC_GRID_START, ARC_GRID_STEP, ARC_GRID_LEN)] = *count;
            }
        }

        let dw = gradient(wave.view())?;
        let scale = HC_ERG_ANGSTROM * ARC_EXPOSURE_S * fiber_area_cm2();
        let flux = Array1::from_shape_fn(ARC_GRID_LEN, |i| scale * dw[i] * phot[i] / wave[i]);

        info!(
            "Built arc spectrum from {:.0} lamp photons on {} grid points",
            phot.sum(),
            ARC_GRID_LEN
        );
        Ok(Self { wave, flux })
    }

    pub fn wavelength(&self) -> &Array1<f64> {
        &self.wave
    }

    /// Flux density, erg s⁻¹ cm⁻² Å⁻¹
    pub fn flux(&self) -> &Array1<f64> {
        &self.flux
    }

    /// Simulator input for spectrum `index`.
    pub fn source(&self, index: usize) -> SourceInput<'_> {
        SourceInput {
            name: format!("Quickgen source {index}"),
            object_type: ARC_OBJECT_TYPE,
            wavelength: self.wave.view(),
            flux: self.flux.view(),
            flux_unit: FluxUnit::ErgPerSecCm2Angstrom,
        }
    }
}
