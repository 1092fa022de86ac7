//! Deterministic stand-in for the spectrograph simulator.
//!
//! Models each camera as a constant-throughput channel behind a fixed
//! collecting area, with a flat sky brightened by the moon and airmass and a
//! fixed read noise. Coarse pixel grids keep it fast enough for tests over
//! thousands of spectra. It also records every object type it was asked to
//! simulate so callers can check what actually reached the model.

use std::time::Duration;

use ndarray::{Array1, Array2};
use shared::algo::{gradient, resample_flux};

use super::{
    CameraChannel, Channel, FocalPosition, SimulationOutput, Simulator, SimulatorError, SourceInput,
};
use crate::arc::HC_ERG_ANGSTROM;
use crate::exposure::MoonParameters;
use crate::noise::NoiseGenerator;
use crate::units::AngleExt;

/// Effective collecting area of the primary, cm²
const COLLECTING_AREA_CM2: f64 = 8.678e4;

/// Dark-sky continuum, erg s⁻¹ cm⁻² Å⁻¹
const DARK_SKY_FLUX: f64 = 2.0e-17;

/// Read noise per pixel, electrons
const READ_NOISE_E: f64 = 3.0;

/// Extinction, magnitudes per unit airmass
const EXTINCTION_MAG: f64 = 0.1;

fn throughput(channel: Channel) -> f64 {
    match channel {
        Channel::B => 0.25,
        Channel::R => 0.35,
        Channel::Z => 0.30,
    }
}

/// Gaussian line-spread function stored as `ndiag` diagonals.
fn banded_gaussian(ndiag: usize, sigma_px: f64, num_pixels: usize) -> Array2<f64> {
    let half = (ndiag / 2) as f64;
    let kernel: Vec<f64> = (0..ndiag)
        .map(|d| {
            let offset = d as f64 - half;
            (-0.5 * (offset / sigma_px).powi(2)).exp()
        })
        .collect();
    let total: f64 = kernel.iter().sum();
    Array2::from_shape_fn((ndiag, num_pixels), |(d, _)| kernel[d] / total)
}

/// Default camera layout: b, r and z arms on coarse grids.
pub fn default_cameras() -> Vec<CameraChannel> {
    [
        (Channel::B, 3600.0, 5900.0, 231),
        (Channel::R, 5700.0, 7700.0, 201),
        (Channel::Z, 7500.0, 9900.0, 201),
    ]
    .into_iter()
    .map(|(channel, lo, hi, n)| {
        CameraChannel::new(channel, Array1::linspace(lo, hi, n), banded_gaussian(5, 1.0, n))
    })
    .collect()
}

struct LoadedSource {
    /// Flux density on each camera grid, erg s⁻¹ cm⁻² Å⁻¹
    flux: Vec<Array1<f64>>,
}

pub struct MockSimulator {
    config_name: String,
    cameras: Vec<CameraChannel>,
    bin_widths: Vec<Array1<f64>>,
    focal_position: Option<FocalPosition>,
    airmass: f64,
    exposure: Duration,
    moon: MoonParameters,
    source: Option<LoadedSource>,
    outputs: Vec<SimulationOutput>,
    simulated: bool,
    simulations: usize,
    fail_at: Option<usize>,
    object_types_seen: Vec<String>,
}

impl MockSimulator {
    /// Build the mock for a named configuration ("desi" or "mock").
    pub fn from_config(name: &str) -> Result<Self, SimulatorError> {
        match name {
            "desi" | "mock" => Self::with_cameras(name, default_cameras()),
            other => Err(SimulatorError::UnknownConfig(other.to_string())),
        }
    }

    pub fn with_cameras(name: &str, cameras: Vec<CameraChannel>) -> Result<Self, SimulatorError> {
        let bin_widths = cameras
            .iter()
            .map(|cam| gradient(cam.wavelength.view()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SimulatorError::Model(e.to_string()))?;
        let outputs = cameras
            .iter()
            .map(|cam| SimulationOutput::zeros(cam.num_pixels()))
            .collect();

        Ok(Self {
            config_name: name.to_string(),
            cameras,
            bin_widths,
            focal_position: None,
            airmass: 1.0,
            exposure: Duration::from_secs(1000),
            moon: MoonParameters::from_degrees(0.5, 60.0, 100.0),
            source: None,
            outputs,
            simulated: false,
            simulations: 0,
            fail_at: None,
            object_types_seen: Vec::new(),
        })
    }

    /// Make the `n`-th call to `simulate` (zero-based) fail.
    pub fn failing_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    /// Object types passed to `update_source`, in call order
    pub fn object_types_seen(&self) -> &[String] {
        &self.object_types_seen
    }

    pub fn airmass(&self) -> f64 {
        self.airmass
    }

    pub fn exposure_time(&self) -> Duration {
        self.exposure
    }

    pub fn moon(&self) -> MoonParameters {
        self.moon
    }

    /// Sky flux density after moon and airmass scaling
    fn sky_flux(&self) -> f64 {
        let moon_up = self.moon.zenith.as_degrees() < 90.0;
        let moon_gain = if moon_up {
            let closeness = (1.0 + self.moon.separation_angle.as_radians().cos()) / 2.0;
            1.0 + 4.0 * (1.0 - self.moon.phase) * (0.5 + closeness)
        } else {
            1.0
        };
        DARK_SKY_FLUX * moon_gain * self.airmass
    }
}

impl Simulator for MockSimulator {
    fn config_name(&self) -> &str {
        &self.config_name
    }

    fn cameras(&self) -> &[CameraChannel] {
        &self.cameras
    }

    fn focal_position(&self) -> Option<FocalPosition> {
        self.focal_position
    }

    fn set_focal_position(&mut self, position: FocalPosition) {
        self.focal_position = Some(position);
    }

    fn set_airmass(&mut self, airmass: f64) {
        self.airmass = airmass;
    }

    fn set_exposure_time(&mut self, exposure: Duration) {
        self.exposure = exposure;
    }

    fn set_moon(&mut self, moon: MoonParameters) {
        self.moon = moon;
    }

    fn update_source(&mut self, source: SourceInput<'_>) -> Result<(), SimulatorError> {
        if source.object_type.is_empty() {
            return Err(SimulatorError::InvalidSource(format!(
                "{} has no object type",
                source.name
            )));
        }
        let scale = source.flux_unit.scale();
        let flux = self
            .cameras
            .iter()
            .map(|cam| {
                resample_flux(cam.wavelength.view(), source.wavelength, source.flux)
                    .map(|f| f * scale)
                    .map_err(|e| SimulatorError::InvalidSource(format!("{}: {e}", source.name)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.object_types_seen.push(source.object_type.to_string());
        self.source = Some(LoadedSource { flux });
        self.simulated = false;
        Ok(())
    }

    fn simulate(&mut self) -> Result<(), SimulatorError> {
        let call = self.simulations;
        self.simulations += 1;
        if self.fail_at == Some(call) {
            return Err(SimulatorError::Model(format!("injected failure on call {call}")));
        }
        if self.focal_position.is_none() {
            return Err(SimulatorError::Model(
                "focal-plane position is required for airmass-dependent throughput".to_string(),
            ));
        }
        let source = self.source.as_ref().ok_or(SimulatorError::NoSource)?;

        let exptime = self.exposure.as_secs_f64();
        let extinction = 10f64.powf(-0.4 * EXTINCTION_MAG * (self.airmass - 1.0));
        let sky_flux = self.sky_flux();

        let mut outputs = Vec::with_capacity(self.cameras.len());
        for ((cam, dw), flux) in self.cameras.iter().zip(&self.bin_widths).zip(&source.flux) {
            let efficiency = throughput(cam.channel) * extinction * COLLECTING_AREA_CM2 * exptime;
            // flux density per electron in each pixel
            let calibration = Array1::from_shape_fn(cam.num_pixels(), |i| {
                HC_ERG_ANGSTROM / cam.wavelength[i] / (dw[i] * efficiency)
            });

            let num_source_electrons = flux / &calibration;
            let num_sky_electrons = calibration.mapv(|c| sky_flux / c);
            let variance_electrons =
                &num_source_electrons + &num_sky_electrons + READ_NOISE_E * READ_NOISE_E;
            let flux_inverse_variance =
                Array1::from_shape_fn(cam.num_pixels(), |i| {
                    1.0 / (variance_electrons[i] * calibration[i] * calibration[i])
                });

            outputs.push(SimulationOutput {
                observed_flux: flux.clone(),
                num_source_electrons,
                num_sky_electrons,
                variance_electrons,
                flux_inverse_variance,
                flux_calibration: calibration,
                random_noise_electrons: Array1::zeros(cam.num_pixels()),
            });
        }

        self.outputs = outputs;
        self.simulated = true;
        Ok(())
    }

    fn generate_random_noise(&mut self, noise: &mut NoiseGenerator) -> Result<(), SimulatorError> {
        if !self.simulated {
            return Err(SimulatorError::NotSimulated);
        }
        for output in self.outputs.iter_mut() {
            output.random_noise_electrons = noise.frame_noise(output.variance_electrons.view());
        }
        Ok(())
    }

    fn camera_output(&self) -> &[SimulationOutput] {
        &self.outputs
    }
}
