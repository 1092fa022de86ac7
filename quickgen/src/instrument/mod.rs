//! Contract with the physical spectrograph simulator.
//!
//! The optics/atmosphere model is an external collaborator. It is driven
//! through the [`Simulator`] trait: configure the atmosphere and observation,
//! load one source, simulate, draw noise, then read one [`SimulationOutput`]
//! per camera. [`mock::MockSimulator`] is a small deterministic model that
//! satisfies the contract for tests and dry runs.

pub mod mock;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

use crate::exposure::MoonParameters;
use crate::noise::NoiseGenerator;
use crate::units::{Length, LengthExt};

/// One of the three wavelength bands of a spectrograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    B,
    R,
    Z,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::B, Channel::R, Channel::Z];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::B => "b",
            Channel::R => "r",
            Channel::Z => "z",
        }
    }

    /// Camera identifier for this channel on spectrograph `spectrograph`, e.g. "r3"
    pub fn camera(&self, spectrograph: usize) -> String {
        format!("{}{}", self.name(), spectrograph)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors reported by a simulator implementation
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Unknown simulator configuration: {0}")]
    UnknownConfig(String),
    #[error("Invalid source: {0}")]
    InvalidSource(String),
    #[error("No source loaded; call update_source first")]
    NoSource,
    #[error("simulate() must run before noise can be generated")]
    NotSimulated,
    #[error("Model failure: {0}")]
    Model(String),
}

/// Output pixels and resolution of one camera.
#[derive(Debug, Clone)]
pub struct CameraChannel {
    pub channel: Channel,
    /// Output wavelength grid in Angstroms
    pub wavelength: Array1<f64>,
    /// Banded resolution matrix, [diagonal, pixel]
    pub resolution: Arc<Array2<f64>>,
}

impl CameraChannel {
    pub fn new(channel: Channel, wavelength: Array1<f64>, resolution: Array2<f64>) -> Self {
        Self {
            channel,
            wavelength,
            resolution: Arc::new(resolution),
        }
    }

    pub fn num_pixels(&self) -> usize {
        self.wavelength.len()
    }
}

/// Units of the flux handed to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxUnit {
    /// erg s⁻¹ cm⁻² Å⁻¹
    ErgPerSecCm2Angstrom,
    /// 1e-17 erg s⁻¹ cm⁻² Å⁻¹
    E17ErgPerSecCm2Angstrom,
}

impl FluxUnit {
    /// Multiplier converting a value in this unit to erg s⁻¹ cm⁻² Å⁻¹
    pub fn scale(&self) -> f64 {
        match self {
            FluxUnit::ErgPerSecCm2Angstrom => 1.0,
            FluxUnit::E17ErgPerSecCm2Angstrom => 1e-17,
        }
    }
}

/// One source spectrum to simulate.
#[derive(Debug, Clone)]
pub struct SourceInput<'a> {
    pub name: String,
    /// Object type after aliasing, e.g. "STAR"
    pub object_type: &'a str,
    /// Wavelength grid in Angstroms
    pub wavelength: ArrayView1<'a, f64>,
    pub flux: ArrayView1<'a, f64>,
    pub flux_unit: FluxUnit,
}

/// Position of the source on the focal plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalPosition {
    pub x: Length,
    pub y: Length,
}

impl FocalPosition {
    pub fn from_millimeters(x_mm: f64, y_mm: f64) -> Self {
        Self {
            x: Length::from_millimeters(x_mm),
            y: Length::from_millimeters(y_mm),
        }
    }

    /// Off-axis position used when the simulator has none, so that
    /// airmass-dependent throughput can be evaluated.
    pub fn default_off_axis() -> Self {
        Self::from_millimeters(0.0, 100.0)
    }
}

/// Per-camera result of simulating one source, aligned to the camera pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    pub num_source_electrons: Array1<f64>,
    pub num_sky_electrons: Array1<f64>,
    /// Variance of source + sky + detector electrons
    pub variance_electrons: Array1<f64>,
    /// Calibrated flux in erg s⁻¹ cm⁻² Å⁻¹
    pub observed_flux: Array1<f64>,
    /// Inverse variance of `observed_flux`
    pub flux_inverse_variance: Array1<f64>,
    /// Flux per electron, erg s⁻¹ cm⁻² Å⁻¹ e⁻¹
    pub flux_calibration: Array1<f64>,
    /// Noise realization in electrons, drawn by `generate_random_noise`
    pub random_noise_electrons: Array1<f64>,
}

impl SimulationOutput {
    pub fn zeros(num_pixels: usize) -> Self {
        Self {
            num_source_electrons: Array1::zeros(num_pixels),
            num_sky_electrons: Array1::zeros(num_pixels),
            variance_electrons: Array1::zeros(num_pixels),
            observed_flux: Array1::zeros(num_pixels),
            flux_inverse_variance: Array1::zeros(num_pixels),
            flux_calibration: Array1::zeros(num_pixels),
            random_noise_electrons: Array1::zeros(num_pixels),
        }
    }

    pub fn num_pixels(&self) -> usize {
        self.num_source_electrons.len()
    }
}

/// A configured spectrograph simulator.
///
/// Per spectrum the caller runs `update_source` → `simulate` →
/// `generate_random_noise`, then reads `camera_output`. Atmosphere and
/// observation setters are called once before the first spectrum.
///
/// `&mut S` is a simulator too, so a caller can lend one to a run and
/// inspect it afterwards.
pub trait Simulator {
    /// Name of the configuration the simulator was built from
    fn config_name(&self) -> &str;

    /// Cameras in channel order (b, r, z)
    fn cameras(&self) -> &[CameraChannel];

    fn focal_position(&self) -> Option<FocalPosition>;

    fn set_focal_position(&mut self, position: FocalPosition);

    fn set_airmass(&mut self, airmass: f64);

    fn set_exposure_time(&mut self, exposure: Duration);

    fn set_moon(&mut self, moon: MoonParameters);

    fn update_source(&mut self, source: SourceInput<'_>) -> Result<(), SimulatorError>;

    fn simulate(&mut self) -> Result<(), SimulatorError>;

    /// Draw the noise realization of the last simulation from `noise`.
    fn generate_random_noise(&mut self, noise: &mut NoiseGenerator) -> Result<(), SimulatorError>;

    /// Results of the last simulation, one per camera
    fn camera_output(&self) -> &[SimulationOutput];
}

impl<S: Simulator + ?Sized> Simulator for &mut S {
    fn config_name(&self) -> &str {
        (**self).config_name()
    }

    fn cameras(&self) -> &[CameraChannel] {
        (**self).cameras()
    }

    fn focal_position(&self) -> Option<FocalPosition> {
        (**self).focal_position()
    }

    fn set_focal_position(&mut self, position: FocalPosition) {
        (**self).set_focal_position(position)
    }

    fn set_airmass(&mut self, airmass: f64) {
        (**self).set_airmass(airmass)
    }

    fn set_exposure_time(&mut self, exposure: Duration) {
        (**self).set_exposure_time(exposure)
    }

    fn set_moon(&mut self, moon: MoonParameters) {
        (**self).set_moon(moon)
    }

    fn update_source(&mut self, source: SourceInput<'_>) -> Result<(), SimulatorError> {
        (**self).update_source(source)
    }

    fn simulate(&mut self) -> Result<(), SimulatorError> {
        (**self).simulate()
    }

    fn generate_random_noise(&mut self, noise: &mut NoiseGenerator) -> Result<(), SimulatorError> {
        (**self).generate_random_noise(noise)
    }

    fn camera_output(&self) -> &[SimulationOutput] {
        (**self).camera_output()
    }
}
