//! Fast simulation of spectrograph exposures
//!
//! This crate turns a set of true input spectra into the data products a
//! spectroscopic reduction pipeline consumes (uncalibrated frames,
//! flux-calibrated frames, sky models, flux calibration vectors and
//! fiber-flats) without running a pixel-level simulation. The physical
//! instrument model is an external [`Simulator`]; products go to an external
//! [`ProductSink`].

pub mod accumulate;
pub mod arc;
pub mod config;
pub mod convert;
pub mod driver;
pub mod error;
pub mod exposure;
pub mod flat;
pub mod instrument;
pub mod noise;
pub mod partition;
pub mod pipeline;
pub mod products;
pub mod sink;
pub mod spectra;
pub mod units;

// Re-exports for easier access
pub use config::QuickGenConfig;
pub use error::{QuickGenError, Result};
pub use exposure::{ExposureMetadata, Flavor, MoonOverrides, SkyCondition};
pub use instrument::mock::MockSimulator;
pub use instrument::{CameraChannel, Channel, SimulationOutput, Simulator, SimulatorError};
pub use noise::NoiseGenerator;
pub use partition::{SpectrographWindow, SPECTRA_PER_SPECTROGRAPH};
pub use pipeline::{QuickGen, RunSummary};
pub use products::{OutputProduct, ProductHeader, ProductKey, ProductKind};
pub use sink::{MemorySink, ProductSink, SinkError};
pub use spectra::{FiberRecord, SpectrumSet};
