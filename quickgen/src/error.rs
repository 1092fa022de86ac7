//! Error types for the exposure simulation pipeline.

use shared::algo::{GradientError, ResampleError};
use thiserror::Error;

use crate::instrument::SimulatorError;
use crate::sink::SinkError;

/// Errors that abort a quickgen run
#[derive(Error, Debug)]
pub enum QuickGenError {
    #[error("Missing required input: {0}")]
    MissingInput(String),
    #[error("Exposure flavor is not set; cannot choose a simulation mode")]
    MissingFlavor,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Simulator failed on spectrum {index}: {source}")]
    Simulation {
        index: usize,
        #[source]
        source: SimulatorError,
    },
    #[error("Simulator setup failed: {0}")]
    SimulatorSetup(#[source] SimulatorError),
    #[error("Channel mismatch: {0}")]
    ChannelMismatch(String),
    #[error("Resolution slice: {0}")]
    Resolution(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Gradient(#[from] GradientError),
    #[error(transparent)]
    Resample(#[from] ResampleError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, QuickGenError>;
