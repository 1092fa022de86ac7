//! Algorithms for spectral grids.
//!
//! Grid lookup, numerical gradients of wavelength grids, and
//! flux-conserving resampling between grids.

pub mod gradient;
pub mod misc;
pub mod resample;

pub use gradient::{gradient, GradientError};
pub use misc::nearest_index;
pub use resample::{resample_flux, ResampleError};
