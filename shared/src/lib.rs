//! Shared components and utilities for the quickgen workspace.
//!
//! Holds the numeric building blocks that do not depend on any instrument
//! model: grid lookup, numerical gradients, flux-conserving resampling,
//! and seeded Gaussian noise arrays.

pub mod algo;
pub mod noise;
