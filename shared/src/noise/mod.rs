//! Seeded Gaussian noise primitives.

pub mod generate;

pub use generate::{scaled_normal_array, scaled_normal_matrix};
