//! Type-safe physical units for exposure simulation
//!
//! Strongly-typed lengths and angles using the `uom` crate, so focal-plane
//! positions and moon geometry cannot be confused with bare numbers.

use uom::si::angle::{degree, radian};
use uom::si::length::millimeter;

/// Type alias for length measurements
pub type Length = uom::si::f64::Length;

/// Type alias for angle measurements
pub type Angle = uom::si::f64::Angle;

/// Extension trait for focal-plane length conversions
pub trait LengthExt {
    /// Create length from millimeters (focal-plane positions)
    fn from_millimeters(mm: f64) -> Self;

    /// Get length in millimeters
    fn as_millimeters(&self) -> f64;
}

/// Extension trait for angle conversions
pub trait AngleExt {
    fn from_degrees(deg: f64) -> Self;

    fn as_degrees(&self) -> f64;

    fn as_radians(&self) -> f64;
}

impl LengthExt for Length {
    fn from_millimeters(mm: f64) -> Self {
        Length::new::<millimeter>(mm)
    }

    fn as_millimeters(&self) -> f64 {
        self.get::<millimeter>()
    }
}

impl AngleExt for Angle {
    fn from_degrees(deg: f64) -> Self {
        Angle::new::<degree>(deg)
    }

    fn as_degrees(&self) -> f64 {
        self.get::<degree>()
    }

    fn as_radians(&self) -> f64 {
        self.get::<radian>()
    }
}
