//! Exposure metadata and flavor classification.
//!
//! The flavor tag recorded with an exposure decides which simulation path
//! runs and which moon geometry the atmosphere model starts from. Tags are
//! classified once into [`Flavor`]; everything downstream matches on that
//! enum instead of comparing strings.

use serde::{Deserialize, Serialize};

use crate::error::{QuickGenError, Result};
use crate::units::{Angle, AngleExt};

/// Header values of one exposure, as read from the simulated-spectra input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureMetadata {
    /// Observing night, e.g. "20170707"
    pub night: String,
    /// Exposure id within the night
    pub expid: u32,
    /// Raw flavor tag ("arc", "flat", "dark", "bright", ...)
    pub flavor: Option<String>,
    /// Airmass of the observation
    pub airmass: f64,
    /// Exposure time in seconds
    pub exptime_s: f64,
}

impl ExposureMetadata {
    pub fn new(night: impl Into<String>, expid: u32, flavor: &str, airmass: f64, exptime_s: f64) -> Self {
        Self {
            night: night.into(),
            expid,
            flavor: Some(flavor.to_string()),
            airmass,
            exptime_s,
        }
    }

    /// Classify the flavor tag, failing when it is absent.
    pub fn classify(&self) -> Result<Flavor> {
        self.flavor
            .as_deref()
            .map(Flavor::from_tag)
            .ok_or(QuickGenError::MissingFlavor)
    }

    /// The flavor tag as recorded, or an empty string.
    pub fn flavor_tag(&self) -> &str {
        self.flavor.as_deref().unwrap_or("")
    }
}

/// Sky brightness class of a science-like exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyCondition {
    /// "bgs", "mws", "bright"
    Bright,
    /// "gray", "grey"
    Gray,
    /// Anything else, including "dark" and "science"
    Default,
}

/// Simulation path selected by the flavor tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Arc lamp: one synthetic line spectrum, frame products only
    Arc,
    /// Continuum flat lamp: fiber-flat products only
    Flat,
    /// Sky exposure through the full frame/cframe/sky/calib chain
    Science(SkyCondition),
}

impl Flavor {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "arc" => Flavor::Arc,
            "flat" => Flavor::Flat,
            "bgs" | "mws" | "bright" => Flavor::Science(SkyCondition::Bright),
            "gray" | "grey" => Flavor::Science(SkyCondition::Gray),
            _ => Flavor::Science(SkyCondition::Default),
        }
    }

    /// Short name used in logs.
    pub fn mode_name(&self) -> &'static str {
        match self {
            Flavor::Arc => "arc",
            Flavor::Flat => "flat",
            Flavor::Science(_) => "science",
        }
    }
}

/// User overrides for the moon geometry. Unset fields fall back to presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoonOverrides {
    /// Moon phase (0 = full, 1 = new)
    pub phase: Option<f64>,
    /// Separation angle to the moon in degrees (0-180)
    pub angle_deg: Option<f64>,
    /// Zenith angle of the moon in degrees (0-90)
    pub zenith_deg: Option<f64>,
}

/// Moon geometry handed to the atmosphere model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonParameters {
    pub phase: f64,
    pub separation_angle: Angle,
    pub zenith: Angle,
}

impl MoonParameters {
    pub fn from_degrees(phase: f64, separation_deg: f64, zenith_deg: f64) -> Self {
        Self {
            phase,
            separation_angle: Angle::from_degrees(separation_deg),
            zenith: Angle::from_degrees(zenith_deg),
        }
    }

    fn with_overrides(phase: f64, separation_deg: f64, zenith_deg: f64, overrides: &MoonOverrides) -> Self {
        Self::from_degrees(
            overrides.phase.unwrap_or(phase),
            overrides.angle_deg.unwrap_or(separation_deg),
            overrides.zenith_deg.unwrap_or(zenith_deg),
        )
    }
}

impl SkyCondition {
    /// Moon geometry for this sky class.
    ///
    /// Bright and gray presets honour each override individually; the
    /// fallback preset ignores overrides.
    pub fn moon(&self, overrides: &MoonOverrides) -> MoonParameters {
        match self {
            SkyCondition::Bright => MoonParameters::with_overrides(0.7, 50.0, 30.0, overrides),
            SkyCondition::Gray => MoonParameters::with_overrides(0.1, 60.0, 80.0, overrides),
            SkyCondition::Default => MoonParameters::from_degrees(0.5, 60.0, 100.0),
        }
    }
}
