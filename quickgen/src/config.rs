//! Run selection parameters.
//!
//! Everything a caller chooses about a run besides the inputs themselves:
//! which spectra to simulate, which spectrographs to emit, which simulator
//! configuration to load, the noise seed and moon overrides. Partial JSON
//! documents load with the remaining fields at their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QuickGenError, Result};
use crate::exposure::MoonOverrides;
use crate::partition::SPECTRA_PER_SPECTROGRAPH;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickGenConfig {
    /// Number of spectra to simulate, clamped to those available
    pub nspec: usize,
    /// Index of the first spectrum to simulate
    pub nstart: usize,
    /// Lowest spectrograph whose products are emitted; derived from
    /// `nstart` when unset
    pub spectrograph: Option<usize>,
    /// Simulator configuration name
    pub config: String,
    /// Seed of the run's single random stream
    pub seed: u64,
    /// Emit frame products only
    pub frame_only: bool,
    pub moon: MoonOverrides,
}

impl Default for QuickGenConfig {
    fn default() -> Self {
        Self {
            nspec: 5000,
            nstart: 0,
            spectrograph: None,
            config: "desi".to_string(),
            seed: 0,
            frame_only: false,
            moon: MoonOverrides::default(),
        }
    }
}

impl QuickGenConfig {
    /// Minimum-spectrograph filter in effect for this run
    pub fn min_spectrograph(&self) -> usize {
        self.spectrograph
            .unwrap_or(self.nstart / SPECTRA_PER_SPECTROGRAPH)
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| QuickGenError::Config(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| QuickGenError::Config(format!("{}: {e}", path.display())))
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| QuickGenError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&json).map_err(|e| QuickGenError::Config(e.to_string()))
    }
}
