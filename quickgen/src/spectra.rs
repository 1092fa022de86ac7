//! True input spectra and per-fiber metadata.
//!
//! A [`SpectrumSet`] is built once from the simulated-spectra input and read
//! only afterwards. Object-type labels are normalized to the names the
//! simulator knows while the set is being built, so every consumer sees the
//! same, already-aliased label.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{QuickGenError, Result};
use crate::instrument::Channel;

/// Target classes that the simulator models under another class's template.
pub const OBJECT_TYPE_ALIASES: [(&str, &str); 3] =
    [("STD", "STAR"), ("MWS_STAR", "STAR"), ("BGS", "LRG")];

/// Map a fiber's target class onto the class the simulator models.
pub fn normalize_object_type(label: &str) -> &str {
    OBJECT_TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == label)
        .map(|(_, target)| *target)
        .unwrap_or(label)
}

/// One fibermap row, carried through to frame products unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberRecord {
    pub fiber: u32,
    /// Target class as assigned at fiber allocation (before aliasing)
    pub objtype: String,
    pub target_id: u64,
}

impl FiberRecord {
    pub fn new(fiber: u32, objtype: impl Into<String>, target_id: u64) -> Self {
        Self {
            fiber,
            objtype: objtype.into(),
            target_id,
        }
    }
}

/// Photons per input bin for one channel, as tabulated for lamp exposures.
#[derive(Debug, Clone)]
pub struct ChannelPhotons {
    /// Input wavelength grid in Angstroms
    pub wave: Array1<f64>,
    /// Photon counts, [spectrum, wavelength]
    pub phot: Array2<f64>,
}

/// The full set of true spectra for one exposure.
#[derive(Debug, Clone)]
pub struct SpectrumSet {
    wave: Array1<f64>,
    flux: Array2<f64>,
    photons: BTreeMap<Channel, ChannelPhotons>,
    fibermap: Vec<FiberRecord>,
    object_types: Vec<String>,
}

impl SpectrumSet {
    /// Science input: fluxes in 1e-17 erg/s/cm²/Å on one shared grid.
    ///
    /// # Arguments
    /// * `wave` - Wavelength grid in Angstroms
    /// * `flux` - Flux matrix, [spectrum, wavelength]
    /// * `fibermap` - One record per spectrum
    pub fn new(wave: Array1<f64>, flux: Array2<f64>, fibermap: Vec<FiberRecord>) -> Result<Self> {
        if fibermap.is_empty() {
            return Err(QuickGenError::MissingInput("fibermap has no fibers".to_string()));
        }
        if flux.nrows() != fibermap.len() {
            return Err(QuickGenError::InvalidInput(format!(
                "{} flux rows for {} fibers",
                flux.nrows(),
                fibermap.len()
            )));
        }
        if flux.ncols() != wave.len() {
            return Err(QuickGenError::InvalidInput(format!(
                "{} flux columns for {} wavelengths",
                flux.ncols(),
                wave.len()
            )));
        }

        let object_types = fibermap
            .iter()
            .map(|rec| normalize_object_type(&rec.objtype).to_string())
            .collect();

        Ok(Self {
            wave,
            flux,
            photons: BTreeMap::new(),
            fibermap,
            object_types,
        })
    }

    /// Lamp input (arc or flat): no science flux, only per-channel photons.
    pub fn lamp(fibermap: Vec<FiberRecord>) -> Result<Self> {
        let nspec = fibermap.len();
        Self::new(Array1::zeros(0), Array2::zeros((nspec, 0)), fibermap)
    }

    /// Attach the tabulated photons of one channel.
    pub fn with_channel_photons(mut self, channel: Channel, wave: Array1<f64>, phot: Array2<f64>) -> Result<Self> {
        if phot.ncols() != wave.len() || phot.nrows() == 0 {
            return Err(QuickGenError::InvalidInput(format!(
                "channel {} photons are {:?} for {} wavelengths",
                channel.name(),
                phot.dim(),
                wave.len()
            )));
        }
        self.photons.insert(channel, ChannelPhotons { wave, phot });
        Ok(self)
    }

    pub fn nspec(&self) -> usize {
        self.fibermap.len()
    }

    pub fn wavelength(&self) -> ArrayView1<f64> {
        self.wave.view()
    }

    pub fn flux(&self, index: usize) -> ArrayView1<f64> {
        self.flux.row(index)
    }

    /// Object type of spectrum `index` after aliasing
    pub fn object_type(&self, index: usize) -> &str {
        &self.object_types[index]
    }

    pub fn fibermap(&self) -> &[FiberRecord] {
        &self.fibermap
    }

    pub fn channel_photons(&self, channel: Channel) -> Result<&ChannelPhotons> {
        self.photons.get(&channel).ok_or_else(|| {
            QuickGenError::MissingInput(format!("photons for channel {}", channel.name()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fibers(types: &[&str]) -> Vec<FiberRecord> {
        types
            .iter()
            .enumerate()
            .map(|(i, t)| FiberRecord::new(i as u32, *t, 1000 + i as u64))
            .collect()
    }

    #[test]
    fn test_alias_table() {
        assert_eq!(normalize_object_type("STD"), "STAR");
        assert_eq!(normalize_object_type("MWS_STAR"), "STAR");
        assert_eq!(normalize_object_type("BGS"), "LRG");
        assert_eq!(normalize_object_type("ELG"), "ELG");
        assert_eq!(normalize_object_type("STAR"), "STAR");
    }

    #[test]
    fn test_labels_normalized_once_raw_kept() {
        let wave = Array1::linspace(3600.0, 9800.0, 10);
        let flux = Array2::zeros((3, 10));
        let set = SpectrumSet::new(wave, flux, fibers(&["STD", "BGS", "QSO"])).unwrap();

        assert_eq!(set.object_type(0), "STAR");
        assert_eq!(set.object_type(1), "LRG");
        assert_eq!(set.object_type(2), "QSO");
        assert_eq!(set.fibermap()[0].objtype, "STD");
    }

    #[test]
    fn test_shape_validation() {
        let wave = Array1::linspace(3600.0, 9800.0, 10);
        let flux = Array2::zeros((2, 10));
        assert!(matches!(
            SpectrumSet::new(wave.clone(), flux, fibers(&["ELG"])),
            Err(QuickGenError::InvalidInput(_))
        ));
        assert!(matches!(
            SpectrumSet::new(wave, Array2::zeros((0, 10)), Vec::new()),
            Err(QuickGenError::MissingInput(_))
        ));
    }

    #[test]
    fn test_lamp_photons() {
        let set = SpectrumSet::lamp(fibers(&["ARC", "ARC"]))
            .unwrap()
            .with_channel_photons(Channel::B, Array1::linspace(3600.0, 3700.0, 5), Array2::ones((2, 5)))
            .unwrap();
        assert!(set.channel_photons(Channel::B).is_ok());
        assert!(matches!(
            set.channel_photons(Channel::R),
            Err(QuickGenError::MissingInput(_))
        ));
    }
}
