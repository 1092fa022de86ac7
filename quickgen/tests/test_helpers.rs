//! Shared fixtures for the quickgen integration tests

#![allow(dead_code)]

use ndarray::{Array1, Array2};
use quickgen::{Channel, ExposureMetadata, FiberRecord, QuickGenConfig, SpectrumSet};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn exposure(flavor: &str) -> ExposureMetadata {
    ExposureMetadata::new("20200315", 42, flavor, 1.1, 1000.0)
}

pub fn config(nspec: usize, nstart: usize, spectrograph: Option<usize>) -> QuickGenConfig {
    QuickGenConfig {
        nspec,
        nstart,
        spectrograph,
        seed: 17,
        ..Default::default()
    }
}

/// Science spectra with a gently sloped continuum, all labeled `objtype`.
pub fn science_spectra(nspec: usize, objtype: &str) -> SpectrumSet {
    let fibers = (0..nspec)
        .map(|i| FiberRecord::new(i as u32, objtype, 1000 + i as u64))
        .collect();
    science_spectra_with(fibers)
}

pub fn science_spectra_with(fibers: Vec<FiberRecord>) -> SpectrumSet {
    let wave = Array1::linspace(3500.0, 10000.0, 1301);
    let flux = Array2::from_shape_fn((fibers.len(), wave.len()), |(j, i)| {
        2.0 + 0.1 * (j % 7) as f64 + wave[i] / 10000.0
    });
    SpectrumSet::new(wave, flux, fibers).unwrap()
}

/// Lamp photons for every channel: a continuum plus, when `lines` is set,
/// a bright line every 50 A.
pub fn lamp_spectra(nspec: usize, lines: bool) -> SpectrumSet {
    let fibers = (0..nspec)
        .map(|i| FiberRecord::new(i as u32, "LAMP", i as u64))
        .collect();
    let mut lamp = SpectrumSet::lamp(fibers).unwrap();
    for (channel, lo, hi) in [
        (Channel::B, 3500.0, 6000.0),
        (Channel::R, 5600.0, 7800.0),
        (Channel::Z, 7400.0, 10000.0),
    ] {
        let wave = Array1::linspace(lo, hi, 501);
        let phot = Array2::from_shape_fn((nspec, 501), |(_, i)| {
            let on_line = lines && (wave[i] as i64) % 50 == 0;
            if on_line {
                1.0e6
            } else {
                1.0e5
            }
        });
        lamp = lamp.with_channel_photons(channel, wave, phot).unwrap();
    }
    lamp
}
