//! Per-spectrum simulation loop.
//!
//! The driver walks the requested spectrum range in order, feeding one source
//! at a time through the simulator's update → simulate → noise cycle and
//! copying each camera's output into [`AccumulatedArrays`]. Any failure ends
//! the run: later stages assume every slot in the range was filled.

use std::ops::Range;

use log::{debug, warn};

use crate::accumulate::AccumulatedArrays;
use crate::arc::ArcSpectrum;
use crate::error::{QuickGenError, Result};
use crate::instrument::{FluxUnit, FocalPosition, SimulationOutput, Simulator, SourceInput};
use crate::noise::NoiseGenerator;
use crate::spectra::SpectrumSet;
use crate::units::LengthExt;

/// Give the simulator a focal-plane position if it has none.
///
/// Returns true when the default position was injected.
pub fn ensure_focal_position<S: Simulator>(simulator: &mut S) -> bool {
    if simulator.focal_position().is_some() {
        return false;
    }
    let position = FocalPosition::default_off_axis();
    debug!(
        "No focal-plane position set; using ({} mm, {} mm)",
        position.x.as_millimeters(),
        position.y.as_millimeters()
    );
    simulator.set_focal_position(position);
    true
}

pub struct SimulationDriver<'a, S: Simulator> {
    simulator: &'a mut S,
    noise: &'a mut NoiseGenerator,
    maxbin: usize,
}

impl<'a, S: Simulator> SimulationDriver<'a, S> {
    /// # Arguments
    /// * `simulator` - Configured simulator, atmosphere and observation set
    /// * `noise` - The run's random stream
    /// * `maxbin` - Pixel capacity of the accumulation arrays
    pub fn new(simulator: &'a mut S, noise: &'a mut NoiseGenerator, maxbin: usize) -> Self {
        Self {
            simulator,
            noise,
            maxbin,
        }
    }

    fn allocate(&self, range: &Range<usize>) -> AccumulatedArrays {
        AccumulatedArrays::new(range.end, self.simulator.cameras().len(), self.maxbin)
    }

    /// Run one update → simulate → noise cycle for spectrum `index`.
    fn cycle(&mut self, index: usize, source: SourceInput<'_>) -> Result<()> {
        let wrap = |err| QuickGenError::Simulation { index, source: err };
        self.simulator.update_source(source).map_err(wrap)?;
        self.simulator.simulate().map_err(wrap)?;
        self.simulator
            .generate_random_noise(self.noise)
            .map_err(wrap)?;
        self.check_outputs(index)
    }

    fn check_outputs(&self, index: usize) -> Result<()> {
        let cameras = self.simulator.cameras();
        let outputs = self.simulator.camera_output();
        if outputs.len() != cameras.len() {
            return Err(QuickGenError::ChannelMismatch(format!(
                "spectrum {}: {} camera outputs for {} cameras",
                index,
                outputs.len(),
                cameras.len()
            )));
        }
        for (camera, output) in cameras.iter().zip(outputs) {
            if output.num_pixels() != camera.num_pixels() || output.num_pixels() > self.maxbin {
                return Err(QuickGenError::ChannelMismatch(format!(
                    "spectrum {}: camera {} returned {} pixels, expected {} (capacity {})",
                    index,
                    camera.channel,
                    output.num_pixels(),
                    camera.num_pixels(),
                    self.maxbin
                )));
            }
        }
        Ok(())
    }

    /// Simulate science spectra `range` from `spectra`.
    ///
    /// After each camera's values are stored, the sky-model realization of
    /// that camera is drawn from its diluted inverse variance.
    pub fn run_science(&mut self, spectra: &SpectrumSet, range: Range<usize>) -> Result<AccumulatedArrays> {
        let mut arrays = self.allocate(&range);

        for j in range.clone() {
            debug!("Simulating spectrum {}, object type={}", j, spectra.object_type(j));
            let source = SourceInput {
                name: format!("Quickgen source {j}"),
                object_type: spectra.object_type(j),
                wavelength: spectra.wavelength(),
                flux: spectra.flux(j),
                flux_unit: FluxUnit::E17ErgPerSecCm2Angstrom,
            };
            self.cycle(j, source)?;

            let outputs: &[SimulationOutput] = self.simulator.camera_output();
            for (channel, output) in outputs.iter().enumerate() {
                let sky_ivar = arrays.store_science(j, channel, output);
                let sky_noise = self.noise.sky_noise(sky_ivar.view());
                arrays.store_sky_noise(j, channel, &sky_noise);
            }
        }

        let replaced = arrays.sky_ivar_replaced();
        if replaced > 0 {
            warn!(
                "{} sky pixels had non-positive variance after removing the source; \
                 their sky inverse variance and noise were set to zero",
                replaced
            );
        }
        Ok(arrays)
    }

    /// Simulate the arc line spectrum once for every index in `range`.
    pub fn run_arc(&mut self, arc: &ArcSpectrum, range: Range<usize>) -> Result<AccumulatedArrays> {
        let mut arrays = self.allocate(&range);

        for j in range.clone() {
            debug!("Simulating arc spectrum {}", j);
            self.cycle(j, arc.source(j))?;
            for (channel, output) in self.simulator.camera_output().iter().enumerate() {
                arrays.store_arc(j, channel, output);
            }
        }
        Ok(arrays)
    }
}
