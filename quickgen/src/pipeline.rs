//! Exposure simulation entry point.
//!
//! [`QuickGen::run`] takes one exposure from its true spectra to emitted
//! products:
//!
//! ```text
//! classify flavor → set up simulator → { arc | flat | science }
//!                                         │      │       │
//!                          simulate loop ─┘      │       └─ simulate loop
//!                          convert units         │          convert units
//!                          frames only     fiber-flats      frame, cframe, sky, calib
//! ```
//!
//! Products are handed to the sink window by window, channel by channel, in
//! camera order. Nothing is written until every spectrum has been simulated,
//! so a failing spectrum leaves the sink untouched.

use std::ops::Range;
use std::time::Duration;

use log::{debug, info};

use crate::accumulate::AccumulatedArrays;
use crate::arc::ArcSpectrum;
use crate::config::QuickGenConfig;
use crate::convert::convert_to_density;
use crate::driver::{ensure_focal_position, SimulationDriver};
use crate::error::{QuickGenError, Result};
use crate::exposure::{ExposureMetadata, Flavor, SkyCondition};
use crate::flat::flat_field_products;
use crate::instrument::{CameraChannel, Simulator, SimulatorError};
use crate::noise::NoiseGenerator;
use crate::partition::{emitted_windows, spectrograph_windows, ResolutionStack, SpectrographWindow};
use crate::products::{frame_product, science_products, FrameContent, OutputProduct, ProductHeader, WindowContext};
use crate::sink::ProductSink;
use crate::spectra::SpectrumSet;
use crate::units::AngleExt;

/// What a finished run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub flavor: Flavor,
    /// Spectrum indices that were simulated
    pub range: Range<usize>,
    /// Windows whose products were emitted
    pub windows: Vec<SpectrographWindow>,
    /// Number of products written
    pub products: usize,
}

pub struct QuickGen {
    config: QuickGenConfig,
}

/// Spectrum selection after clamping to the input.
struct Selection {
    nspec: usize,
    range: Range<usize>,
}

impl QuickGen {
    pub fn new(config: QuickGenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QuickGenConfig {
        &self.config
    }

    /// Simulate one exposure and write its products to `sink`.
    ///
    /// # Arguments
    /// * `exposure` - Exposure header values; required
    /// * `spectra` - True spectra (science) or lamp photons (arc, flat); required
    /// * `load_simulator` - Builds a simulator from a configuration name
    /// * `sink` - Receives every product in emission order
    pub fn run<S, F, K>(
        &self,
        exposure: Option<&ExposureMetadata>,
        spectra: Option<&SpectrumSet>,
        load_simulator: F,
        sink: &mut K,
    ) -> Result<RunSummary>
    where
        S: Simulator,
        F: FnOnce(&str) -> std::result::Result<S, SimulatorError>,
        K: ProductSink,
    {
        let exposure =
            exposure.ok_or_else(|| QuickGenError::MissingInput("exposure metadata".to_string()))?;
        let spectra =
            spectra.ok_or_else(|| QuickGenError::MissingInput("simulated spectra".to_string()))?;
        let flavor = exposure.classify()?;
        info!(
            "Simulating {} exposure {} of night {} (flavor {})",
            flavor.mode_name(),
            exposure.expid,
            exposure.night,
            exposure.flavor_tag()
        );

        let wave = spectra.wavelength();
        if !wave.is_empty() {
            info!("Wavelength range: {} to {}", wave[0], wave[wave.len() - 1]);
        }
        let selection = self.select(spectra)?;
        info!(
            "Simulating spectra {} to {}",
            selection.range.start, selection.range.end
        );

        info!("Initializing simulator with config {}", self.config.config);
        let mut simulator = load_simulator(self.config.config.as_str()).map_err(QuickGenError::SimulatorSetup)?;
        self.configure(&mut simulator, exposure, flavor)?;

        let cameras: Vec<CameraChannel> = simulator.cameras().to_vec();
        let maxbin = cameras.iter().map(CameraChannel::num_pixels).max().unwrap_or(0);
        let windows = spectrograph_windows(self.config.nstart, selection.nspec, selection.range.end);
        let windows = emitted_windows(&windows, self.config.min_spectrograph());
        let mut noise = NoiseGenerator::new(self.config.seed);

        let products = match flavor {
            Flavor::Flat => {
                info!("Simulating flat lamp exposure");
                let products = flat_field_products(spectra, &cameras, &windows, exposure, &mut noise)?;
                emit(sink, products)?
            }
            Flavor::Arc => {
                info!("Simulating arc line exposure");
                let arc = ArcSpectrum::from_lamp(spectra)?;
                let mut arrays = SimulationDriver::new(&mut simulator, &mut noise, maxbin)
                    .run_arc(&arc, selection.range.clone())?;
                convert_to_density(&mut arrays, &cameras)?;
                self.emit_windows(sink, &arrays, &cameras, &windows, exposure, &selection, |arrays, ctx| {
                    vec![frame_product(arrays, ctx, FrameContent::ObjectOnly)]
                })?
            }
            Flavor::Science(_) => {
                let mut arrays = SimulationDriver::new(&mut simulator, &mut noise, maxbin)
                    .run_science(spectra, selection.range.clone())?;
                convert_to_density(&mut arrays, &cameras)?;
                let fibermap = spectra.fibermap();
                let frame_only = self.config.frame_only;
                self.emit_windows(sink, &arrays, &cameras, &windows, exposure, &selection, |arrays, ctx| {
                    let ctx = WindowContext {
                        fibermap: Some(&fibermap[ctx.range.clone()]),
                        ..ctx.clone()
                    };
                    science_products(arrays, &ctx, frame_only)
                })?
            }
        };

        info!("Finished {} exposure: {} products", flavor.mode_name(), products);
        Ok(RunSummary {
            flavor,
            range: selection.range,
            windows,
            products,
        })
    }

    fn select(&self, spectra: &SpectrumSet) -> Result<Selection> {
        let available = spectra.nspec();
        let mut nspec = self.config.nspec;
        if available < nspec {
            info!("Only {} spectra in input file", available);
            nspec = available;
        }
        let nmax = nspec
            .checked_add(self.config.nstart)
            .ok_or_else(|| {
                QuickGenError::InvalidInput(format!(
                    "spectrum range overflows: {} spectra from index {}",
                    nspec, self.config.nstart
                ))
            })?
            .min(available);
        if self.config.nstart >= nmax {
            return Err(QuickGenError::InvalidInput(format!(
                "no spectra selected: {} requested from index {} of {} available",
                self.config.nspec, self.config.nstart, available
            )));
        }
        Ok(Selection {
            nspec,
            range: self.config.nstart..nmax,
        })
    }

    /// Set the observation and atmosphere for `flavor`.
    fn configure<S: Simulator>(&self, simulator: &mut S, exposure: &ExposureMetadata, flavor: Flavor) -> Result<()> {
        ensure_focal_position(simulator);
        simulator.set_airmass(exposure.airmass);
        let exptime = Duration::try_from_secs_f64(exposure.exptime_s).map_err(|e| {
            QuickGenError::InvalidInput(format!("exposure time {} s: {e}", exposure.exptime_s))
        })?;
        simulator.set_exposure_time(exptime);

        let moon = match flavor {
            Flavor::Arc => return Ok(()),
            Flavor::Flat => SkyCondition::Default.moon(&self.config.moon),
            Flavor::Science(sky) => sky.moon(&self.config.moon),
        };
        debug!(
            "Moon phase {}, separation {} deg, zenith {} deg",
            moon.phase,
            moon.separation_angle.as_degrees(),
            moon.zenith.as_degrees()
        );
        simulator.set_moon(moon);
        Ok(())
    }

    /// Cut every camera/window out of `arrays` and write what `build` makes of it.
    #[allow(clippy::too_many_arguments)]
    fn emit_windows<K, B>(
        &self,
        sink: &mut K,
        arrays: &AccumulatedArrays,
        cameras: &[CameraChannel],
        windows: &[SpectrographWindow],
        exposure: &ExposureMetadata,
        selection: &Selection,
        build: B,
    ) -> Result<usize>
    where
        K: ProductSink,
        B: Fn(&AccumulatedArrays, &WindowContext) -> Vec<OutputProduct>,
    {
        let mut written = 0;
        for (channel, camera) in cameras.iter().enumerate() {
            let stack = ResolutionStack::new(camera.resolution.clone(), selection.nspec);
            for window in windows {
                info!(
                    "writing files for channel {}, spectrograph {}, spectra {} to {}",
                    camera.channel, window.index, window.range.start, window.range.end
                );
                let ctx = WindowContext {
                    header: ProductHeader::new(
                        &exposure.night,
                        exposure.expid,
                        camera.channel,
                        window.index,
                        exposure.flavor_tag(),
                    ),
                    wave: &camera.wavelength,
                    channel,
                    range: window.range.clone(),
                    resolution: Some(stack.slice_for(window, self.config.nstart)?),
                    fibermap: None,
                };
                written += emit(sink, build(arrays, &ctx))?;
            }
        }
        Ok(written)
    }
}

fn emit<K: ProductSink>(sink: &mut K, products: Vec<OutputProduct>) -> Result<usize> {
    let count = products.len();
    for product in products {
        sink.write(product)?;
    }
    Ok(count)
}
