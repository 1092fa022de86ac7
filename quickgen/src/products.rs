//! Output data products and their assembly from converted arrays.
//!
//! Four correlated products come out of each science window/channel:
//!
//! - **frame**: object + sky density plus the frame noise realization
//! - **cframe**: calibrated flux plus the same realization in calibrated units
//! - **sky**: sky density plus its own, independent realization
//! - **calib**: per-pixel ratio of object density to calibrated flux
//!
//! Arc exposures produce frames only and flat exposures fiber-flats only.

use std::ops::Range;

use ndarray::{Array1, Array2, Array3, ArrayView2, Zip};

use crate::accumulate::AccumulatedArrays;
use crate::instrument::Channel;
use crate::partition::ResolutionSlice;
use crate::spectra::FiberRecord;

/// Number of independent calibration estimates averaged into one vector
pub const CALIBRATION_AVERAGED_ESTIMATES: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductKind {
    Frame,
    CalibratedFrame,
    SkyModel,
    FluxCalib,
    FlatField,
}

impl ProductKind {
    /// File-type name used by the persistence layer
    pub fn file_type(&self) -> &'static str {
        match self {
            ProductKind::Frame => "frame",
            ProductKind::CalibratedFrame => "cframe",
            ProductKind::SkyModel => "sky",
            ProductKind::FluxCalib => "calib",
            ProductKind::FlatField => "fiberflat",
        }
    }
}

/// Identity of a product: one per kind per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductKey {
    pub night: String,
    pub expid: u32,
    pub channel: Channel,
    pub spectrograph: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductHeader {
    pub night: String,
    pub expid: u32,
    pub channel: Channel,
    pub spectrograph: usize,
    /// Camera identifier, e.g. "b0"
    pub camera: String,
    pub flavor: String,
}

impl ProductHeader {
    pub fn new(night: &str, expid: u32, channel: Channel, spectrograph: usize, flavor: &str) -> Self {
        Self {
            night: night.to_string(),
            expid,
            channel,
            spectrograph,
            camera: channel.camera(spectrograph),
            flavor: flavor.to_string(),
        }
    }

    pub fn key(&self) -> ProductKey {
        ProductKey {
            night: self.night.clone(),
            expid: self.expid,
            channel: self.channel,
            spectrograph: self.spectrograph,
        }
    }
}

/// Extracted spectra, calibrated or not.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameProduct {
    pub header: ProductHeader,
    pub wave: Array1<f64>,
    pub flux: Array2<f64>,
    pub ivar: Array2<f64>,
    pub resolution: Option<ResolutionSlice>,
    pub fibermap: Option<Vec<FiberRecord>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkyModelProduct {
    pub header: ProductHeader,
    pub wave: Array1<f64>,
    pub flux: Array2<f64>,
    pub ivar: Array2<f64>,
    pub mask: Array2<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluxCalibProduct {
    pub header: ProductHeader,
    pub wave: Array1<f64>,
    pub calibration: Array2<f64>,
    pub ivar: Array2<f64>,
    pub mask: Array2<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatFieldProduct {
    pub header: ProductHeader,
    pub wave: Array1<f64>,
    pub fiberflat: Array2<f64>,
    pub ivar: Array2<f64>,
    pub mask: Array2<u32>,
    pub meanspec: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputProduct {
    Frame(FrameProduct),
    CalibratedFrame(FrameProduct),
    SkyModel(SkyModelProduct),
    FluxCalib(FluxCalibProduct),
    FlatField(FlatFieldProduct),
}

impl OutputProduct {
    pub fn kind(&self) -> ProductKind {
        match self {
            OutputProduct::Frame(_) => ProductKind::Frame,
            OutputProduct::CalibratedFrame(_) => ProductKind::CalibratedFrame,
            OutputProduct::SkyModel(_) => ProductKind::SkyModel,
            OutputProduct::FluxCalib(_) => ProductKind::FluxCalib,
            OutputProduct::FlatField(_) => ProductKind::FlatField,
        }
    }

    pub fn header(&self) -> &ProductHeader {
        match self {
            OutputProduct::Frame(p) | OutputProduct::CalibratedFrame(p) => &p.header,
            OutputProduct::SkyModel(p) => &p.header,
            OutputProduct::FluxCalib(p) => &p.header,
            OutputProduct::FlatField(p) => &p.header,
        }
    }

    pub fn key(&self) -> ProductKey {
        self.header().key()
    }

    pub fn wave(&self) -> &Array1<f64> {
        match self {
            OutputProduct::Frame(p) | OutputProduct::CalibratedFrame(p) => &p.wave,
            OutputProduct::SkyModel(p) => &p.wave,
            OutputProduct::FluxCalib(p) => &p.wave,
            OutputProduct::FlatField(p) => &p.wave,
        }
    }

    /// Main data array: flux, calibration vector or fiber-flat
    pub fn flux(&self) -> &Array2<f64> {
        match self {
            OutputProduct::Frame(p) | OutputProduct::CalibratedFrame(p) => &p.flux,
            OutputProduct::SkyModel(p) => &p.flux,
            OutputProduct::FluxCalib(p) => &p.calibration,
            OutputProduct::FlatField(p) => &p.fiberflat,
        }
    }

    pub fn ivar(&self) -> &Array2<f64> {
        match self {
            OutputProduct::Frame(p) | OutputProduct::CalibratedFrame(p) => &p.ivar,
            OutputProduct::SkyModel(p) => &p.ivar,
            OutputProduct::FluxCalib(p) => &p.ivar,
            OutputProduct::FlatField(p) => &p.ivar,
        }
    }

    pub fn nspec(&self) -> usize {
        self.flux().nrows()
    }
}

/// What goes into a frame's flux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameContent {
    /// Object + sky + noise
    ObjectAndSky,
    /// Object + noise, for lamp exposures
    ObjectOnly,
}

/// Everything needed to cut one window/channel out of the accumulated arrays.
#[derive(Debug, Clone)]
pub struct WindowContext<'a> {
    pub header: ProductHeader,
    /// Output wavelength grid of the camera
    pub wave: &'a Array1<f64>,
    /// Channel position in the accumulated arrays
    pub channel: usize,
    pub range: Range<usize>,
    pub resolution: Option<ResolutionSlice>,
    /// Fibermap rows for `range`
    pub fibermap: Option<&'a [FiberRecord]>,
}

impl<'a> WindowContext<'a> {
    pub fn num_pixels(&self) -> usize {
        self.wave.len()
    }

    fn cut<'b>(&self, array: &'b Array3<f64>) -> ArrayView2<'b, f64> {
        AccumulatedArrays::window(array, self.range.clone(), self.channel, self.num_pixels())
    }

    fn all_clear_mask(&self) -> Array2<u32> {
        Array2::zeros((self.range.len(), self.num_pixels()))
    }
}

pub fn frame_product(arrays: &AccumulatedArrays, ctx: &WindowContext, content: FrameContent) -> OutputProduct {
    let mut flux = ctx.cut(&arrays.object).to_owned();
    if content == FrameContent::ObjectAndSky {
        flux += &ctx.cut(&arrays.sky);
    }
    flux += &ctx.cut(&arrays.frame_noise);

    OutputProduct::Frame(FrameProduct {
        header: ctx.header.clone(),
        wave: ctx.wave.clone(),
        flux,
        ivar: ctx.cut(&arrays.ivar).to_owned(),
        resolution: ctx.resolution.clone(),
        fibermap: ctx.fibermap.map(<[FiberRecord]>::to_vec),
    })
}

pub fn calibrated_frame_product(arrays: &AccumulatedArrays, ctx: &WindowContext) -> OutputProduct {
    OutputProduct::CalibratedFrame(FrameProduct {
        header: ctx.header.clone(),
        wave: ctx.wave.clone(),
        flux: &ctx.cut(&arrays.cframe_flux) + &ctx.cut(&arrays.cframe_noise),
        ivar: ctx.cut(&arrays.cframe_ivar).to_owned(),
        resolution: ctx.resolution.clone(),
        fibermap: ctx.fibermap.map(<[FiberRecord]>::to_vec),
    })
}

pub fn sky_model_product(arrays: &AccumulatedArrays, ctx: &WindowContext) -> OutputProduct {
    OutputProduct::SkyModel(SkyModelProduct {
        header: ctx.header.clone(),
        wave: ctx.wave.clone(),
        flux: &ctx.cut(&arrays.sky) + &ctx.cut(&arrays.sky_noise),
        ivar: ctx.cut(&arrays.sky_ivar).to_owned(),
        mask: ctx.all_clear_mask(),
    })
}

/// Calibration factor per pixel: object density over calibrated flux where
/// the calibrated flux is positive, zero elsewhere.
pub fn calibration_vector(object: ArrayView2<f64>, calibrated: ArrayView2<f64>) -> Array2<f64> {
    let mut calibration = Array2::<f64>::zeros(object.raw_dim());
    Zip::from(&mut calibration)
        .and(&object)
        .and(&calibrated)
        .for_each(|c, &phot, &flux| {
            if flux > 0.0 {
                *c = phot / flux;
            }
        });
    calibration
}

pub fn flux_calib_product(arrays: &AccumulatedArrays, ctx: &WindowContext) -> OutputProduct {
    let calibration = calibration_vector(ctx.cut(&arrays.object), ctx.cut(&arrays.cframe_flux));
    // Mask stays all-clear, including zero-calibration pixels.
    OutputProduct::FluxCalib(FluxCalibProduct {
        header: ctx.header.clone(),
        wave: ctx.wave.clone(),
        calibration,
        ivar: ctx
            .cut(&arrays.cframe_ivar)
            .mapv(|ivar| CALIBRATION_AVERAGED_ESTIMATES / ivar),
        mask: ctx.all_clear_mask(),
    })
}

/// All products of one science window/channel, in emission order.
pub fn science_products(arrays: &AccumulatedArrays, ctx: &WindowContext, frame_only: bool) -> Vec<OutputProduct> {
    let mut products = vec![frame_product(arrays, ctx, FrameContent::ObjectAndSky)];
    if !frame_only {
        products.push(calibrated_frame_product(arrays, ctx));
        products.push(sky_model_product(arrays, ctx));
        products.push(flux_calib_product(arrays, ctx));
    }
    products
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn filled_arrays() -> AccumulatedArrays {
        let mut acc = AccumulatedArrays::new(4, 1, 3);
        acc.object.fill(10.0);
        acc.sky.fill(4.0);
        acc.frame_noise.fill(0.5);
        acc.sky_noise.fill(-0.25);
        acc.ivar.fill(0.2);
        acc.sky_ivar.fill(5.0);
        acc.cframe_flux.fill(2.0);
        acc.cframe_noise.fill(0.1);
        acc.cframe_ivar.fill(4.0);
        acc
    }

    fn context(wave: &Array1<f64>) -> WindowContext<'_> {
        WindowContext {
            header: ProductHeader::new("20200101", 3, Channel::B, 0, "dark"),
            wave,
            channel: 0,
            range: 1..3,
            resolution: None,
            fibermap: None,
        }
    }

    #[test]
    fn test_header_camera_and_key() {
        let header = ProductHeader::new("20200101", 3, Channel::Z, 4, "dark");
        assert_eq!(header.camera, "z4");
        let key = header.key();
        assert_eq!(key.channel, Channel::Z);
        assert_eq!(key.spectrograph, 4);
    }

    #[test]
    fn test_frame_flux_composition() {
        let acc = filled_arrays();
        let wave = array![5000.0, 5001.0, 5002.0];
        let ctx = context(&wave);

        let science = frame_product(&acc, &ctx, FrameContent::ObjectAndSky);
        assert_eq!(science.kind(), ProductKind::Frame);
        assert_eq!(science.flux().dim(), (2, 3));
        assert!(science.flux().iter().all(|v| *v == 14.5));
        assert!(science.ivar().iter().all(|v| *v == 0.2));

        let arc = frame_product(&acc, &ctx, FrameContent::ObjectOnly);
        assert!(arc.flux().iter().all(|v| *v == 10.5));
    }

    #[test]
    fn test_cframe_and_sky() {
        let acc = filled_arrays();
        let wave = array![5000.0, 5001.0, 5002.0];
        let ctx = context(&wave);

        let cframe = calibrated_frame_product(&acc, &ctx);
        for v in cframe.flux().iter() {
            assert_relative_eq!(*v, 2.1);
        }
        assert!(cframe.ivar().iter().all(|v| *v == 4.0));

        let sky = sky_model_product(&acc, &ctx);
        assert!(sky.flux().iter().all(|v| *v == 3.75));
        assert!(sky.ivar().iter().all(|v| *v == 5.0));
        match sky {
            OutputProduct::SkyModel(p) => assert!(p.mask.iter().all(|m| *m == 0)),
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_calibration_vector_zero_where_flux_not_positive() {
        let object = array![[10.0, 10.0, 10.0, 6.0]];
        let calibrated = array![[2.0, 0.0, -1.0, 3.0]];
        let calibration = calibration_vector(object.view(), calibrated.view());
        assert_eq!(calibration, array![[5.0, 0.0, 0.0, 2.0]]);
    }

    #[test]
    fn test_flux_calib_ivar_models_averaging() {
        let acc = filled_arrays();
        let wave = array![5000.0, 5001.0, 5002.0];
        let calib = flux_calib_product(&acc, &context(&wave));
        for v in calib.ivar().iter() {
            assert_relative_eq!(*v, 2.5);
        }
        for v in calib.flux().iter() {
            assert_relative_eq!(*v, 5.0);
        }
    }

    #[test]
    fn test_emission_order_and_frame_only() {
        let acc = filled_arrays();
        let wave = array![5000.0, 5001.0, 5002.0];
        let ctx = context(&wave);

        let kinds: Vec<_> = science_products(&acc, &ctx, false).iter().map(|p| p.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ProductKind::Frame,
                ProductKind::CalibratedFrame,
                ProductKind::SkyModel,
                ProductKind::FluxCalib
            ]
        );

        let only = science_products(&acc, &ctx, true);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].kind(), ProductKind::Frame);
    }
}
