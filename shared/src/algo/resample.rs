//! Flux-conserving resampling between wavelength grids.
//!
//! The input density is treated as piecewise linear between its samples and
//! integrated exactly over each output bin. Output bin edges sit halfway
//! between neighbouring output wavelengths, with the outermost edges placed
//! half a step beyond the first and last samples. Outside the input coverage
//! the density is zero, so partially covered edge bins are diluted rather
//! than extrapolated.

use ndarray::{Array1, ArrayView1};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ResampleError {
    #[error("Input grid has {0} samples; need at least 2")]
    InputTooShort(usize),
    #[error("Output grid has {0} samples; need at least 2")]
    OutputTooShort(usize),
    #[error("Input grid has {wave} wavelengths but {flux} flux values")]
    MismatchedLengths { wave: usize, flux: usize },
    #[error("Wavelength grid must be strictly increasing")]
    UnsortedGrid,
}

fn strictly_increasing(values: ArrayView1<f64>) -> bool {
    values.windows(2).into_iter().all(|pair| pair[1] > pair[0])
}

/// Running integral of a piecewise-linear density sampled at `xs`.
struct CumulativeIntegral<'a> {
    xs: ArrayView1<'a, f64>,
    ys: ArrayView1<'a, f64>,
    nodes: Vec<f64>,
}

impl<'a> CumulativeIntegral<'a> {
    fn new(xs: ArrayView1<'a, f64>, ys: ArrayView1<'a, f64>) -> Self {
        let mut nodes = Vec::with_capacity(xs.len());
        nodes.push(0.0);
        for i in 1..xs.len() {
            let area = (xs[i] - xs[i - 1]) * (ys[i] + ys[i - 1]) / 2.0;
            nodes.push(nodes[i - 1] + area);
        }
        Self { xs, ys, nodes }
    }

    fn at(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return 0.0;
        }
        if x >= self.xs[n - 1] {
            return self.nodes[n - 1];
        }

        // Segment i satisfies xs[i] <= x < xs[i + 1]
        let i = self
            .xs
            .as_slice()
            .map(|s| s.partition_point(|&v| v <= x))
            .unwrap_or_else(|| self.xs.iter().take_while(|&&v| v <= x).count())
            - 1;

        let (x1, x2) = (self.xs[i], self.xs[i + 1]);
        let (y1, y2) = (self.ys[i], self.ys[i + 1]);
        let y = y1 + (x - x1) / (x2 - x1) * (y2 - y1);
        self.nodes[i] + (x - x1) * (y1 + y) / 2.0
    }
}

/// Bin edges centred on each output wavelength.
fn bin_edges(xout: ArrayView1<f64>) -> Array1<f64> {
    let n = xout.len();
    let mut edges = Array1::<f64>::zeros(n + 1);
    edges[0] = xout[0] - (xout[1] - xout[0]) / 2.0;
    for i in 1..n {
        edges[i] = (xout[i - 1] + xout[i]) / 2.0;
    }
    edges[n] = xout[n - 1] + (xout[n - 1] - xout[n - 2]) / 2.0;
    edges
}

/// Resample a flux density from grid `xin` onto grid `xout`.
///
/// # Arguments
/// * `xout` - Output wavelength grid (strictly increasing)
/// * `xin` - Input wavelength grid (strictly increasing)
/// * `yin` - Flux density sampled on `xin`
///
/// # Returns
/// The mean of the input density over each output bin.
pub fn resample_flux<'a>(
    xout: ArrayView1<f64>,
    xin: ArrayView1<'a, f64>,
    yin: ArrayView1<'a, f64>,
) -> Result<Array1<f64>, ResampleError> {
    if xin.len() != yin.len() {
        return Err(ResampleError::MismatchedLengths {
            wave: xin.len(),
            flux: yin.len(),
        });
    }
    if xin.len() < 2 {
        return Err(ResampleError::InputTooShort(xin.len()));
    }
    if xout.len() < 2 {
        return Err(ResampleError::OutputTooShort(xout.len()));
    }
    if !strictly_increasing(xin) || !strictly_increasing(xout) {
        return Err(ResampleError::UnsortedGrid);
    }

    let integral = CumulativeIntegral::new(xin, yin);
    let edges = bin_edges(xout);

    Ok(Array1::from_shape_fn(xout.len(), |i| {
        let (lo, hi) = (edges[i], edges[i + 1]);
        (integral.at(hi) - integral.at(lo)) / (hi - lo)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_constant_density_is_preserved_inside_coverage() {
        let xin = Array1::linspace(3000.0, 6000.0, 3001);
        let yin = Array1::from_elem(xin.len(), 4.0);
        let xout = Array1::linspace(3500.0, 5500.0, 401);

        let out = resample_flux(xout.view(), xin.view(), yin.view()).unwrap();
        for v in out.iter() {
            assert_relative_eq!(*v, 4.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_linear_density_sampled_at_bin_centres() {
        let xin = Array1::linspace(0.0, 100.0, 101);
        let yin = xin.mapv(|x| 2.0 * x + 1.0);
        let xout = Array1::linspace(10.0, 90.0, 17);

        let out = resample_flux(xout.view(), xin.view(), yin.view()).unwrap();
        for (x, v) in xout.iter().zip(out.iter()) {
            assert_relative_eq!(*v, 2.0 * x + 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_total_flux_is_conserved() {
        let xin = Array1::linspace(0.0, 10.0, 1001);
        let yin = xin.mapv(|x: f64| (x / 3.0).sin().abs() + 0.5);
        let xout = Array1::linspace(1.0, 9.0, 33);

        let out = resample_flux(xout.view(), xin.view(), yin.view()).unwrap();
        let edges = bin_edges(xout.view());
        let resampled_total: f64 = out
            .iter()
            .enumerate()
            .map(|(i, v)| v * (edges[i + 1] - edges[i]))
            .sum();

        let integral = CumulativeIntegral::new(xin.view(), yin.view());
        let expected = integral.at(edges[edges.len() - 1]) - integral.at(edges[0]);
        assert_relative_eq!(resampled_total, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_outside_coverage_is_zero() {
        let xin = array![10.0, 11.0, 12.0];
        let yin = array![1.0, 1.0, 1.0];
        let xout = array![100.0, 101.0, 102.0];
        let out = resample_flux(xout.view(), xin.view(), yin.view()).unwrap();
        assert_eq!(out, array![0.0, 0.0, 0.0]);
    }

    fn resample_row(xout: &Array1<f64>, xin: &Array1<f64>, rows: &ndarray::Array2<f64>, j: usize) -> Array1<f64> {
        resample_flux(xout.view(), xin.view(), rows.row(j)).unwrap()
    }

    #[test]
    fn test_row_views_of_separate_arrays() {
        let xin = Array1::linspace(4000.0, 5000.0, 101);
        let rows = ndarray::Array2::from_shape_fn((2, 101), |(j, _)| 1.0 + j as f64);
        let xout = Array1::linspace(4100.0, 4900.0, 9);

        let out = resample_row(&xout, &xin, &rows, 1);
        for v in out.iter() {
            assert_relative_eq!(*v, 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rejects_bad_grids() {
        let xin = array![1.0, 2.0];
        let yin = array![1.0];
        assert!(matches!(
            resample_flux(xin.view(), xin.view(), yin.view()),
            Err(ResampleError::MismatchedLengths { .. })
        ));

        let unsorted = array![2.0, 1.0];
        let flux = array![1.0, 1.0];
        assert_eq!(
            resample_flux(xin.view(), unsorted.view(), flux.view()),
            Err(ResampleError::UnsortedGrid)
        );
    }
}
