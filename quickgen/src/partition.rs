//! Tiling of the simulated spectrum range into spectrograph windows.
//!
//! Each physical spectrograph holds 500 fibers. Window `k` covers spectrum
//! indices `[max(500k, nstart), min(500(k+1), nmax))`; together the windows
//! tile `[nstart, nmax)` with no gaps or overlaps. Windows below the
//! minimum-spectrograph filter are not emitted at all.

use std::ops::Range;
use std::sync::Arc;

use ndarray::{Array2, Array3, Axis};

use crate::error::{QuickGenError, Result};

/// Fibers per spectrograph
pub const SPECTRA_PER_SPECTROGRAPH: usize = 500;

/// Contiguous block of spectra belonging to one spectrograph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectrographWindow {
    pub index: usize,
    pub range: Range<usize>,
}

impl SpectrographWindow {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// All non-empty windows over `[nstart, nmax)`.
///
/// `nspec` is the requested spectrum count; it fixes how many windows are
/// considered, while `nmax` clips the last one to the spectra available.
pub fn spectrograph_windows(nstart: usize, nspec: usize, nmax: usize) -> Vec<SpectrographWindow> {
    if nspec == 0 {
        return Vec::new();
    }
    // Spectrographs wholly before nstart would be empty
    let first = nstart / SPECTRA_PER_SPECTROGRAPH;
    let last = nstart.saturating_add(nspec - 1) / SPECTRA_PER_SPECTROGRAPH;
    (first..=last)
        .map(|k| {
            let start = (SPECTRA_PER_SPECTROGRAPH * k).max(nstart);
            let end = SPECTRA_PER_SPECTROGRAPH.saturating_mul(k + 1).min(nmax);
            SpectrographWindow {
                index: k,
                range: start..end.max(start),
            }
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Windows that pass the minimum-spectrograph filter.
pub fn emitted_windows(windows: &[SpectrographWindow], min_spectrograph: usize) -> Vec<SpectrographWindow> {
    windows
        .iter()
        .filter(|w| w.index >= min_spectrograph)
        .cloned()
        .collect()
}

/// Banded resolution matrix broadcast identically to `rows` spectra.
#[derive(Debug, Clone)]
pub struct ResolutionStack {
    band: Arc<Array2<f64>>,
    rows: usize,
}

/// The rows of a [`ResolutionStack`] that belong to one window.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionSlice {
    band: Arc<Array2<f64>>,
    /// Row indices within the broadcast stack
    pub rows: Range<usize>,
}

impl ResolutionStack {
    pub fn new(band: Arc<Array2<f64>>, rows: usize) -> Self {
        Self { band, rows }
    }

    /// Rows for `window`.
    ///
    /// A window starting at the first simulated spectrum takes the leading
    /// rows of the stack; any other window takes the trailing rows. That
    /// keeps later windows aligned when earlier ones were filtered out.
    pub fn slice_for(&self, window: &SpectrographWindow, nstart: usize) -> Result<ResolutionSlice> {
        let n = window.len();
        if n > self.rows {
            return Err(QuickGenError::Resolution(format!(
                "window {} needs {} rows but only {} are broadcast",
                window.index, n, self.rows
            )));
        }
        let rows = if window.range.start == nstart {
            0..n
        } else {
            self.rows - n..self.rows
        };
        Ok(ResolutionSlice {
            band: Arc::clone(&self.band),
            rows,
        })
    }
}

impl ResolutionSlice {
    pub fn nspec(&self) -> usize {
        self.rows.len()
    }

    /// Materialize as `[spectrum, diagonal, pixel]`.
    pub fn to_array3(&self) -> Array3<f64> {
        let (ndiag, npix) = self.band.dim();
        let mut out = Array3::<f64>::zeros((self.nspec(), ndiag, npix));
        for mut row in out.axis_iter_mut(Axis(0)) {
            row.assign(&*self.band);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(windows: &[SpectrographWindow]) -> Vec<(usize, Range<usize>)> {
        windows.iter().map(|w| (w.index, w.range.clone())).collect()
    }

    #[test]
    fn test_650_from_zero() {
        let windows = spectrograph_windows(0, 650, 650);
        assert_eq!(ranges(&windows), vec![(0, 0..500), (1, 500..650)]);

        let emitted = emitted_windows(&windows, 1);
        assert_eq!(ranges(&emitted), vec![(1, 500..650)]);
    }

    #[test]
    fn test_offset_start_straddles_boundary() {
        let windows = spectrograph_windows(400, 150, 550);
        assert_eq!(ranges(&windows), vec![(0, 400..500), (1, 500..550)]);
    }

    #[test]
    fn test_start_beyond_first_spectrograph() {
        let windows = spectrograph_windows(600, 100, 700);
        assert_eq!(ranges(&windows), vec![(1, 600..700)]);
    }

    #[test]
    fn test_huge_start_does_not_overflow() {
        assert!(spectrograph_windows(usize::MAX - 1, 10, 5000).is_empty());
    }

    #[test]
    fn test_tiling_is_exact() {
        for (nstart, nspec, available) in [(0, 1, 5000), (0, 5000, 5000), (123, 987, 5000), (499, 2, 5000), (10, 5000, 3000)] {
            let nspec = nspec.min(available);
            let nmax = (nspec + nstart).min(available);
            let windows = spectrograph_windows(nstart, nspec, nmax);

            let mut next = nstart;
            for w in &windows {
                assert_eq!(w.range.start, next, "gap or overlap at {next}");
                assert!(w.len() <= SPECTRA_PER_SPECTROGRAPH);
                assert_eq!(w.range.start / SPECTRA_PER_SPECTROGRAPH, w.index);
                next = w.range.end;
            }
            assert_eq!(next, nmax);
        }
    }

    #[test]
    fn test_resolution_leading_and_trailing_rows() {
        let band = Arc::new(Array2::from_shape_fn((3, 4), |(d, p)| (d * 10 + p) as f64));
        let stack = ResolutionStack::new(band, 150);
        let windows = spectrograph_windows(400, 150, 550);

        let first = stack.slice_for(&windows[0], 400).unwrap();
        assert_eq!(first.rows, 0..100);
        let second = stack.slice_for(&windows[1], 400).unwrap();
        assert_eq!(second.rows, 100..150);

        let cube = second.to_array3();
        assert_eq!(cube.dim(), (50, 3, 4));
        assert_eq!(cube[[49, 2, 3]], 23.0);
    }

    #[test]
    fn test_resolution_after_filtered_window() {
        let band = Arc::new(Array2::ones((3, 4)));
        let stack = ResolutionStack::new(band, 650);
        let windows = spectrograph_windows(0, 650, 650);
        let emitted = emitted_windows(&windows, 1);

        let slice = stack.slice_for(&emitted[0], 0).unwrap();
        assert_eq!(slice.rows, 500..650);
    }

    #[test]
    fn test_resolution_too_few_rows() {
        let stack = ResolutionStack::new(Arc::new(Array2::ones((3, 4))), 10);
        let window = SpectrographWindow { index: 0, range: 0..20 };
        assert!(matches!(
            stack.slice_for(&window, 0),
            Err(QuickGenError::Resolution(_))
        ));
    }
}
