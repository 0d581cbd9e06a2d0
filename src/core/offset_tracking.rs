//! Window-based offset tracking between two co-located magnitude images.
//!
//! Each `window_size x window_size` window of the reference is correlated
//! against the same window of the target. The correlation at lag `d` is
//! `sum_i ref_ext[i + d] * tgt[i]`, where `ref_ext` is the reference window
//! extended by half-sample symmetric reflection, for lags in
//! `-c..window_size - c` with `c = window_size / 2`. The offset reported for
//! a window is the lag of the correlation maximum, so a feature displaced by
//! `s` pixels in the target reports `-s`.

use crate::core::fft::Fft2d;
use crate::core::smoothing::reflect_index;
use crate::types::{OffsetGrid, SarError, SarResult};
use ndarray::{s, Array2, ArrayView2};
use num_complex::Complex;
use rustfft::FftDirection;

/// Relative tolerance under which the zero lag wins a correlation tie
const CENTRE_TIE_TOLERANCE: f64 = 1e-9;

/// Offset tracking parameters
#[derive(Debug, Clone)]
pub struct OffsetTrackingParams {
    /// Side of the square correlation window
    pub window_size: usize,
    /// Stride between adjacent windows
    pub step_size: usize,
    /// Refine the integer peak with a 3-point parabola per axis
    pub subpixel_refinement: bool,
}

impl Default for OffsetTrackingParams {
    fn default() -> Self {
        Self {
            window_size: 64,
            step_size: 32,
            subpixel_refinement: false,
        }
    }
}

/// Estimates per-window (range, azimuth) pixel offsets
pub struct OffsetTracker {
    params: OffsetTrackingParams,
}

impl OffsetTracker {
    pub fn new(params: OffsetTrackingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &OffsetTrackingParams {
        &self.params
    }

    /// Window count per axis, `floor((dim - window) / step) + 1`, or 0 when the
    /// image is smaller than one window.
    pub fn grid_dim(&self, image_dim: (usize, usize)) -> (usize, usize) {
        let count = |len: usize| {
            if len < self.params.window_size || self.params.step_size == 0 {
                0
            } else {
                (len - self.params.window_size) / self.params.step_size + 1
            }
        };
        (count(image_dim.0), count(image_dim.1))
    }

    /// Track `target` against `reference`, returning (range, azimuth) offset grids.
    ///
    /// Pixels beyond the last full window are not covered. An image smaller
    /// than one window gives empty grids rather than an error.
    pub fn estimate(
        &self,
        reference: &Array2<f64>,
        target: &Array2<f64>,
    ) -> SarResult<(OffsetGrid, OffsetGrid)> {
        if reference.dim() != target.dim() {
            return Err(SarError::ShapeMismatch {
                reference: reference.dim(),
                target: target.dim(),
            });
        }
        if self.params.window_size == 0 || self.params.step_size == 0 {
            return Err(SarError::InvalidParameter(format!(
                "Window size ({}) and step size ({}) must be positive",
                self.params.window_size, self.params.step_size
            )));
        }

        let (n_rows, n_cols) = self.grid_dim(reference.dim());
        if n_rows == 0 || n_cols == 0 {
            log::warn!(
                "Image {}x{} is smaller than one {}px tracking window, no offsets produced",
                reference.nrows(),
                reference.ncols(),
                self.params.window_size
            );
            return Ok((Array2::zeros((n_rows, n_cols)), Array2::zeros((n_rows, n_cols))));
        }

        log::debug!(
            "Tracking {}x{} windows of {}px with step {}",
            n_rows,
            n_cols,
            self.params.window_size,
            self.params.step_size
        );

        let correlator = Correlator::new(self.params.window_size);
        let cells: Vec<(usize, usize)> = (0..n_rows)
            .flat_map(|y| (0..n_cols).map(move |x| (y, x)))
            .collect();
        let offsets = self.track_windows(&correlator, reference, target, &cells);

        let mut range_offsets = Array2::zeros((n_rows, n_cols));
        let mut azimuth_offsets = Array2::zeros((n_rows, n_cols));
        for (&(y, x), (range, azimuth)) in cells.iter().zip(offsets) {
            range_offsets[[y, x]] = range;
            azimuth_offsets[[y, x]] = azimuth;
        }

        Ok((range_offsets, azimuth_offsets))
    }

    #[cfg(feature = "parallel")]
    fn track_windows(
        &self,
        correlator: &Correlator,
        reference: &Array2<f64>,
        target: &Array2<f64>,
        cells: &[(usize, usize)],
    ) -> Vec<(f64, f64)> {
        use rayon::prelude::*;

        cells
            .par_iter()
            .map(|&cell| self.track_window(correlator, reference, target, cell))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn track_windows(
        &self,
        correlator: &Correlator,
        reference: &Array2<f64>,
        target: &Array2<f64>,
        cells: &[(usize, usize)],
    ) -> Vec<(f64, f64)> {
        cells
            .iter()
            .map(|&cell| self.track_window(correlator, reference, target, cell))
            .collect()
    }

    fn track_window(
        &self,
        correlator: &Correlator,
        reference: &Array2<f64>,
        target: &Array2<f64>,
        (y, x): (usize, usize),
    ) -> (f64, f64) {
        let size = self.params.window_size;
        let y0 = y * self.params.step_size;
        let x0 = x * self.params.step_size;
        let correlation = correlator.correlate(
            reference.slice(s![y0..y0 + size, x0..x0 + size]),
            target.slice(s![y0..y0 + size, x0..x0 + size]),
        );
        let (peak_row, peak_col) = locate_peak(&correlation);

        let (delta_row, delta_col) = if self.params.subpixel_refinement {
            refine_peak_parabolic(&correlation, peak_row, peak_col)
        } else {
            (0.0, 0.0)
        };

        let centre = (size / 2) as f64;
        (
            peak_row as f64 - centre + delta_row,
            peak_col as f64 - centre + delta_col,
        )
    }
}

/// Same-size cross-correlation of square windows via zero-padded FFTs
struct Correlator {
    size: usize,
    forward: Fft2d<f64>,
    inverse: Fft2d<f64>,
}

impl Correlator {
    fn new(size: usize) -> Self {
        // The extended reference spans 2 * size - 1 samples per axis.
        let padded = (2 * size).next_power_of_two();
        Self {
            size,
            forward: Fft2d::new((padded, padded), FftDirection::Forward),
            inverse: Fft2d::new((padded, padded), FftDirection::Inverse),
        }
    }

    fn correlate(&self, reference: ArrayView2<f64>, target: ArrayView2<f64>) -> Array2<f64> {
        let size = self.size;
        let centre = (size / 2) as isize;
        let padded = self.forward.shape();
        let zero = Complex::new(0.0, 0.0);

        let mut extended = Array2::from_elem(padded, zero);
        for k in 0..2 * size - 1 {
            let src_row = reflect_index(k as isize - centre, size);
            for l in 0..2 * size - 1 {
                let src_col = reflect_index(l as isize - centre, size);
                extended[[k, l]] = Complex::new(reference[[src_row, src_col]], 0.0);
            }
        }

        let mut kernel = Array2::from_elem(padded, zero);
        kernel
            .slice_mut(s![..size, ..size])
            .assign(&target.mapv(|value| Complex::new(value, 0.0)));

        self.forward.process(&mut extended);
        self.forward.process(&mut kernel);
        extended.zip_mut_with(&kernel, |e, k| *e *= k.conj());
        self.inverse.process(&mut extended);

        extended.slice(s![..size, ..size]).mapv(|value| value.re)
    }
}

/// Index of the correlation maximum.
///
/// The first maximum in row-major order wins, except that the window centre
/// (zero lag) is kept whenever it is within a relative tolerance of the
/// maximum. Flat and all-zero windows therefore map to zero offset.
pub fn locate_peak(correlation: &Array2<f64>) -> (usize, usize) {
    let (rows, cols) = correlation.dim();
    let centre = (rows / 2, cols / 2);

    let mut best = centre;
    let mut best_value = f64::NEG_INFINITY;
    for ((i, j), &value) in correlation.indexed_iter() {
        if value > best_value {
            best = (i, j);
            best_value = value;
        }
    }

    if rows == 0 || cols == 0 {
        return centre;
    }
    let centre_value = correlation[centre];
    if !best_value.is_finite() || centre_value >= best_value - CENTRE_TIE_TOLERANCE * best_value.abs() {
        return centre;
    }
    best
}

/// Fractional (row, col) correction from a 3-point parabola through the peak
/// and its neighbours on each axis, clamped to half a pixel. Peaks on the
/// border are not refined.
pub fn refine_peak_parabolic(correlation: &Array2<f64>, row: usize, col: usize) -> (f64, f64) {
    let (rows, cols) = correlation.dim();
    if row == 0 || row + 1 >= rows || col == 0 || col + 1 >= cols {
        return (0.0, 0.0);
    }

    let vertex = |prev: f64, curr: f64, next: f64| {
        let curvature = prev - 2.0 * curr + next;
        if curvature.abs() > 1e-12 {
            ((prev - next) / (2.0 * curvature)).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    };

    let centre = correlation[[row, col]];
    (
        vertex(correlation[[row - 1, col]], centre, correlation[[row + 1, col]]),
        vertex(correlation[[row, col - 1]], centre, correlation[[row, col + 1]]),
    )
}
