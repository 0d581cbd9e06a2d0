//! FFT helpers over 2D grids, built on `rustfft`.

use ndarray::{Array2, ArrayView1, Axis};
use num_complex::Complex;
use rustfft::{Fft, FftDirection, FftNum, FftPlanner};
use std::sync::Arc;

/// Planned 2D transform for a fixed grid shape.
///
/// The plans are immutable once built, so one instance can be shared across
/// worker threads. Inverse transforms are normalized by `1 / (rows * cols)`.
pub struct Fft2d<T: FftNum> {
    row_fft: Arc<dyn Fft<T>>,
    col_fft: Arc<dyn Fft<T>>,
    shape: (usize, usize),
    direction: FftDirection,
}

impl<T: FftNum> Fft2d<T> {
    pub fn new(shape: (usize, usize), direction: FftDirection) -> Self {
        let mut planner = FftPlanner::<T>::new();
        Self {
            row_fft: planner.plan_fft(shape.1, direction),
            col_fft: planner.plan_fft(shape.0, direction),
            shape,
            direction,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Transform `data` in place; its shape must match the planned shape.
    pub fn process(&self, data: &mut Array2<Complex<T>>) {
        debug_assert_eq!(data.dim(), self.shape);
        if data.is_empty() {
            return;
        }
        process_lanes(data, Axis(1), self.row_fft.as_ref());
        process_lanes(data, Axis(0), self.col_fft.as_ref());
        if self.direction == FftDirection::Inverse {
            normalize(data, self.shape.0 * self.shape.1);
        }
    }
}

/// 1D transform of every lane along `axis`.
///
/// `Axis(1)` transforms each row (the azimuth direction), `Axis(0)` each column.
pub fn transform_axis<T: FftNum>(data: &mut Array2<Complex<T>>, axis: Axis, direction: FftDirection) {
    let len = data.len_of(axis);
    if len == 0 || data.is_empty() {
        return;
    }
    let fft = FftPlanner::<T>::new().plan_fft(len, direction);
    process_lanes(data, axis, fft.as_ref());
    if direction == FftDirection::Inverse {
        normalize(data, len);
    }
}

fn process_lanes<T: FftNum>(data: &mut Array2<Complex<T>>, axis: Axis, fft: &dyn Fft<T>) {
    let mut scratch = vec![Complex::new(T::zero(), T::zero()); fft.get_inplace_scratch_len()];
    let mut buffer = Vec::with_capacity(data.len_of(axis));

    for mut lane in data.lanes_mut(axis) {
        match lane.as_slice_mut() {
            Some(slice) => fft.process_with_scratch(slice, &mut scratch),
            None => {
                buffer.clear();
                buffer.extend(lane.iter().copied());
                fft.process_with_scratch(&mut buffer, &mut scratch);
                lane.assign(&ArrayView1::from(&buffer[..]));
            }
        }
    }
}

fn normalize<T: FftNum>(data: &mut Array2<Complex<T>>, len: usize) {
    let scale = T::one() / T::from_usize(len).unwrap_or_else(T::one);
    data.mapv_inplace(|value| value * scale);
}

/// Forward 2D transform of a real grid
pub fn fft2_real(grid: &Array2<f64>) -> Array2<Complex<f64>> {
    let mut spectrum = grid.mapv(|value| Complex::new(value, 0.0));
    Fft2d::new(grid.dim(), FftDirection::Forward).process(&mut spectrum);
    spectrum
}

/// Move the zero-frequency bin to index `n / 2` on both axes.
pub fn fftshift<T: Clone>(grid: &Array2<T>) -> Array2<T> {
    let (rows, cols) = grid.dim();
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        grid[[(i + rows - rows / 2) % rows, (j + cols - cols / 2) % cols]].clone()
    })
}

/// Bin frequencies of an `n`-point transform, in fftshift order (ascending).
pub fn shifted_frequencies(n: usize, sampling_freq: f64) -> Vec<f64> {
    let half = (n / 2) as f64;
    (0..n)
        .map(|i| (i as f64 - half) * sampling_freq / n as f64)
        .collect()
}
