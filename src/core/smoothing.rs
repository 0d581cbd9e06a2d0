use crate::types::{SarError, SarResult};
use ndarray::{Array2, Axis};

/// Gaussian smoothing parameters
#[derive(Debug, Clone)]
pub struct GaussianSmoothingParams {
    /// Standard deviation in pixels (<= 0 disables smoothing)
    pub sigma: f64,
    /// Kernel half-width in units of sigma
    pub truncate: f64,
}

impl Default for GaussianSmoothingParams {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            truncate: 4.0,
        }
    }
}

/// Separable Gaussian filter used to suppress speckle before offset tracking
pub struct GaussianSmoother {
    params: GaussianSmoothingParams,
}

impl GaussianSmoother {
    /// Create a smoother with default parameters
    pub fn new() -> Self {
        Self {
            params: GaussianSmoothingParams::default(),
        }
    }

    /// Create a smoother for a given sigma
    pub fn with_sigma(sigma: f64) -> Self {
        Self::with_params(GaussianSmoothingParams {
            sigma,
            ..GaussianSmoothingParams::default()
        })
    }

    pub fn with_params(params: GaussianSmoothingParams) -> Self {
        Self { params }
    }

    /// Smooth a real image.
    ///
    /// Borders are extended by half-sample symmetric reflection
    /// (`d c b a | a b c d | d c b a`).
    pub fn apply(&self, image: &Array2<f64>) -> SarResult<Array2<f64>> {
        if !self.params.sigma.is_finite() || !self.params.truncate.is_finite() {
            return Err(SarError::InvalidParameter(format!(
                "Gaussian sigma {} / truncate {} must be finite",
                self.params.sigma, self.params.truncate
            )));
        }
        if self.params.sigma <= 0.0 || image.is_empty() {
            return Ok(image.clone());
        }

        let kernel = self.kernel();
        log::debug!(
            "Gaussian smoothing {}x{} image, sigma {}, kernel radius {}",
            image.nrows(),
            image.ncols(),
            self.params.sigma,
            kernel.len() / 2
        );

        let rows_done = convolve_axis(image, &kernel, Axis(0));
        Ok(convolve_axis(&rows_done, &kernel, Axis(1)))
    }

    /// Normalized 1D kernel of length `2 * radius + 1`
    fn kernel(&self) -> Vec<f64> {
        let sigma = self.params.sigma;
        let radius = (self.params.truncate * sigma + 0.5) as usize;
        let weights: Vec<f64> = (0..=2 * radius)
            .map(|k| {
                let x = k as f64 - radius as f64;
                (-0.5 * x * x / (sigma * sigma)).exp()
            })
            .collect();
        let sum: f64 = weights.iter().sum();
        weights.into_iter().map(|w| w / sum).collect()
    }
}

impl Default for GaussianSmoother {
    fn default() -> Self {
        Self::new()
    }
}

fn convolve_axis(image: &Array2<f64>, kernel: &[f64], axis: Axis) -> Array2<f64> {
    let radius = kernel.len() / 2;
    let len = image.len_of(axis);
    let mut output = Array2::zeros(image.dim());

    for (lane_in, mut lane_out) in image.lanes(axis).into_iter().zip(output.lanes_mut(axis)) {
        for i in 0..len {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let idx = reflect_index(i as isize + k as isize - radius as isize, len);
                acc += weight * lane_in[idx];
            }
            lane_out[i] = acc;
        }
    }

    output
}

/// Fold an out-of-range index back into `0..len` by half-sample reflection.
pub(crate) fn reflect_index(index: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let mut folded = index.rem_euclid(period);
    if folded >= len {
        folded = period - 1 - folded;
    }
    folded as usize
}
