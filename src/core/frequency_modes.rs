use crate::core::fft::{fft2_real, fftshift, shifted_frequencies};
use crate::types::{DisplacementField, FrequencyPeak, SarError, SarResult};
use ndarray::Array2;

/// Frequency analysis parameters
#[derive(Debug, Clone)]
pub struct FrequencyAnalysisParams {
    /// Peaks must exceed this fraction of the spectrum maximum
    pub peak_threshold: f64,
    /// Chebyshev radius, in cells, a peak must dominate
    pub min_distance: usize,
    /// Number of peaks reported
    pub top_k: usize,
    pub sampling_freq: f64,
}

impl Default for FrequencyAnalysisParams {
    fn default() -> Self {
        Self {
            peak_threshold: 0.7,
            min_distance: 5,
            top_k: 5,
            sampling_freq: 1.0,
        }
    }
}

/// Spectrum of a displacement field and its ranked peaks
#[derive(Debug, Clone)]
pub struct FrequencyAnalysis {
    /// Top-K peaks, amplitude descending
    pub peaks: Vec<FrequencyPeak>,
    /// Every accepted peak, amplitude descending
    pub all_peaks: Vec<FrequencyPeak>,
    /// Centred magnitude spectrum
    pub spectrum: Array2<f64>,
    pub freq_y: Vec<f64>,
    pub freq_x: Vec<f64>,
}

/// Locates dominant spatial frequencies of a displacement magnitude field
pub struct FrequencyModeAnalyzer {
    params: FrequencyAnalysisParams,
}

impl FrequencyModeAnalyzer {
    pub fn new() -> Self {
        Self {
            params: FrequencyAnalysisParams::default(),
        }
    }

    pub fn with_params(params: FrequencyAnalysisParams) -> Self {
        Self { params }
    }

    /// Analyze the magnitude grid of `field`
    pub fn analyze(&self, field: &DisplacementField) -> SarResult<FrequencyAnalysis> {
        self.analyze_grid(&field.magnitude)
    }

    /// Analyze any real grid.
    ///
    /// Candidates are discovered in row-major order and stably sorted by
    /// amplitude, so equal amplitudes keep row-major order.
    pub fn analyze_grid(&self, grid: &Array2<f64>) -> SarResult<FrequencyAnalysis> {
        let params = &self.params;
        if !(params.sampling_freq.is_finite() && params.sampling_freq > 0.0) {
            return Err(SarError::InvalidParameter(format!(
                "Sampling frequency {} must be positive",
                params.sampling_freq
            )));
        }
        if !(0.0..=1.0).contains(&params.peak_threshold) {
            return Err(SarError::InvalidParameter(format!(
                "Peak threshold {} is outside [0, 1]",
                params.peak_threshold
            )));
        }

        let (ny, nx) = grid.dim();
        let freq_y = shifted_frequencies(ny, params.sampling_freq);
        let freq_x = shifted_frequencies(nx, params.sampling_freq);

        if grid.is_empty() {
            log::debug!("Empty displacement field, skipping frequency analysis");
            return Ok(FrequencyAnalysis {
                peaks: Vec::new(),
                all_peaks: Vec::new(),
                spectrum: Array2::zeros((ny, nx)),
                freq_y,
                freq_x,
            });
        }

        let spectrum = fftshift(&fft2_real(grid)).mapv(|value| value.norm());
        let global_max = spectrum.iter().copied().fold(0.0, f64::max);
        let floor = params.peak_threshold * global_max;

        let mut all_peaks: Vec<FrequencyPeak> = spectrum
            .indexed_iter()
            .filter(|&(idx, &value)| value > floor && is_local_max(&spectrum, idx, params.min_distance))
            .map(|((row, col), &amplitude)| FrequencyPeak {
                frequency: (freq_y[row], freq_x[col]),
                amplitude,
                peak_location: (row, col),
            })
            .collect();
        all_peaks.sort_by(|a, b| b.amplitude.total_cmp(&a.amplitude));

        let peaks: Vec<FrequencyPeak> = all_peaks.iter().take(params.top_k).cloned().collect();
        log::debug!(
            "Spectrum {}x{}: {} peaks above {:.4}, reporting {}",
            ny,
            nx,
            all_peaks.len(),
            floor,
            peaks.len()
        );

        Ok(FrequencyAnalysis {
            peaks,
            all_peaks,
            spectrum,
            freq_y,
            freq_x,
        })
    }
}

impl Default for FrequencyModeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the cell dominates every other cell within `radius`.
///
/// Equal values are resolved in row-major order: the cell must strictly
/// exceed neighbours that come before it and be at least as large as those
/// after it, so of two tied maxima (such as the conjugate pair of a real
/// tone close to DC) exactly the first one is kept.
fn is_local_max(spectrum: &Array2<f64>, (row, col): (usize, usize), radius: usize) -> bool {
    let (rows, cols) = spectrum.dim();
    let value = spectrum[[row, col]];
    let row_end = (row + radius + 1).min(rows);
    let col_end = (col + radius + 1).min(cols);

    for i in row.saturating_sub(radius)..row_end {
        for j in col.saturating_sub(radius)..col_end {
            let other = spectrum[[i, j]];
            let beaten = if (i, j) < (row, col) {
                other >= value
            } else {
                other > value
            };
            if beaten {
                return false;
            }
        }
    }
    true
}
