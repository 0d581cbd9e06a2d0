//! Ship micro-motion estimation from a single SAR image.
//!
//! The azimuth spectrum is split into two Doppler looks. Ships detected in the
//! first look are cropped from both looks, tracked window by window, and the
//! resulting displacement field is searched for dominant spatial frequencies.

use crate::core::displacement::DisplacementFieldBuilder;
use crate::core::frequency_modes::{FrequencyAnalysisParams, FrequencyModeAnalyzer};
use crate::core::offset_tracking::{OffsetTracker, OffsetTrackingParams};
use crate::core::ship_detection::{ShipDetectionParams, ShipDetector, ThresholdShipDetector};
use crate::core::smoothing::GaussianSmoother;
use crate::core::subaperture::SubApertureSplitter;
use crate::types::{
    DisplacementField, EstimationMetadata, EstimationResult, FrequencyPeak, SarComplex, SarError,
    SarImage, SarRealImage, SarResult, ShipRegion, ShipResult,
};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

/// Micro-motion estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicroMotionParams {
    /// Pre-smoothing of look magnitudes before tracking (<= 0 disables)
    pub gaussian_sigma: f64,
    /// Side of the tracking window in pixels
    pub window_size: usize,
    /// Fraction of a window shared with its neighbour
    pub overlap_ratio: f64,
    /// Reserved for multi-aperture processing
    pub fft_size: usize,
    /// Relative spectrum threshold for frequency peaks
    pub peak_threshold: f64,
    /// Relative magnitude threshold for ship detection
    pub detection_threshold: f32,
    pub num_subapertures: usize,
    pub min_ship_area: usize,
    pub ship_padding: usize,
    pub min_peak_distance: usize,
    /// Peaks reported per ship
    pub top_k: usize,
    pub sampling_freq: f64,
    pub subpixel_refinement: bool,
}

impl Default for MicroMotionParams {
    fn default() -> Self {
        Self {
            gaussian_sigma: 2.0,
            window_size: 64,
            overlap_ratio: 0.5,
            fft_size: 1024,
            peak_threshold: 0.7,
            detection_threshold: 0.8,
            num_subapertures: 2,
            min_ship_area: 100,
            ship_padding: 10,
            min_peak_distance: 5,
            top_k: 5,
            sampling_freq: 1.0,
            subpixel_refinement: false,
        }
    }
}

impl MicroMotionParams {
    /// Stride between tracking windows, `floor(window * (1 - overlap))`, at least 1
    pub fn step_size(&self) -> usize {
        ((self.window_size as f64 * (1.0 - self.overlap_ratio)) as usize).max(1)
    }

    pub fn validate(&self) -> SarResult<()> {
        let invalid = |msg: String| Err(SarError::InvalidParameter(msg));

        if self.window_size == 0 {
            return invalid("window_size must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return invalid(format!("overlap_ratio {} is outside [0, 1)", self.overlap_ratio));
        }
        if !(0.0..=1.0).contains(&self.peak_threshold) {
            return invalid(format!("peak_threshold {} is outside [0, 1]", self.peak_threshold));
        }
        if !(0.0..=1.0).contains(&self.detection_threshold) {
            return invalid(format!(
                "detection_threshold {} is outside [0, 1]",
                self.detection_threshold
            ));
        }
        if self.num_subapertures < 2 {
            return invalid(format!(
                "num_subapertures must be at least 2, got {}",
                self.num_subapertures
            ));
        }
        if self.top_k == 0 {
            return invalid("top_k must be positive".to_string());
        }
        if !(self.sampling_freq.is_finite() && self.sampling_freq > 0.0) {
            return invalid(format!("sampling_freq {} must be positive", self.sampling_freq));
        }
        if !self.gaussian_sigma.is_finite() {
            return invalid(format!("gaussian_sigma {} must be finite", self.gaussian_sigma));
        }
        Ok(())
    }
}

/// Runs the two-look micro-motion pipeline over whole images
pub struct MicroMotionEstimator {
    params: MicroMotionParams,
    detector: Box<dyn ShipDetector>,
}

impl std::fmt::Debug for MicroMotionEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MicroMotionEstimator")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl MicroMotionEstimator {
    /// Estimator with default parameters
    pub fn new() -> Self {
        Self::from_parts(MicroMotionParams::default())
    }

    /// Estimator with custom parameters and the threshold detector
    pub fn with_params(params: MicroMotionParams) -> SarResult<Self> {
        params.validate()?;
        Ok(Self::from_parts(params))
    }

    fn from_parts(params: MicroMotionParams) -> Self {
        let detector = ThresholdShipDetector::with_params(ShipDetectionParams {
            min_area: params.min_ship_area,
            padding: params.ship_padding,
        });
        Self {
            params,
            detector: Box::new(detector),
        }
    }

    /// Replace the ship detection strategy
    pub fn with_detector(mut self, detector: Box<dyn ShipDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn params(&self) -> &MicroMotionParams {
        &self.params
    }

    /// Estimate micro-motion of every ship in a complex image.
    pub fn process(&self, image: &SarImage) -> SarResult<EstimationResult> {
        validate_image(image)?;
        let (rows, cols) = image.dim();
        log::info!("Processing {}x{} image for ship micro-motion", rows, cols);
        log::debug!("Parameters: {:?}", self.params);

        let looks = SubApertureSplitter::new(self.params.num_subapertures).split(image)?;
        let (reference, target) = match looks.as_slice() {
            [reference, target, ..] => (reference, target),
            _ => {
                return Err(SarError::Processing(format!(
                    "Expected at least two sub-apertures, got {}",
                    looks.len()
                )))
            }
        };

        let reference_magnitude: SarRealImage = reference.mapv(|value| value.norm());
        let regions = self
            .detector
            .detect(&reference_magnitude, self.params.detection_threshold)?;

        let ships = self.process_regions(reference, target, &regions);
        let failed = ships.iter().filter(|ship| ship.error.is_some()).count();
        log::info!("Processed {} ships ({} failed)", ships.len(), failed);

        Ok(EstimationResult {
            metadata: EstimationMetadata {
                image_shape: (rows, cols),
                num_ships_detected: regions.len(),
            },
            ships,
        })
    }

    /// Estimate micro-motion from a real magnitude image (zero imaginary part).
    pub fn process_real(&self, image: &SarRealImage) -> SarResult<EstimationResult> {
        let complex = image.mapv(|value| SarComplex::new(value, 0.0));
        self.process(&complex)
    }

    #[cfg(feature = "parallel")]
    fn process_regions(
        &self,
        reference: &SarImage,
        target: &SarImage,
        regions: &[ShipRegion],
    ) -> Vec<ShipResult> {
        use rayon::prelude::*;

        regions
            .par_iter()
            .enumerate()
            .map(|(ship_id, region)| self.process_ship(ship_id, region, reference, target))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn process_regions(
        &self,
        reference: &SarImage,
        target: &SarImage,
        regions: &[ShipRegion],
    ) -> Vec<ShipResult> {
        regions
            .iter()
            .enumerate()
            .map(|(ship_id, region)| self.process_ship(ship_id, region, reference, target))
            .collect()
    }

    /// One ship's result; failures are recorded on the entry instead of propagated.
    fn process_ship(
        &self,
        ship_id: usize,
        region: &ShipRegion,
        reference: &SarImage,
        target: &SarImage,
    ) -> ShipResult {
        match self.track_region(region, reference, target) {
            Ok((displacement_field, dominant_frequencies)) => ShipResult {
                ship_id,
                region: *region,
                displacement_field,
                dominant_frequencies,
                error: None,
            },
            Err(e) => {
                log::warn!("Ship {} at {:?} failed: {}", ship_id, region, e);
                ShipResult {
                    ship_id,
                    region: *region,
                    displacement_field: DisplacementFieldBuilder::empty(),
                    dominant_frequencies: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn track_region(
        &self,
        region: &ShipRegion,
        reference: &SarImage,
        target: &SarImage,
    ) -> SarResult<(DisplacementField, Vec<FrequencyPeak>)> {
        let (rows, cols) = reference.dim();
        if region.y_start >= region.y_end || region.x_start >= region.x_end {
            return Err(SarError::Processing(format!("Region {:?} is inverted or empty", region)));
        }
        if region.y_end > rows || region.x_end > cols {
            return Err(SarError::Processing(format!(
                "Region {:?} lies outside the {}x{} image",
                region, rows, cols
            )));
        }
        log::debug!(
            "Tracking region rows {}..{}, cols {}..{}",
            region.y_start,
            region.y_end,
            region.x_start,
            region.x_end
        );

        let smoother = GaussianSmoother::with_sigma(self.params.gaussian_sigma);
        let reference_crop = smoother.apply(&crop_magnitude(reference, region))?;
        let target_crop = smoother.apply(&crop_magnitude(target, region))?;

        let tracker = OffsetTracker::new(OffsetTrackingParams {
            window_size: self.params.window_size,
            step_size: self.params.step_size(),
            subpixel_refinement: self.params.subpixel_refinement,
        });
        let (range_offsets, azimuth_offsets) = tracker.estimate(&reference_crop, &target_crop)?;
        let field = DisplacementFieldBuilder::build(range_offsets, azimuth_offsets)?;

        let analyzer = FrequencyModeAnalyzer::with_params(FrequencyAnalysisParams {
            peak_threshold: self.params.peak_threshold,
            min_distance: self.params.min_peak_distance,
            top_k: self.params.top_k,
            sampling_freq: self.params.sampling_freq,
        });
        let analysis = analyzer.analyze(&field)?;

        Ok((field, analysis.peaks))
    }
}

impl Default for MicroMotionEstimator {
    fn default() -> Self {
        Self::new()
    }
}

fn crop_magnitude(image: &SarImage, region: &ShipRegion) -> Array2<f64> {
    image
        .slice(s![region.y_start..region.y_end, region.x_start..region.x_end])
        .mapv(|value| value.norm() as f64)
}

fn validate_image(image: &SarImage) -> SarResult<()> {
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 {
        return Err(SarError::InvalidInput(format!(
            "Image has zero size ({}x{})",
            rows, cols
        )));
    }
    if image.iter().any(|value| !value.re.is_finite() || !value.im.is_finite()) {
        return Err(SarError::InvalidInput(
            "Image contains non-finite samples".to_string(),
        ));
    }
    Ok(())
}
