//! Core micro-motion processing stages

pub mod fft;
pub mod smoothing;
pub mod ship_detection;
pub mod subaperture;
pub mod offset_tracking;
pub mod displacement;
pub mod frequency_modes;
pub mod micro_motion;

// Re-export main types
pub use smoothing::{GaussianSmoother, GaussianSmoothingParams};
pub use ship_detection::{ShipDetector, ShipDetectionParams, ThresholdShipDetector};
pub use subaperture::SubApertureSplitter;
pub use offset_tracking::{OffsetTracker, OffsetTrackingParams};
pub use displacement::DisplacementFieldBuilder;
pub use frequency_modes::{FrequencyAnalysis, FrequencyAnalysisParams, FrequencyModeAnalyzer};
pub use micro_motion::{MicroMotionEstimator, MicroMotionParams};
