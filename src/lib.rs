//! sarmotion: ship micro-motion estimation from single-pass SAR images
//!
//! The azimuth Doppler spectrum of one complex image is split into looks,
//! ships are detected in the first look, and per-window pixel offsets between
//! looks are tracked to build a displacement field whose dominant spatial
//! frequencies describe each ship's vibration.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    DisplacementField, EstimationMetadata, EstimationResult, FrequencyPeak, OffsetGrid,
    SarComplex, SarError, SarImage, SarReal, SarRealImage, SarResult, ShipRegion, ShipResult,
};

pub use crate::core::{
    DisplacementFieldBuilder, FrequencyModeAnalyzer, MicroMotionEstimator, MicroMotionParams,
    OffsetTracker, ShipDetector, SubApertureSplitter, ThresholdShipDetector,
};
pub use io::save_results;
