use ndarray::Array2;
use num_complex::Complex;
use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

/// Complex-valued SAR data type (I + jQ)
pub type SarComplex = Complex<f32>;

/// Real-valued intensity or amplitude data
pub type SarReal = f32;

/// 2D complex SAR data array (rows x azimuth columns)
pub type SarImage = Array2<SarComplex>;

/// 2D real SAR data array (rows x azimuth columns)
pub type SarRealImage = Array2<SarReal>;

/// One pixel offset per tracking window
pub type OffsetGrid = Array2<f64>;

/// Bounding box of a detected ship, half-open on both axes.
///
/// Always padded and clipped to the bounds of the image it was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShipRegion {
    pub y_start: usize,
    pub y_end: usize,
    pub x_start: usize,
    pub x_end: usize,
}

impl ShipRegion {
    pub fn height(&self) -> usize {
        self.y_end.saturating_sub(self.y_start)
    }

    pub fn width(&self) -> usize {
        self.x_end.saturating_sub(self.x_start)
    }

    /// Whether pixel (row, col) falls inside the box
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.y_start && row < self.y_end && col >= self.x_start && col < self.x_end
    }
}

impl Serialize for ShipRegion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.y_start, self.y_end, self.x_start, self.x_end].serialize(serializer)
    }
}

/// Displacement derived from a pair of offset grids.
///
/// `magnitude` and `direction` always have the shape of the offset grids.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementField {
    pub range_offsets: OffsetGrid,
    pub azimuth_offsets: OffsetGrid,
    pub magnitude: Array2<f64>,
    /// atan2(range, azimuth), in radians
    pub direction: Array2<f64>,
}

impl DisplacementField {
    pub fn dim(&self) -> (usize, usize) {
        self.magnitude.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }
}

// Grids go out as nested row sequences; direction is not part of the output contract.
impl Serialize for DisplacementField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DisplacementField", 3)?;
        state.serialize_field("range_offsets", &NestedRows(&self.range_offsets))?;
        state.serialize_field("azimuth_offsets", &NestedRows(&self.azimuth_offsets))?;
        state.serialize_field("magnitude", &NestedRows(&self.magnitude))?;
        state.end()
    }
}

struct NestedRows<'a>(&'a Array2<f64>);

impl Serialize for NestedRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.nrows()))?;
        for row in self.0.rows() {
            seq.serialize_element(&row.to_vec())?;
        }
        seq.end()
    }
}

/// A local maximum of a displacement spectrum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyPeak {
    /// Calibrated (fy, fx) in units of the sampling frequency
    pub frequency: (f64, f64),
    pub amplitude: f64,
    /// (row, col) in the centred spectrum grid
    pub peak_location: (usize, usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationMetadata {
    #[serde(rename = "shape")]
    pub image_shape: (usize, usize),
    #[serde(rename = "ship_count")]
    pub num_ships_detected: usize,
}

/// Motion estimate for one detected ship
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipResult {
    /// Detection order
    pub ship_id: usize,
    pub region: ShipRegion,
    pub displacement_field: DisplacementField,
    pub dominant_frequencies: Vec<FrequencyPeak>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationResult {
    pub metadata: EstimationMetadata,
    pub ships: Vec<ShipResult>,
}

/// Error types for micro-motion processing
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Shape mismatch: reference is {reference:?}, target is {target:?}")]
    ShapeMismatch {
        reference: (usize, usize),
        target: (usize, usize),
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for SAR operations
pub type SarResult<T> = Result<T, SarError>;
