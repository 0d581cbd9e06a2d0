use crate::types::{SarError, SarRealImage, SarResult, ShipRegion};
use ndarray::Array2;
use std::collections::VecDeque;

/// Finds candidate ship regions in a magnitude image.
///
/// The estimator holds one of these behind a trait object so that callers can
/// substitute their own detection strategy.
pub trait ShipDetector: Send + Sync {
    /// Detect ships in `magnitude`, binarizing at `threshold` (in [0, 1]) of
    /// the image maximum. Regions are returned in detection order.
    fn detect(&self, magnitude: &SarRealImage, threshold: f32) -> SarResult<Vec<ShipRegion>>;
}

/// Ship detection parameters
#[derive(Debug, Clone)]
pub struct ShipDetectionParams {
    /// Components with fewer pixels are treated as clutter
    pub min_area: usize,
    /// Margin added on every side of a bounding box before clipping
    pub padding: usize,
}

impl Default for ShipDetectionParams {
    fn default() -> Self {
        Self {
            min_area: 100,
            padding: 10,
        }
    }
}

/// Threshold + morphology + connected-component detector
#[derive(Debug, Clone, Default)]
pub struct ThresholdShipDetector {
    params: ShipDetectionParams,
}

impl ThresholdShipDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: ShipDetectionParams) -> Self {
        Self { params }
    }
}

impl ShipDetector for ThresholdShipDetector {
    fn detect(&self, magnitude: &SarRealImage, threshold: f32) -> SarResult<Vec<ShipRegion>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SarError::InvalidParameter(format!(
                "Detection threshold {} is outside [0, 1]",
                threshold
            )));
        }

        let max = magnitude.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !max.is_finite() || max <= 0.0 {
            log::debug!("Image maximum is {}, no ships to detect", max);
            return Ok(Vec::new());
        }

        let binary = magnitude.mapv(|value| value / max > threshold);
        let opened = dilate(&erode(&binary));
        let cleaned = erode(&dilate(&opened));

        let components = label_components(&cleaned);
        let (height, width) = magnitude.dim();
        let padding = self.params.padding;

        let regions: Vec<ShipRegion> = components
            .iter()
            .filter(|component| component.area >= self.params.min_area)
            .map(|component| ShipRegion {
                y_start: component.min_row.saturating_sub(padding),
                y_end: (component.max_row + 1 + padding).min(height),
                x_start: component.min_col.saturating_sub(padding),
                x_end: (component.max_col + 1 + padding).min(width),
            })
            .collect();

        log::info!(
            "Detected {} ship regions ({} components before area filtering)",
            regions.len(),
            components.len()
        );
        Ok(regions)
    }
}

/// Pixel statistics of one labelled component
#[derive(Debug, Clone, PartialEq)]
struct Component {
    area: usize,
    min_row: usize,
    max_row: usize,
    min_col: usize,
    max_col: usize,
}

// 3x3 erosion; pixels outside the image never erode their neighbours.
fn erode(mask: &Array2<bool>) -> Array2<bool> {
    let (height, width) = mask.dim();
    Array2::from_shape_fn((height, width), |(i, j)| {
        neighbourhood(i, j, height, width).all(|(ni, nj)| mask[[ni, nj]])
    })
}

// 3x3 dilation; pixels outside the image are never set.
fn dilate(mask: &Array2<bool>) -> Array2<bool> {
    let (height, width) = mask.dim();
    Array2::from_shape_fn((height, width), |(i, j)| {
        neighbourhood(i, j, height, width).any(|(ni, nj)| mask[[ni, nj]])
    })
}

/// In-bounds pixels of the 3x3 block centred on (i, j), including (i, j)
fn neighbourhood(
    i: usize,
    j: usize,
    height: usize,
    width: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let rows = i.saturating_sub(1)..(i + 2).min(height);
    rows.flat_map(move |ni| (j.saturating_sub(1)..(j + 2).min(width)).map(move |nj| (ni, nj)))
}

/// 8-connected labelling; components come out in raster order of their first pixel.
fn label_components(mask: &Array2<bool>) -> Vec<Component> {
    let (height, width) = mask.dim();
    let mut visited = Array2::from_elem((height, width), false);
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for ((row, col), &set) in mask.indexed_iter() {
        if !set || visited[[row, col]] {
            continue;
        }

        let mut component = Component {
            area: 0,
            min_row: row,
            max_row: row,
            min_col: col,
            max_col: col,
        };
        visited[[row, col]] = true;
        queue.push_back((row, col));

        while let Some((r, c)) = queue.pop_front() {
            component.area += 1;
            component.min_row = component.min_row.min(r);
            component.max_row = component.max_row.max(r);
            component.min_col = component.min_col.min(c);
            component.max_col = component.max_col.max(c);

            for (nr, nc) in neighbourhood(r, c, height, width) {
                if mask[[nr, nc]] && !visited[[nr, nc]] {
                    visited[[nr, nc]] = true;
                    queue.push_back((nr, nc));
                }
            }
        }

        components.push(component);
    }

    components
}
