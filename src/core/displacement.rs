use crate::types::{DisplacementField, OffsetGrid, SarError, SarResult};
use ndarray::{Array2, Zip};

/// Derives magnitude and direction from range/azimuth offset grids
pub struct DisplacementFieldBuilder;

impl DisplacementFieldBuilder {
    /// `magnitude = sqrt(r^2 + a^2)`, `direction = atan2(r, a)` per cell.
    pub fn build(
        range_offsets: OffsetGrid,
        azimuth_offsets: OffsetGrid,
    ) -> SarResult<DisplacementField> {
        if range_offsets.dim() != azimuth_offsets.dim() {
            return Err(SarError::ShapeMismatch {
                reference: range_offsets.dim(),
                target: azimuth_offsets.dim(),
            });
        }

        let magnitude = Zip::from(&range_offsets)
            .and(&azimuth_offsets)
            .map_collect(|&r, &a| (r * r + a * a).sqrt());
        let direction = Zip::from(&range_offsets)
            .and(&azimuth_offsets)
            .map_collect(|&r, &a| r.atan2(a));

        Ok(DisplacementField {
            range_offsets,
            azimuth_offsets,
            magnitude,
            direction,
        })
    }

    /// Field with no cells, used for regions that could not be tracked
    pub fn empty() -> DisplacementField {
        DisplacementField {
            range_offsets: Array2::zeros((0, 0)),
            azimuth_offsets: Array2::zeros((0, 0)),
            magnitude: Array2::zeros((0, 0)),
            direction: Array2::zeros((0, 0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_magnitude_and_direction() {
        let range = array![[3.0, 0.0], [-2.0, 1.0]];
        let azimuth = array![[4.0, 0.0], [0.0, 0.0]];
        let field = DisplacementFieldBuilder::build(range.clone(), azimuth.clone()).unwrap();

        assert_eq!(field.dim(), (2, 2));
        assert_eq!(field.magnitude, array![[5.0, 0.0], [2.0, 1.0]]);
        assert_abs_diff_eq!(field.direction[[0, 0]], (3.0f64).atan2(4.0));
        assert_eq!(field.direction[[0, 1]], 0.0);
        assert_abs_diff_eq!(field.direction[[1, 0]], -FRAC_PI_2);
        assert_abs_diff_eq!(field.direction[[1, 1]], FRAC_PI_2);
        assert_eq!(field.range_offsets, range);
        assert_eq!(field.azimuth_offsets, azimuth);
    }

    #[test]
    fn test_magnitude_exact_on_every_cell() {
        let range = Array2::from_shape_fn((4, 5), |(i, j)| i as f64 - j as f64 * 0.5);
        let azimuth = Array2::from_shape_fn((4, 5), |(i, j)| (i * j) as f64 - 3.0);
        let field = DisplacementFieldBuilder::build(range.clone(), azimuth.clone()).unwrap();
        for ((idx, &m), (&r, &a)) in field.magnitude.indexed_iter().zip(range.iter().zip(azimuth.iter())) {
            assert_eq!(m, (r * r + a * a).sqrt(), "cell {:?}", idx);
        }
    }

    #[test]
    fn test_empty_grids_stay_empty() {
        let field = DisplacementFieldBuilder::build(Array2::zeros((0, 3)), Array2::zeros((0, 3))).unwrap();
        assert_eq!(field.dim(), (0, 3));
        assert!(field.is_empty());
        assert!(DisplacementFieldBuilder::empty().is_empty());
    }

    #[test]
    fn test_mismatched_grids_rejected() {
        let result = DisplacementFieldBuilder::build(Array2::zeros((2, 2)), Array2::zeros((2, 3)));
        assert!(matches!(result, Err(SarError::ShapeMismatch { .. })));
    }
}
