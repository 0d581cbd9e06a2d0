use approx::assert_abs_diff_eq;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sarmotion::core::frequency_modes::{FrequencyAnalysisParams, FrequencyModeAnalyzer};
use sarmotion::core::DisplacementFieldBuilder;
use sarmotion::{MicroMotionEstimator, MicroMotionParams, SarComplex, SarImage};
use std::f64::consts::PI;

/// Low-amplitude complex noise with one elliptical ship of amplitude 10 + 10j.
///
/// The ship spans 50 rows and 20 azimuth columns around `centre`.
fn ship_scene(centre: (f64, f64), seed: u64) -> SarImage {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((512, 512), |(i, j)| {
        let dy = (i as f64 - centre.0) / 50.0;
        let dx = (j as f64 - centre.1) / 20.0;
        let noise = SarComplex::new(rng.gen_range(-0.05..0.05), rng.gen_range(-0.05..0.05));
        if dy * dy + dx * dx <= 0.25 {
            noise + SarComplex::new(10.0, 10.0)
        } else {
            noise
        }
    })
}

fn e2e_params(window_size: usize) -> MicroMotionParams {
    MicroMotionParams {
        num_subapertures: 2,
        window_size,
        overlap_ratio: 0.5,
        detection_threshold: 0.3,
        ..MicroMotionParams::default()
    }
}

#[test]
fn test_single_ship_end_to_end() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let image = ship_scene((170.0, 170.0), 1);
    let estimator = MicroMotionEstimator::with_params(e2e_params(64))?;

    let result = estimator.process(&image)?;

    assert_eq!(result.metadata.image_shape, (512, 512));
    assert_eq!(result.metadata.num_ships_detected, 1);
    assert_eq!(result.ships.len(), 1);
    let ship = &result.ships[0];
    assert_eq!(ship.ship_id, 0);
    assert!(ship.region.contains(170, 170));
    assert!(ship.error.is_none());
    assert!(ship.dominant_frequencies.len() <= 5);
    Ok(())
}

#[test]
fn test_smaller_window_yields_displacement_field() -> anyhow::Result<()> {
    let image = ship_scene((170.0, 170.0), 2);
    let estimator = MicroMotionEstimator::with_params(e2e_params(32))?;

    let result = estimator.process(&image)?;

    assert_eq!(result.ships.len(), 1);
    let ship = &result.ships[0];
    let field = &ship.displacement_field;
    let expected_dim = (
        (ship.region.height() - 32) / 16 + 1,
        (ship.region.width() - 32) / 16 + 1,
    );
    assert_eq!(field.dim(), expected_dim);
    assert_eq!(field.range_offsets.dim(), expected_dim);
    assert_eq!(field.direction.dim(), expected_dim);
    for ((&m, &r), &a) in field
        .magnitude
        .iter()
        .zip(field.range_offsets.iter())
        .zip(field.azimuth_offsets.iter())
    {
        assert_eq!(m, (r * r + a * a).sqrt());
    }

    let amplitudes: Vec<f64> = ship.dominant_frequencies.iter().map(|p| p.amplitude).collect();
    assert!(amplitudes.len() <= 5);
    assert!(amplitudes.windows(2).all(|w| w[0] >= w[1]));
    assert!(amplitudes.iter().all(|&a| a >= 0.0));
    Ok(())
}

#[test]
fn test_ship_ids_follow_detection_order() -> anyhow::Result<()> {
    // The lower-right ship is brighter but detected second.
    let mut image = ship_scene((120.0, 120.0), 3);
    for ((i, j), value) in image.indexed_iter_mut() {
        let dy = (i as f64 - 360.0) / 50.0;
        let dx = (j as f64 - 360.0) / 20.0;
        if dy * dy + dx * dx <= 0.25 {
            *value = SarComplex::new(15.0, 15.0);
        }
    }
    let estimator = MicroMotionEstimator::with_params(e2e_params(64))?;

    let result = estimator.process(&image)?;

    assert_eq!(result.ships.len(), 2);
    assert!(result.ships[0].region.contains(120, 120));
    assert!(result.ships[1].region.contains(360, 360));
    assert_eq!(result.ships[1].ship_id, 1);
    Ok(())
}

#[test]
fn test_real_image_input() -> anyhow::Result<()> {
    let mut image = Array2::from_elem((256, 256), 0.01f32);
    image
        .slice_mut(ndarray::s![100..140, 60..160])
        .fill(1.0);
    let params = MicroMotionParams {
        detection_threshold: 0.3,
        ..MicroMotionParams::default()
    };
    let result = MicroMotionEstimator::with_params(params)?.process_real(&image)?;

    assert_eq!(result.metadata.image_shape, (256, 256));
    assert_eq!(result.ships.len(), 1);
    assert!(result.ships[0].region.contains(120, 110));
    Ok(())
}

#[test]
fn test_sinusoidal_field_frequency_calibration() {
    // Range offsets oscillate along azimuth at 5 cycles over 40 cells.
    let (rows, cols) = (24, 40);
    let f = 5.0 / cols as f64;
    let range = Array2::from_shape_fn((rows, cols), |(_, j)| (2.0 * PI * f * j as f64).sin());
    let azimuth = Array2::zeros((rows, cols));
    let field = DisplacementFieldBuilder::build(range.clone(), azimuth).unwrap();

    // Magnitude is |sin|, whose fundamental is twice the offset frequency.
    let analysis = FrequencyModeAnalyzer::new().analyze(&field).unwrap();
    let top = &analysis.peaks[0];
    assert_eq!(top.frequency, (0.0, 0.0));
    assert!(analysis.peaks.len() <= 5);

    // The signed offsets themselves carry the pure tone.
    let analysis = FrequencyModeAnalyzer::with_params(FrequencyAnalysisParams::default())
        .analyze_grid(&range)
        .unwrap();
    let top = &analysis.peaks[0];
    assert_abs_diff_eq!(top.frequency.0, 0.0);
    assert_abs_diff_eq!(top.frequency.1.abs(), f, epsilon = 1.0 / cols as f64);
}

#[test]
fn test_near_dc_tone_calibration() {
    // One cycle over the grid: the conjugate peaks are adjacent to DC.
    let (rows, cols) = (24, 40);
    let f = 1.0 / cols as f64;
    let range = Array2::from_shape_fn((rows, cols), |(_, j)| (2.0 * PI * f * j as f64).sin());

    let analysis = FrequencyModeAnalyzer::new().analyze_grid(&range).unwrap();

    assert_eq!(analysis.all_peaks.len(), 1);
    let top = &analysis.peaks[0];
    assert_abs_diff_eq!(top.frequency.0, 0.0);
    assert!(top.frequency.1 != 0.0);
    assert_abs_diff_eq!(top.frequency.1.abs(), f, epsilon = 1.0 / cols as f64);
    assert_abs_diff_eq!(top.amplitude, (rows * cols) as f64 / 2.0, epsilon = 1e-6);
}

#[test]
fn test_small_pipeline_sized_field_reports_tone() {
    // A 3x5 grid is what a ship of a few hundred pixels yields at window 64.
    let (rows, cols) = (3, 5);
    let range = Array2::from_shape_fn((rows, cols), |(_, j)| {
        0.8 * (2.0 * PI * j as f64 / cols as f64).sin()
    });
    let azimuth = Array2::from_elem((rows, cols), 0.25);
    let field = DisplacementFieldBuilder::build(range, azimuth).unwrap();

    let analysis = FrequencyModeAnalyzer::new()
        .analyze_grid(&field.range_offsets)
        .unwrap();

    assert_eq!(analysis.spectrum.dim(), (rows, cols));
    assert_eq!(analysis.peaks.len(), 1);
    let top = &analysis.peaks[0];
    assert_eq!(top.frequency.0, 0.0);
    assert_abs_diff_eq!(top.frequency.1.abs(), 1.0 / cols as f64, epsilon = 1e-12);
    assert_abs_diff_eq!(top.amplitude, 0.8 * (rows * cols) as f64 / 2.0, epsilon = 1e-9);
}
