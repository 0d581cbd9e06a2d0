use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sarmotion::core::ship_detection::{ShipDetector, ThresholdShipDetector};
use sarmotion::types::{SarRealImage, ShipRegion};

const RADIUS: i64 = 15;

/// Uniform background noise below 0.1 with one bright disk of value 1.0
fn disk_scene(rows: usize, cols: usize, centre: (i64, i64), seed: u64) -> SarRealImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut image = Array2::from_shape_fn((rows, cols), |_| rng.gen_range(0.0..0.1f32));
    for ((i, j), value) in image.indexed_iter_mut() {
        let dy = i as i64 - centre.0;
        let dx = j as i64 - centre.1;
        if dy * dy + dx * dx <= RADIUS * RADIUS {
            *value = 1.0;
        }
    }
    image
}

fn disk_pixels(centre: (i64, i64), rows: usize, cols: usize) -> Vec<(usize, usize)> {
    let mut pixels = Vec::new();
    for dy in -RADIUS..=RADIUS {
        for dx in -RADIUS..=RADIUS {
            let (i, j) = (centre.0 + dy, centre.1 + dx);
            if dy * dy + dx * dx <= RADIUS * RADIUS && i >= 0 && j >= 0 && (i as usize) < rows && (j as usize) < cols {
                pixels.push((i as usize, j as usize));
            }
        }
    }
    pixels
}

#[test]
fn test_single_disk_detected_with_padding() {
    let _ = env_logger::builder().is_test(true).try_init();
    let image = disk_scene(512, 512, (256, 256), 7);

    let regions = ThresholdShipDetector::new().detect(&image, 0.3).unwrap();

    assert_eq!(regions.len(), 1);
    let region = regions[0];
    for (i, j) in disk_pixels((256, 256), 512, 512) {
        assert!(region.contains(i, j), "disk pixel ({}, {}) outside {:?}", i, j, region);
    }

    // Accepted tolerance on the 10-pixel padding: the 3x3 opening trims the
    // one-pixel tips of the digital disk, so the padded box starts 9 pixels
    // out from the disk's outermost rows and columns. Every disk pixel is
    // still inside the box, which is the property relied on downstream.
    assert_eq!(
        region,
        ShipRegion { y_start: 232, y_end: 281, x_start: 232, x_end: 281 }
    );
    assert!(256 - 15 - region.y_start >= 9);
    assert!(region.y_end - (256 + 15 + 1) >= 9);
}

#[test]
fn test_disk_near_corner_clipped_to_bounds() {
    let image = disk_scene(512, 512, (8, 505), 11);

    let regions = ThresholdShipDetector::new().detect(&image, 0.3).unwrap();

    assert_eq!(regions.len(), 1);
    let region = regions[0];
    assert_eq!(region.y_start, 0);
    assert_eq!(region.x_end, 512);
    for (i, j) in disk_pixels((8, 505), 512, 512) {
        assert!(region.contains(i, j));
    }
}

#[test]
fn test_noise_only_scene_has_no_ships() {
    let mut rng = StdRng::seed_from_u64(3);
    let image = Array2::from_shape_fn((128, 128), |_| rng.gen_range(0.0..0.1f32));

    // Normalized noise is spread over [0, 1]; opening and the area floor reject it.
    let regions = ThresholdShipDetector::new().detect(&image, 0.95).unwrap();
    assert!(regions.is_empty());
}

#[test]
fn test_detection_order_is_raster_order_of_first_pixel() {
    let mut image = disk_scene(256, 256, (200, 40), 5);
    // Second disk higher up and further right; it is met first in raster order.
    for ((i, j), value) in image.indexed_iter_mut() {
        let dy = i as i64 - 60;
        let dx = j as i64 - 200;
        if dy * dy + dx * dx <= RADIUS * RADIUS {
            *value = 1.0;
        }
    }

    let regions = ThresholdShipDetector::new().detect(&image, 0.3).unwrap();

    assert_eq!(regions.len(), 2);
    assert!(regions[0].contains(60, 200));
    assert!(regions[1].contains(200, 40));
}
