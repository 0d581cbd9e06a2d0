use crate::core::fft::transform_axis;
use crate::types::{SarComplex, SarError, SarImage, SarResult};
use ndarray::{s, Axis};
use num_traits::Zero;
use rustfft::FftDirection;

/// Splits the azimuth Doppler spectrum of a complex image into looks
pub struct SubApertureSplitter {
    num_subapertures: usize,
}

impl SubApertureSplitter {
    pub fn new(num_subapertures: usize) -> Self {
        Self { num_subapertures }
    }

    pub fn num_subapertures(&self) -> usize {
        self.num_subapertures
    }

    /// Band-limit `image` into `num_subapertures` contiguous azimuth bands.
    ///
    /// The spectrum along each row is cut into blocks of `cols / n` bins.
    /// Bins past the last full block belong to no look and are zero in every
    /// output. A single sub-aperture is the unmodified image.
    pub fn split(&self, image: &SarImage) -> SarResult<Vec<SarImage>> {
        let n = self.num_subapertures;
        let (rows, cols) = image.dim();

        if n == 0 {
            return Err(SarError::InvalidParameter(
                "Number of sub-apertures must be at least 1".to_string(),
            ));
        }
        if n == 1 {
            return Ok(vec![image.clone()]);
        }
        if n > cols {
            return Err(SarError::InvalidParameter(format!(
                "Cannot split {} azimuth bins into {} sub-apertures",
                cols, n
            )));
        }

        let band_width = cols / n;
        log::info!(
            "Splitting {}x{} image into {} sub-apertures of {} azimuth bins",
            rows,
            cols,
            n,
            band_width
        );
        if cols % n != 0 {
            log::debug!("Dropping {} trailing azimuth bins", cols % n);
        }

        let mut spectrum = image.clone();
        transform_axis(&mut spectrum, Axis(1), FftDirection::Forward);

        let looks = (0..n)
            .map(|i| {
                let start = i * band_width;
                let end = start + band_width;

                let mut band = spectrum.clone();
                band.slice_mut(s![.., ..start]).fill(SarComplex::zero());
                band.slice_mut(s![.., end..]).fill(SarComplex::zero());
                transform_axis(&mut band, Axis(1), FftDirection::Inverse);
                band
            })
            .collect();

        Ok(looks)
    }
}
