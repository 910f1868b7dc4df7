//! Image loading and intensity preprocessing.
//!
//! Decoded images are laid out as `H x W x C` arrays of 8-bit samples, then
//! reduced to a single `H x W` plane of `f64` intensities in `[0, 1]`.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use ndarray::{Array2, Array3, ArrayView3, Axis};
use tracing::debug;

use super::error::{Result, SnakeError};

/// Luma weights applied to the R, G and B channels.
pub const LUMA_WEIGHTS: [f64; 3] = [0.2989, 0.587, 0.114];

// Converts a decoded image to an ndarray with format HxWxC
pub fn image_to_ndarray(img: &DynamicImage) -> Result<Array3<u8>> {
    let (width, height) = img.dimensions();
    let channels = img.color().channel_count() as usize;
    let (raw, channels) = match channels {
        1 => (img.to_luma8().into_raw(), 1),
        2 => (img.to_luma_alpha8().into_raw(), 2),
        3 => (img.to_rgb8().into_raw(), 3),
        _ => (img.to_rgba8().into_raw(), 4),
    };

    Array3::from_shape_vec((height as usize, width as usize, channels), raw).map_err(|e| {
        SnakeError::InvalidParameter {
            name: "image",
            reason: e.to_string(),
        }
    })
}

/// Scale an 8-bit sample to `[0, 1]`. `255` maps to exactly `1.0`.
pub fn normalize_sample(value: u8) -> f64 {
    value as f64 / 255.0
}

/// Take one channel of an `H x W x C` array and normalize it to `[0, 1]`.
pub fn extract_channel(img_arr: &Array3<u8>, channel: usize) -> Result<Array2<f64>> {
    let found = img_arr.len_of(Axis(2));
    if channel >= found {
        return Err(SnakeError::MissingChannel {
            requested: channel,
            found,
        });
    }

    Ok(img_arr.index_axis(Axis(2), channel).mapv(normalize_sample))
}

/// Convert an RGB image to gray scale.
///
/// Each output value is `0.2989 * R + 0.587 * G + 0.114 * B`. Inputs with
/// fewer than three channels fail with [`SnakeError::MissingChannel`]. Any
/// channel past the third (alpha, for instance) is ignored.
pub fn rgb_to_gray(img: ArrayView3<'_, f64>) -> Result<Array2<f64>> {
    let found = img.len_of(Axis(2));
    if found < 3 {
        return Err(SnakeError::MissingChannel {
            requested: 2,
            found,
        });
    }

    let (height, width, _) = img.dim();
    let gray = Array2::from_shape_fn((height, width), |(y, x)| {
        LUMA_WEIGHTS[0] * img[[y, x, 0]] + LUMA_WEIGHTS[1] * img[[y, x, 1]] + LUMA_WEIGHTS[2] * img[[y, x, 2]]
    });

    Ok(gray)
}

fn open(path: &Path) -> Result<Array3<u8>> {
    let img = image::open(path).map_err(|source| SnakeError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let img_arr = image_to_ndarray(&img)?;
    debug!(path = %path.display(), shape = ?img_arr.dim(), "decoded image");

    Ok(img_arr)
}

/// Load `path`, keep a single channel and divide by 255.
pub fn load_channel(path: &Path, channel: usize) -> Result<Array2<f64>> {
    let img_arr = open(path)?;
    extract_channel(&img_arr, channel)
}

/// Load `path` and reduce its RGB channels with [`rgb_to_gray`].
pub fn load_grayscale(path: &Path) -> Result<Array2<f64>> {
    let img_arr = open(path)?.mapv(normalize_sample);
    rgb_to_gray(img_arr.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use ndarray::{array, Array3};

    #[test]
    fn normalization_hits_both_ends_exactly() {
        assert_eq!(normalize_sample(255), 1.0);
        assert_eq!(normalize_sample(0), 0.0);
    }

    #[test]
    fn gray_matches_luma_formula() {
        let mut img = Array3::<f64>::zeros((2, 3, 3));
        for ((y, x, c), v) in img.indexed_iter_mut() {
            *v = ((y * 7 + x * 3 + c * 5) % 11) as f64 / 10.0;
        }

        let gray = rgb_to_gray(img.view()).unwrap();
        assert_eq!(gray.dim(), (2, 3));
        for ((y, x), g) in gray.indexed_iter() {
            let expected = 0.2989 * img[[y, x, 0]] + 0.587 * img[[y, x, 1]] + 0.114 * img[[y, x, 2]];
            assert_relative_eq!(*g, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn gray_ignores_alpha() {
        let img = array![[[1.0, 0.0, 0.0, 0.25]]];
        let gray = rgb_to_gray(img.view()).unwrap();
        assert_relative_eq!(gray[[0, 0]], 0.2989, epsilon = 1e-12);
    }

    #[test]
    fn gray_rejects_two_channels() {
        let img = Array3::<f64>::zeros((2, 2, 2));
        let err = rgb_to_gray(img.view()).unwrap_err();
        assert!(matches!(err, SnakeError::MissingChannel { found: 2, .. }));
    }

    #[test]
    fn rgb_image_keeps_channel_order() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(1, 0, Rgb([255, 10, 0]));
        let arr = image_to_ndarray(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(arr.dim(), (1, 2, 3));

        let red = extract_channel(&arr, 0).unwrap();
        assert_eq!(red[[0, 1]], 1.0);
        assert_eq!(red[[0, 0]], 0.0);
    }

    #[test]
    fn gray_image_has_only_channel_zero() {
        let img = GrayImage::from_pixel(3, 2, Luma([255]));
        let arr = image_to_ndarray(&DynamicImage::ImageLuma8(img)).unwrap();

        assert!(extract_channel(&arr, 0).unwrap().iter().all(|v| *v == 1.0));
        let err = extract_channel(&arr, 1).unwrap_err();
        assert!(matches!(err, SnakeError::MissingChannel { requested: 1, found: 1 }));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_channel(Path::new("does/not/exist.png"), 0).unwrap_err();
        assert!(matches!(err, SnakeError::ImageLoad { .. }));
    }
}
