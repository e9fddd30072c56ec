use std::io;
use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use log::debug;
use ndarray::Array4;

/// Input size of the trained weed classifier, as `(width, height)`.
pub const DEFAULT_TARGET_SIZE: (u32, u32) = (120, 120);

/// Filter used for every resize so identical images give identical tensors.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid target size {width}x{height}")]
    InvalidTargetSize { width: u32, height: u32 },
    #[error("Image has no pixels")]
    EmptyImage,
}

/// Converts an image into a normalized `[1, height, width, 3]` RGB tensor.
///
/// Any color mode is converted to 8-bit RGB (alpha is dropped), the image is
/// resized to exactly `target_size` ignoring aspect ratio, and intensities
/// are scaled from `0..=255` to `0.0..=1.0`.
pub fn preprocess(
    image: &DynamicImage,
    target_size: (u32, u32),
) -> Result<Array4<f32>, PreprocessError> {
    let (width, height) = target_size;
    if width == 0 || height == 0 {
        return Err(PreprocessError::InvalidTargetSize { width, height });
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessError::EmptyImage);
    }

    debug!(
        "Preprocessing {}x{} {:?} image to {}x{}",
        image.width(),
        image.height(),
        image.color(),
        width,
        height
    );

    let rgb = image.resize_exact(width, height, RESIZE_FILTER).to_rgb8();

    let tensor = Array4::from_shape_fn(
        (1, height as usize, width as usize, 3),
        |(_, y, x, c)| f32::from(rgb.get_pixel(x as u32, y as u32)[c]) / 255.0,
    );
    Ok(tensor)
}

/// Decodes encoded image bytes (JPEG, PNG, ...) and preprocesses them.
pub fn preprocess_bytes(
    bytes: &[u8],
    target_size: (u32, u32),
) -> Result<Array4<f32>, PreprocessError> {
    let image = image::load_from_memory(bytes)?;
    preprocess(&image, target_size)
}

/// Reads an image file from disk and preprocesses it.
pub fn preprocess_path<P: AsRef<Path>>(
    path: P,
    target_size: (u32, u32),
) -> Result<Array4<f32>, PreprocessError> {
    let bytes = std::fs::read(path.as_ref())?;
    preprocess_bytes(&bytes, target_size)
}
