//! Decoding and normalization of uploaded lesion photographs.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat, ImageReader, imageops::FilterType};
use ndarray::ArrayView3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::io::Cursor;

use crate::error::{DetectionError, DetectionResult};

pub const DEFAULT_INPUT_SIZE: u32 = 300;
pub const CHANNELS: usize = 3;

/// Square RGB8 image in HWC order, ready for the classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    #[serde(serialize_with = "encode_pixels", deserialize_with = "decode_pixels")]
    pixels: Vec<u8>,
}

impl NormalizedImage {
    /// Wrap a raw HWC buffer; the length must be `width * height * 3`
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> DetectionResult<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(DetectionError::InvalidImage(format!(
                "expected {} bytes for {}x{} RGB, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// `(height, width, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixels as an `(H, W, 3)` array view. Fails when a deserialized buffer does
    /// not match its declared dimensions.
    pub fn view(&self) -> DetectionResult<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(self.shape(), &self.pixels)
            .map_err(|e| DetectionError::InvalidImage(format!("pixel buffer mismatch: {}", e)))
    }
}

fn encode_pixels<S: Serializer>(pixels: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(pixels))
}

fn decode_pixels<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

/// Decode an uploaded JPEG or PNG. The format is sniffed from the content.
pub fn decode_upload(bytes: &[u8]) -> DetectionResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(DetectionError::InvalidImage("empty upload".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DetectionError::InvalidImage(e.to_string()))?;

    match reader.format() {
        Some(ImageFormat::Jpeg) | Some(ImageFormat::Png) => {}
        Some(other) => {
            return Err(DetectionError::InvalidImage(format!(
                "unsupported image format {:?}, expected JPEG or PNG",
                other
            )));
        }
        None => {
            return Err(DetectionError::InvalidImage(
                "content is not a recognizable image".to_string(),
            ));
        }
    }

    let image = reader.decode()?;
    if image.width() == 0 || image.height() == 0 {
        return Err(DetectionError::InvalidImage("image has zero dimensions".to_string()));
    }
    Ok(image)
}

/// Crop to a centered square, scale to `size × size` with Lanczos3, drop alpha.
pub fn normalize(image: &DynamicImage, size: u32) -> DetectionResult<NormalizedImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DetectionError::InvalidImage("image has zero dimensions".to_string()));
    }
    if size == 0 {
        return Err(DetectionError::InvalidImage("target size must be positive".to_string()));
    }

    let fitted = image.resize_to_fill(size, size, FilterType::Lanczos3);
    let rgb = fitted.to_rgb8();
    let (width, height) = rgb.dimensions();

    NormalizedImage::from_raw(width, height, rgb.into_raw())
}

/// [`decode_upload`] followed by [`normalize`]
pub fn normalize_upload(bytes: &[u8], size: u32) -> DetectionResult<NormalizedImage> {
    let image = decode_upload(bytes)?;
    normalize(&image, size)
}
