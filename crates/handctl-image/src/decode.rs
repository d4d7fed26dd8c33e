use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::Image;

/// Errors that can occur while turning a client payload into an [`Image`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image payload has no ',' separating the data URL header from the image data")]
    MissingSeparator,

    #[error("image payload is not a string")]
    NotAString,

    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Enumeration of image formats supported by this library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageFormat {
    /// JFIF JPEG or Motion JPEG.
    Jpeg,
    /// Portable Network Graphics.
    Png,
    Gif,
}

impl ImageFormat {
    pub fn from_extension(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("png") => Ok(Self::Png),
            Some("gif") => Ok(Self::Gif),
            _ => anyhow::bail!(
                "invalid image path '{}' (must have one of the supported extensions)",
                path.display()
            ),
        }
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Gif => image::ImageFormat::Gif,
        }
    }
}

/// Image decoding and loading.
impl Image {
    /// Loads an image from the filesystem.
    ///
    /// The path must have a supported file extension (`jpeg`, `jpg`, `png` or `gif`).
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let format = ImageFormat::from_extension(path)?;
        let data = std::fs::read(path)?;
        let buf = image::load_from_memory_with_format(&data, format.to_image_format())?.to_rgb8();
        Ok(Self::from_buffer(buf))
    }

    /// Decodes an encoded image from a byte slice, guessing its format from the contents.
    ///
    /// Any alpha channel is discarded.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let buf = image::load_from_memory(data)?.to_rgb8();
        Ok(Self::from_buffer(buf))
    }

    /// Decodes the base64 image data of a data URL like `data:image/jpeg;base64,<data>`.
    ///
    /// Only the part after the first `,` is decoded (up to a second `,`, if any). The header in
    /// front of it is not inspected; the image format is detected from the decoded bytes.
    ///
    /// Characters outside the base64 alphabet (such as line breaks in wrapped payloads) are skipped.
    pub fn decode_data_url(url: &str) -> Result<Self, DecodeError> {
        let encoded = url.split(',').nth(1).ok_or(DecodeError::MissingSeparator)?;
        let bytes = STANDARD.decode(base64_alphabet_only(encoded))?;
        log::trace!("decoded {} bytes of base64 image data", bytes.len());
        Self::decode(&bytes)
    }
}

fn base64_alphabet_only(encoded: &str) -> String {
    encoded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect()
}

/// Decodes a webcam frame sent by a client and mirrors it horizontally.
///
/// Clients send the camera picture as-is, while the user looks at it like into a mirror. Flipping
/// the frame makes the detected hand's left and right match what the user sees.
pub fn decode_frame(data_url: &str) -> Result<Image, DecodeError> {
    let mut image = Image::decode_data_url(data_url)?;
    image.flip_horizontal_in_place();
    Ok(image)
}
