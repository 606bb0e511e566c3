use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// An embedded image, stored the way the browser editor stores it: a
/// `data:<mime>;base64,<payload>` URL.
///
/// The payload lives behind an `Arc<str>` so every document snapshot in the
/// undo history shares the same buffer instead of copying megabytes of
/// base64 per edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHandle(Arc<str>);

#[derive(Debug, thiserror::Error)]
pub enum ImageHandleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unrecognised image data: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unsupported image format {0:?}")]
    UnsupportedFormat(ImageFormat),
}

impl ImageHandle {
    /// Wrap an existing data URL (or any opaque handle string) as-is.
    pub fn from_data_url(url: impl Into<Arc<str>>) -> Self {
        Self(url.into())
    }

    /// Encode raw file bytes. The MIME type is sniffed from the content,
    /// not trusted from a file name.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageHandleError> {
        let format = image::guess_format(bytes)?;
        let mime = mime_for(format).ok_or(ImageHandleError::UnsupportedFormat(format))?;
        let url = format!("data:{};base64,{}", mime, BASE64.encode(bytes));
        Ok(Self(url.into()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ImageHandleError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// MIME type declared in the URL header, if this is a data URL.
    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        let (header, _) = rest.split_once(',')?;
        Some(header.split(';').next().unwrap_or(header))
    }

    /// Base64 payload without the `data:...;base64,` header. Handles that
    /// are not data URLs are returned whole.
    pub fn payload(&self) -> &str {
        match self.0.split_once(";base64,") {
            Some((header, payload)) if header.starts_with("data:") => payload,
            _ => &self.0,
        }
    }

    /// Decode the payload back to file bytes.
    pub fn decode_bytes(&self) -> Option<Vec<u8>> {
        BASE64.decode(self.payload()).ok()
    }

    /// Pixel dimensions, read from the encoded header only.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let bytes = self.decode_bytes()?;
        image::io::Reader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }

    /// Length of the encoded handle in bytes.
    pub fn encoded_len(&self) -> usize {
        self.0.len()
    }

    /// True when both handles point at the same shared buffer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn png_bytes_become_a_png_data_url() {
        let handle = ImageHandle::from_bytes(&tiny_png()).unwrap();
        assert!(handle.as_str().starts_with("data:image/png;base64,"));
        assert_eq!(handle.mime_type(), Some("image/png"));
        assert_eq!(handle.dimensions(), Some((3, 2)));
        assert_eq!(handle.decode_bytes().unwrap(), tiny_png());
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(ImageHandle::from_bytes(b"definitely not an image").is_err());
    }

    #[test]
    fn opaque_handles_pass_through() {
        let handle = ImageHandle::from_data_url("blob:1234");
        assert_eq!(handle.mime_type(), None);
        assert_eq!(handle.payload(), "blob:1234");
        assert_eq!(handle.dimensions(), None);
    }

    #[test]
    fn clones_share_the_buffer() {
        let a = ImageHandle::from_data_url("data:image/png;base64,AAAA");
        let b = a.clone();
        assert!(a.ptr_eq(&b));
    }
}
