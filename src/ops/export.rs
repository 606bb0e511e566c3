// ============================================================================
// EXPORT: flyer → PNG / PDF through an external rasterizer
// ============================================================================

use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

use crate::document::PostConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Exact size handed to the rasterizer, in document pixels, and the
/// device-pixel ratio to render at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterRequest {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl RasterRequest {
    /// Size the raster for `doc`. `content_height` is the measured height
    /// of the rendered page; it only ever extends the formula height.
    pub fn for_document(doc: &PostConfig, content_height: Option<u32>, pixel_ratio: f32) -> Self {
        let (width, height) = doc.dimensions();
        let height = content_height.map_or(height, |h| h.max(height));
        Self { width, height, pixel_ratio }
    }

    pub fn output_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.pixel_ratio).round() as u32,
            (self.height as f32 * self.pixel_ratio).round() as u32,
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("an export is already running")]
    Busy,
    #[error("rasterization failed: {0}")]
    Raster(String),
    #[error("rasterizer returned {got_w}x{got_h}, needed at least {want_w}x{want_h}")]
    Undersized { got_w: u32, got_h: u32, want_w: u32, want_h: u32 },
    #[error("encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("page writer failed: {0}")]
    Page(String),
}

/// Renders a document to pixels. The renderer lives outside this crate.
pub trait Rasterizer {
    fn rasterize(&self, doc: &PostConfig, request: RasterRequest) -> Result<RgbaImage, String>;
}

/// Wraps a raster in a single-page document file.
pub trait PageWriter {
    fn write_page(&self, raster: &RgbaImage, page_width: u32, page_height: u32) -> Result<Vec<u8>, String>;
}

/// Rasterize `doc` and encode it. Fails rather than crop: the raster must
/// cover the full requested size.
pub fn render(
    doc: &PostConfig,
    format: ExportFormat,
    request: RasterRequest,
    rasterizer: &dyn Rasterizer,
    pages: Option<&dyn PageWriter>,
) -> Result<Vec<u8>, ExportError> {
    let raster = rasterizer.rasterize(doc, request).map_err(ExportError::Raster)?;
    let (want_w, want_h) = request.output_size();
    if raster.width() < want_w || raster.height() < want_h {
        return Err(ExportError::Undersized {
            got_w: raster.width(),
            got_h: raster.height(),
            want_w,
            want_h,
        });
    }

    match format {
        ExportFormat::Png => {
            let mut out = Vec::new();
            raster.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
            Ok(out)
        }
        ExportFormat::Pdf => {
            let writer = pages.ok_or_else(|| ExportError::Page("no page writer configured".to_string()))?;
            writer
                .write_page(&raster, request.width, request.height)
                .map_err(ExportError::Page)
        }
    }
}
