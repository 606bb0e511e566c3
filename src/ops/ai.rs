// ============================================================================
// AI OPERATIONS: content and image generation behind an opaque adapter
// ============================================================================
//
// The editor never looks inside a generation request. It hands the adapter
// an image or a prompt, gets back a future, and merges whatever comes out
// into a document with the functions at the bottom of this file.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

use crate::document::{LayoutType, Palette, PostConfig, Transform2D};
use crate::image_handle::ImageHandle;

/// Boxed future returned by every adapter call.
pub type AiFuture<T> = Pin<Box<dyn Future<Output = Result<T, AiError>> + Send>>;

/// Errors that can occur during an AI request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AiError {
    /// Network, quota or model failure reported by the service.
    #[error("AI service failed: {0}")]
    Service(String),
    /// The service answered but the answer could not be used.
    #[error("AI returned an unusable response: {0}")]
    InvalidResponse(String),
    /// The selected tile has no image to work from.
    #[error("the selected tile has no image")]
    MissingImage,
    /// The worker running the request panicked.
    #[error("AI worker crashed: {0}")]
    Panicked(String),
}

/// Product fields read from a tile photo.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductFields {
    pub product_name: String,
    pub price: String,
    pub cta: String,
    pub brand_name: String,
}

/// A complete visual direction for the flyer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSpec {
    pub layout: LayoutType,
    pub colors: Palette,
    pub tagline_text: String,
    pub cta: String,
    #[serde(default)]
    pub background_prompt: String,
    #[serde(default)]
    pub header_prompt: String,
}

/// Art direction for a generated background.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundStyle {
    /// Let the service pick a generic retail look.
    #[default]
    Auto,
    Food,
    Gold,
    Nature,
    #[serde(rename = "3d")]
    ThreeD,
    Abstract,
    Texture,
    CandyWorld,
    ChocLuxury,
    RetailBokeh,
    SplashFresh,
    StudioSoft,
}

impl BackgroundStyle {
    /// Styles offered by the background picker, in display order.
    pub const PICKER: [BackgroundStyle; 6] = [
        BackgroundStyle::Gold,
        BackgroundStyle::Nature,
        BackgroundStyle::Food,
        BackgroundStyle::ThreeD,
        BackgroundStyle::Abstract,
        BackgroundStyle::Texture,
    ];

    pub fn id(self) -> &'static str {
        match self {
            BackgroundStyle::Auto => "auto",
            BackgroundStyle::Food => "food",
            BackgroundStyle::Gold => "gold",
            BackgroundStyle::Nature => "nature",
            BackgroundStyle::ThreeD => "3d",
            BackgroundStyle::Abstract => "abstract",
            BackgroundStyle::Texture => "texture",
            BackgroundStyle::CandyWorld => "candy_world",
            BackgroundStyle::ChocLuxury => "choc_luxury",
            BackgroundStyle::RetailBokeh => "retail_bokeh",
            BackgroundStyle::SplashFresh => "splash_fresh",
            BackgroundStyle::StudioSoft => "studio_soft",
        }
    }

    pub const ALL: [BackgroundStyle; 12] = [
        BackgroundStyle::Auto,
        BackgroundStyle::Food,
        BackgroundStyle::Gold,
        BackgroundStyle::Nature,
        BackgroundStyle::ThreeD,
        BackgroundStyle::Abstract,
        BackgroundStyle::Texture,
        BackgroundStyle::CandyWorld,
        BackgroundStyle::ChocLuxury,
        BackgroundStyle::RetailBokeh,
        BackgroundStyle::SplashFresh,
        BackgroundStyle::StudioSoft,
    ];

    /// Case-insensitive lookup. Unknown names fall back to `Auto`, the
    /// same as the service does.
    pub fn from_id(id: &str) -> Self {
        let id = id.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|style| style.id() == id).unwrap_or_default()
    }
}

/// Shape of a generated image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AspectRatio {
    /// 9:16
    Portrait,
    /// 4:5
    Feed,
    /// 1:1
    Square,
    /// 16:9, the header band.
    #[default]
    Wide,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Feed => "4:5",
            AspectRatio::Square => "1:1",
            AspectRatio::Wide => "16:9",
        }
    }
}

/// Theme used when a header is requested without one.
pub const DEFAULT_HEADER_THEME: &str = "Vibrant, retail, promotional, sale events";
/// Prompt used when the background picker is submitted empty.
pub const DEFAULT_BACKGROUND_PROMPT: &str = "Fundo para ofertas";

/// The generation service. Implementations must be shareable across the
/// worker pool; every call is independent.
pub trait AiAdapter: Send + Sync {
    fn analyze_product(&self, image: ImageHandle) -> AiFuture<ProductFields>;
    fn enhance_image(&self, image: ImageHandle) -> AiFuture<ImageHandle>;
    fn remove_background(&self, image: ImageHandle) -> AiFuture<ImageHandle>;
    fn generate_design(&self, prompt: String) -> AiFuture<DesignSpec>;
    fn generate_background(&self, prompt: String, style: BackgroundStyle, aspect: AspectRatio) -> AiFuture<ImageHandle>;
    fn generate_tagline(&self, brand_name: String) -> AiFuture<String>;

    /// A wide header image in the automatic style. A blank theme gets the
    /// generic retail one.
    fn generate_header_background(&self, theme: String) -> AiFuture<ImageHandle> {
        let theme = if theme.trim().is_empty() { DEFAULT_HEADER_THEME.to_string() } else { theme };
        self.generate_background(theme, BackgroundStyle::Auto, AspectRatio::Wide)
    }
}

/// Adapter for sessions with no generation service configured (headless
/// runs). Every request fails with [`AiError::Service`].
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineAdapter;

impl OfflineAdapter {
    fn unavailable<T: Send + 'static>() -> AiFuture<T> {
        Box::pin(std::future::ready(Err(AiError::Service("no AI service configured".into()))))
    }
}

impl AiAdapter for OfflineAdapter {
    fn analyze_product(&self, _image: ImageHandle) -> AiFuture<ProductFields> {
        Self::unavailable()
    }
    fn enhance_image(&self, _image: ImageHandle) -> AiFuture<ImageHandle> {
        Self::unavailable()
    }
    fn remove_background(&self, _image: ImageHandle) -> AiFuture<ImageHandle> {
        Self::unavailable()
    }
    fn generate_design(&self, _prompt: String) -> AiFuture<DesignSpec> {
        Self::unavailable()
    }
    fn generate_background(&self, _prompt: String, _style: BackgroundStyle, _aspect: AspectRatio) -> AiFuture<ImageHandle> {
        Self::unavailable()
    }
    fn generate_tagline(&self, _brand_name: String) -> AiFuture<String> {
        Self::unavailable()
    }
}

/// Which single-image tool produced a pending tile preview.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageTool {
    Enhance,
    RemoveBackground,
}

impl ImageTool {
    pub fn label(self) -> &'static str {
        match self {
            ImageTool::Enhance => "enhance",
            ImageTool::RemoveBackground => "remove background",
        }
    }
}

/// Output of a magic fill: analysis plus an enhanced photo.
#[derive(Clone, Debug, PartialEq)]
pub struct MagicFill {
    pub fields: ProductFields,
    pub image: ImageHandle,
}

/// Output of a design request. The header is optional: a failed header
/// generation still yields a proposal.
#[derive(Clone, Debug, PartialEq)]
pub struct DesignResult {
    pub spec: DesignSpec,
    pub header: Result<ImageHandle, AiError>,
}

// ============================================================================
// MERGING
// ============================================================================

/// Write a magic fill into tile `index`: new photo, re-centred, with the
/// detected name and price.
pub fn merge_magic_fill(doc: &PostConfig, index: usize, fill: &MagicFill) -> PostConfig {
    doc.with_item(index, |item| {
        item.image = Some(fill.image.clone());
        item.image_transform = Transform2D::IDENTITY;
        item.product_name = fill.fields.product_name.clone();
        item.price = fill.fields.price.clone();
    })
}

/// Build the proposal candidate on top of `doc`.
pub fn build_proposal(doc: &PostConfig, design: &DesignSpec, header: Option<&ImageHandle>) -> PostConfig {
    let mut next = doc.clone();
    next.layout = design.layout;
    next.colors = design.colors.clone();
    next.tagline_text = design.tagline_text.clone();
    next.tagline_color = design.colors.primary.clone();
    next.tagline_bg_color = design.colors.secondary.clone();
    next.cta = design.cta.clone();
    if let Some(header) = header {
        next.header_background = Some(header.clone());
        next.header_background_transform = Transform2D::IDENTITY;
        next.background_image = None;
    }
    next
}

/// Tagline suggestions replace the tagline text only.
pub fn merge_tagline(doc: &PostConfig, tagline: &str) -> PostConfig {
    let mut next = doc.clone();
    next.tagline_text = tagline.to_string();
    next
}
