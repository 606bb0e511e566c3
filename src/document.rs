//! The flyer document: every value the editor can undo.
//!
//! `PostConfig` is treated as an immutable snapshot. Every edit builds a new
//! value (the `with_*` helpers clone and return) and hands it to the history;
//! nothing in the crate mutates a snapshot that is already on the stack.
//!
//! Field names serialize in camelCase and enum tags keep their kebab-case
//! spellings so backups written by the browser editor load unchanged.

use egui::{Color32, Vec2};
use serde::{Deserialize, Serialize};

use crate::image_handle::ImageHandle;

// ============================================================================
// DIMENSIONS
// ============================================================================

/// Fixed flyer width in document pixels.
pub const POST_WIDTH: u32 = 1080;
/// Minimum flyer height (a portrait 1080×1920 page).
pub const MIN_POST_HEIGHT: u32 = 1920;
pub const HEADER_HEIGHT: u32 = 400;
pub const FOOTER_HEIGHT: u32 = 200;
pub const ROW_HEIGHT: u32 = 600;
pub const ROW_GAP: u32 = 20;

/// Tile image scale limits, shared by wheel zoom and validation.
pub const TILE_SCALE_MIN: f32 = 0.1;
pub const TILE_SCALE_MAX: f32 = 5.0;

/// Grid shapes offered by the layout panel: (rows, cols).
pub const GRID_PRESETS: [(usize, usize); 4] = [(2, 2), (3, 2), (3, 3), (4, 3)];

/// Number of tiles in a fresh document. Enough for the largest preset.
pub const DEFAULT_TILE_COUNT: usize = 12;

/// Largest row or column count a document may carry.
pub const MAX_GRID_DIM: usize = 20;

/// Pixel size of the rendered flyer for a given row count. Export passes
/// these exact numbers to the rasterizer so the footer is never cropped.
pub fn post_dimensions(grid_rows: usize) -> (u32, u32) {
    let rows = u32::try_from(grid_rows.max(1)).unwrap_or(u32::MAX);
    let content = HEADER_HEIGHT
        .saturating_add(rows.saturating_mul(ROW_HEIGHT))
        .saturating_add((rows - 1).saturating_mul(ROW_GAP))
        .saturating_add(FOOTER_HEIGHT);
    (POST_WIDTH, content.max(MIN_POST_HEIGHT))
}

// ============================================================================
// TRANSFORMS
// ============================================================================

/// Translation + uniform scale. Used by tile images and background images.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Transform2D {
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, scale: 1.0 };
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Sans,
    Serif,
    Cursive,
}

/// Placement of the brand name and tagline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextTransform {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    /// Degrees. Unbounded; renderers reduce it mod 360.
    #[serde(default)]
    pub rotation: f32,
    pub font: FontFamily,
}

impl TextTransform {
    pub fn new(font: FontFamily) -> Self {
        Self { x: 0.0, y: 0.0, scale: 1.0, rotation: 0.0, font }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogoTransform {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    #[serde(default)]
    pub rotation: f32,
}

impl LogoTransform {
    /// Placement given to a freshly uploaded logo.
    pub const UPLOADED: Self = Self { x: 0.0, y: 0.0, scale: 0.3, rotation: 0.0 };
}

/// Uniform access to the transform structs for the gesture layer.
pub trait Placement: Copy {
    fn offset(&self) -> Vec2;
    fn set_offset(&mut self, offset: Vec2);
    fn scale(&self) -> f32;
    fn set_scale(&mut self, scale: f32);
    /// `None` for placements that cannot rotate.
    fn rotation(&self) -> Option<f32> {
        None
    }
    fn set_rotation(&mut self, _degrees: f32) {}

    fn translated(mut self, delta: Vec2) -> Self {
        self.set_offset(self.offset() + delta);
        self
    }
}

macro_rules! impl_placement_offset_scale {
    () => {
        fn offset(&self) -> Vec2 {
            Vec2::new(self.x, self.y)
        }
        fn set_offset(&mut self, offset: Vec2) {
            self.x = offset.x;
            self.y = offset.y;
        }
        fn scale(&self) -> f32 {
            self.scale
        }
        fn set_scale(&mut self, scale: f32) {
            self.scale = scale;
        }
    };
}

impl Placement for Transform2D {
    impl_placement_offset_scale!();
}

impl Placement for TextTransform {
    impl_placement_offset_scale!();
    fn rotation(&self) -> Option<f32> {
        Some(self.rotation)
    }
    fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
    }
}

impl Placement for LogoTransform {
    impl_placement_offset_scale!();
    fn rotation(&self) -> Option<f32> {
        Some(self.rotation)
    }
    fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
    }
}

/// Rotation as drawn: reduced into `[0, 360)`.
pub fn display_rotation(degrees: f32) -> f32 {
    degrees.rem_euclid(360.0)
}

// ============================================================================
// GRID TILES
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorderStyle {
    #[default]
    None,
    GradientHot,
    GradientCool,
    NeonBlue,
    NeonPink,
    GoldElegant,
    DashedRed,
    DoubleBlack,
}

impl BorderStyle {
    pub const ALL: [BorderStyle; 8] = [
        BorderStyle::None,
        BorderStyle::GradientHot,
        BorderStyle::GradientCool,
        BorderStyle::NeonBlue,
        BorderStyle::NeonPink,
        BorderStyle::GoldElegant,
        BorderStyle::DashedRed,
        BorderStyle::DoubleBlack,
    ];
}

/// One product tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridItem {
    pub image: Option<ImageHandle>,
    pub image_transform: Transform2D,
    pub product_name: String,
    pub product_details: String,
    pub price: String,
    pub original_price: String,
    pub border_style: BorderStyle,
    pub has_shadow: bool,
    pub name_font_size: u32,
    pub details_font_size: u32,
    pub price_font_size: u32,
    pub original_price_font_size: u32,
}

impl Default for GridItem {
    fn default() -> Self {
        Self {
            image: None,
            image_transform: Transform2D::IDENTITY,
            product_name: "Produto".to_string(),
            product_details: String::new(),
            price: "R$ 0,00".to_string(),
            original_price: String::new(),
            border_style: BorderStyle::None,
            has_shadow: false,
            name_font_size: 32,
            details_font_size: 16,
            price_font_size: 56,
            original_price_font_size: 12,
        }
    }
}

impl GridItem {
    /// Whole-percent discount shown on the tile badge, if any.
    ///
    /// Both prices are read in Brazilian notation (`R$ 1.234,90`); a leading
    /// "de" on the original price ("de R$ 20,00") is ignored.
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price.trim();
        if original.is_empty() {
            return None;
        }
        let original = parse_price(strip_de_prefix(original));
        let current = parse_price(&self.price);
        if original > 0.0 && current > 0.0 && original > current {
            let pct = ((original - current) / original * 100.0).round() as u32;
            (pct > 0).then_some(pct)
        } else {
            None
        }
    }
}

fn strip_de_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[..2].eq_ignore_ascii_case(b"de") {
        s[2..].trim_start()
    } else {
        s
    }
}

/// Reads a price like `R$ 12,90`. Everything except digits and commas is
/// dropped, the first comma becomes the decimal point, and parsing stops at
/// any further comma. Unreadable input is 0.
pub fn parse_price(s: &str) -> f64 {
    let cleaned: String = s.chars().filter(|c| c.is_ascii_digit() || *c == ',').collect();
    let mut parts = cleaned.splitn(3, ',');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next();
    let text = match frac {
        Some(frac) => format!("{}.{}", whole, frac),
        None => whole.to_string(),
    };
    text.parse::<f64>().unwrap_or(0.0)
}

// ============================================================================
// PALETTE / LAYOUT
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutType {
    /// Clean and minimal.
    #[default]
    #[serde(rename = "layout-1")]
    Minimal,
    /// Pop art, blue/yellow.
    #[serde(rename = "layout-2")]
    PopArt,
    /// Pink pastel.
    #[serde(rename = "layout-3")]
    Pastel,
    /// Strong blue retail.
    #[serde(rename = "layout-4")]
    Retail,
    /// Chocolate premium tones.
    #[serde(rename = "layout-5")]
    Premium,
    /// Red/yellow urgency.
    #[serde(rename = "layout-6")]
    HighEnergy,
}

impl LayoutType {
    pub const ALL: [LayoutType; 6] = [
        LayoutType::Minimal,
        LayoutType::PopArt,
        LayoutType::Pastel,
        LayoutType::Retail,
        LayoutType::Premium,
        LayoutType::HighEnergy,
    ];

    pub fn id(self) -> &'static str {
        match self {
            LayoutType::Minimal => "layout-1",
            LayoutType::PopArt => "layout-2",
            LayoutType::Pastel => "layout-3",
            LayoutType::Retail => "layout-4",
            LayoutType::Premium => "layout-5",
            LayoutType::HighEnergy => "layout-6",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.id() == id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaletteSlot {
    Primary,
    Secondary,
    Accent,
    Background,
    Tagline,
    Brand,
}

impl PaletteSlot {
    pub const ALL: [PaletteSlot; 6] = [
        PaletteSlot::Primary,
        PaletteSlot::Secondary,
        PaletteSlot::Accent,
        PaletteSlot::Background,
        PaletteSlot::Tagline,
        PaletteSlot::Brand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PaletteSlot::Primary => "primary",
            PaletteSlot::Secondary => "secondary",
            PaletteSlot::Accent => "accent",
            PaletteSlot::Background => "background",
            PaletteSlot::Tagline => "tagline",
            PaletteSlot::Brand => "brand",
        }
    }
}

/// The six named colours of a design, as `#RRGGBB` strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub tagline: String,
    pub brand: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: "#3E2723".to_string(),
            secondary: "#FFF8E1".to_string(),
            accent: "#FF0000".to_string(),
            background: "#FFFFFF".to_string(),
            tagline: "#FFD700".to_string(),
            brand: "#FFFFFF".to_string(),
        }
    }
}

impl Palette {
    pub fn get(&self, slot: PaletteSlot) -> &str {
        match slot {
            PaletteSlot::Primary => &self.primary,
            PaletteSlot::Secondary => &self.secondary,
            PaletteSlot::Accent => &self.accent,
            PaletteSlot::Background => &self.background,
            PaletteSlot::Tagline => &self.tagline,
            PaletteSlot::Brand => &self.brand,
        }
    }

    fn slot_mut(&mut self, slot: PaletteSlot) -> &mut String {
        match slot {
            PaletteSlot::Primary => &mut self.primary,
            PaletteSlot::Secondary => &mut self.secondary,
            PaletteSlot::Accent => &mut self.accent,
            PaletteSlot::Background => &mut self.background,
            PaletteSlot::Tagline => &mut self.tagline,
            PaletteSlot::Brand => &mut self.brand,
        }
    }

    pub fn color32(&self, slot: PaletteSlot) -> Option<Color32> {
        parse_hex_color(self.get(slot))
    }
}

/// Parses `#RRGGBB` (the leading `#` is optional).
pub fn parse_hex_color(s: &str) -> Option<Color32> {
    let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostSize {
    /// Portrait promotional flyer.
    #[default]
    #[serde(rename = "jornalzinho")]
    Flyer,
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// The whole flyer. One value of this type is one undo step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostConfig {
    pub size: PostSize,
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub selected_grid_index: usize,
    pub grid_items: Vec<GridItem>,

    pub cta: String,
    pub cta_bg_color: String,
    pub cta_text_color: String,
    pub cta_font_size: u32,
    pub cta_bg_image: Option<ImageHandle>,
    pub cta_opacity: f32,
    pub cta_bg_transform: Transform2D,

    pub footer_address: String,
    pub footer_disclaimer: String,
    pub footer_info_color: String,

    pub brand_name: String,
    pub brand_transform: TextTransform,
    pub brand_opacity: f32,
    pub brand_color: String,
    pub prefix_text: String,
    pub tagline_text: String,
    pub tagline_transform: TextTransform,
    pub tagline_color: String,
    pub tagline_bg_color: String,
    pub tagline_opacity: f32,

    pub discount_badge_color: String,
    pub discount_badge_bg_color: String,
    pub discount_badge_opacity: f32,
    pub discount_badge_scale: f32,

    pub logo: Option<ImageHandle>,
    pub logo_opacity: f32,
    pub logo_transform: LogoTransform,

    pub layout: LayoutType,
    pub background_image: Option<ImageHandle>,
    pub header_background: Option<ImageHandle>,
    pub header_background_transform: Transform2D,
    pub colors: Palette,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            size: PostSize::Flyer,
            grid_rows: 3,
            grid_cols: 3,
            selected_grid_index: 0,
            grid_items: vec![GridItem::default(); DEFAULT_TILE_COUNT],

            cta: "PEÇA JÁ".to_string(),
            cta_bg_color: "#B91C1C".to_string(),
            cta_text_color: "#FFFFFF".to_string(),
            cta_font_size: 36,
            cta_bg_image: None,
            cta_opacity: 1.0,
            cta_bg_transform: Transform2D::IDENTITY,

            footer_address: "CHOC-LAR DISTRIBUIDORA | Rua 24 de Maio, 815 - Centro, Indaiatuba - SP | Fone: (19) 3875-4667".to_string(),
            footer_disclaimer: "Ofertas válidas conforme período indicado neste encarte ou enquanto durarem os estoques. Imagens meramente ilustrativas. Reservamo-nos o direito de corrigir eventuais erros.".to_string(),
            footer_info_color: "#FFFFFF".to_string(),

            brand_name: "CHOC-LAR".to_string(),
            brand_transform: TextTransform::new(FontFamily::Serif),
            brand_opacity: 1.0,
            brand_color: "#FFFFFF".to_string(),
            prefix_text: "Promoção".to_string(),
            tagline_text: "FESTIVAL DE OFERTAS".to_string(),
            tagline_transform: TextTransform::new(FontFamily::Sans),
            tagline_color: "#DC2626".to_string(),
            tagline_bg_color: "#FFD700".to_string(),
            tagline_opacity: 1.0,

            discount_badge_color: "#FFFFFF".to_string(),
            discount_badge_bg_color: "#DC2626".to_string(),
            discount_badge_opacity: 1.0,
            discount_badge_scale: 1.0,

            logo: None,
            logo_opacity: 1.0,
            logo_transform: LogoTransform::UPLOADED,

            layout: LayoutType::Minimal,
            background_image: None,
            header_background: None,
            header_background_transform: Transform2D::IDENTITY,
            colors: Palette::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("grid must be at least 1x1, got {rows}x{cols}")]
    EmptyGrid { rows: usize, cols: usize },
    #[error("grid {rows}x{cols} exceeds the 20x20 maximum")]
    GridTooLarge { rows: usize, cols: usize },
    #[error("selected tile {index} is outside the {cells}-cell grid")]
    SelectionOutOfGrid { index: usize, cells: usize },
    #[error("selected tile {index} has no item (only {items} items)")]
    SelectionOutOfItems { index: usize, items: usize },
    #[error("{what} scale must be positive, got {value}")]
    NonPositiveScale { what: String, value: f32 },
    #[error("tile {index} image scale {value} is outside [0.1, 5]")]
    TileScaleOutOfRange { index: usize, value: f32 },
    #[error("{what} opacity {value} is outside [0, 1]")]
    OpacityOutOfRange { what: &'static str, value: f32 },
    #[error("palette colour {slot} is not #RRGGBB: {value:?}")]
    InvalidColor { slot: &'static str, value: String },
}

impl PostConfig {
    /// Cells in the grid; only this many leading items are rendered.
    pub fn cell_count(&self) -> usize {
        self.grid_rows.saturating_mul(self.grid_cols)
    }

    /// Items that are actually drawn.
    pub fn visible_items(&self) -> &[GridItem] {
        let n = self.cell_count().min(self.grid_items.len());
        &self.grid_items[..n]
    }

    pub fn selected_item(&self) -> Option<&GridItem> {
        self.grid_items.get(self.selected_grid_index)
    }

    /// Rendered size in document pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        post_dimensions(self.grid_rows)
    }

    /// Highest index the selection may take.
    fn last_selectable(&self) -> usize {
        self.cell_count().min(self.grid_items.len()).saturating_sub(1)
    }

    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.grid_rows == 0 || self.grid_cols == 0 {
            return Err(DocumentError::EmptyGrid { rows: self.grid_rows, cols: self.grid_cols });
        }
        if self.grid_rows > MAX_GRID_DIM || self.grid_cols > MAX_GRID_DIM {
            return Err(DocumentError::GridTooLarge { rows: self.grid_rows, cols: self.grid_cols });
        }
        let cells = self.cell_count();
        if self.selected_grid_index >= cells {
            return Err(DocumentError::SelectionOutOfGrid { index: self.selected_grid_index, cells });
        }
        if self.selected_grid_index >= self.grid_items.len() {
            return Err(DocumentError::SelectionOutOfItems {
                index: self.selected_grid_index,
                items: self.grid_items.len(),
            });
        }

        let scales = [
            ("logo", self.logo_transform.scale),
            ("brand", self.brand_transform.scale),
            ("tagline", self.tagline_transform.scale),
            ("header background", self.header_background_transform.scale),
            ("CTA background", self.cta_bg_transform.scale),
        ];
        for (what, value) in scales {
            if !(value > 0.0) {
                return Err(DocumentError::NonPositiveScale { what: what.to_string(), value });
            }
        }
        for (index, item) in self.grid_items.iter().enumerate() {
            let value = item.image_transform.scale;
            if !(TILE_SCALE_MIN..=TILE_SCALE_MAX).contains(&value) {
                return Err(DocumentError::TileScaleOutOfRange { index, value });
            }
        }

        let opacities = [
            ("logo", self.logo_opacity),
            ("brand", self.brand_opacity),
            ("tagline", self.tagline_opacity),
            ("CTA", self.cta_opacity),
            ("discount badge", self.discount_badge_opacity),
        ];
        for (what, value) in opacities {
            if !(0.0..=1.0).contains(&value) {
                return Err(DocumentError::OpacityOutOfRange { what, value });
            }
        }

        for slot in PaletteSlot::ALL {
            if self.colors.color32(slot).is_none() {
                return Err(DocumentError::InvalidColor {
                    slot: slot.name(),
                    value: self.colors.get(slot).to_string(),
                });
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Snapshot builders. Each returns a new document.
    // ------------------------------------------------------------------

    /// Copy with tile `index` changed by `f`. Out-of-range indices leave the
    /// copy untouched.
    pub fn with_item(&self, index: usize, f: impl FnOnce(&mut GridItem)) -> Self {
        let mut next = self.clone();
        if let Some(item) = next.grid_items.get_mut(index) {
            f(item);
        }
        next
    }

    pub fn with_selected_item(&self, f: impl FnOnce(&mut GridItem)) -> Self {
        self.with_item(self.selected_grid_index, f)
    }

    /// Resize the grid, keeping the selection inside it and making sure
    /// every cell has an item to draw.
    pub fn with_grid_size(&self, rows: usize, cols: usize) -> Self {
        let mut next = self.clone();
        next.grid_rows = rows.clamp(1, MAX_GRID_DIM);
        next.grid_cols = cols.clamp(1, MAX_GRID_DIM);
        let cells = next.cell_count();
        if next.grid_items.len() < cells {
            next.grid_items.resize(cells, GridItem::default());
        }
        next.selected_grid_index = next.selected_grid_index.min(next.last_selectable());
        next
    }

    pub fn with_selected_index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.selected_grid_index = index.min(self.last_selectable());
        next
    }

    pub fn with_previous_selected(&self) -> Self {
        self.with_selected_index(self.selected_grid_index.saturating_sub(1))
    }

    pub fn with_next_selected(&self) -> Self {
        self.with_selected_index(self.selected_grid_index + 1)
    }

    /// Set one palette colour. Three slots drive text colours as well:
    /// brand → brand name, primary → tagline text, secondary → tagline box.
    pub fn with_palette_color(&self, slot: PaletteSlot, hex: &str) -> Self {
        let mut next = self.clone();
        *next.colors.slot_mut(slot) = hex.to_string();
        match slot {
            PaletteSlot::Brand => next.brand_color = hex.to_string(),
            PaletteSlot::Primary => next.tagline_color = hex.to_string(),
            PaletteSlot::Secondary => next.tagline_bg_color = hex.to_string(),
            _ => {}
        }
        next
    }

    /// Replace a tile's photo and re-centre it.
    pub fn with_tile_image(&self, index: usize, image: Option<ImageHandle>) -> Self {
        self.with_item(index, |item| {
            item.image = image;
            item.image_transform = Transform2D::IDENTITY;
        })
    }

    /// Upload a logo (placement resets) or remove it (placement kept).
    pub fn with_logo(&self, logo: Option<ImageHandle>) -> Self {
        let mut next = self.clone();
        if logo.is_some() {
            next.logo_transform = LogoTransform::UPLOADED;
        }
        next.logo = logo;
        next
    }

    /// Apply a header image, optionally reusing it behind the CTA.
    pub fn with_header_background(&self, image: ImageHandle, also_cta: bool) -> Self {
        let mut next = self.clone();
        if also_cta {
            next.cta_bg_image = Some(image.clone());
            next.cta_opacity = 1.0;
            next.cta_bg_transform = Transform2D::IDENTITY;
        }
        next.header_background = Some(image);
        next.header_background_transform = Transform2D::IDENTITY;
        next
    }

    pub fn without_header_background(&self) -> Self {
        let mut next = self.clone();
        next.header_background = None;
        next
    }

    pub fn with_cta_background(&self, image: Option<ImageHandle>) -> Self {
        let mut next = self.clone();
        if image.is_some() {
            next.cta_bg_transform = Transform2D::IDENTITY;
        }
        next.cta_bg_image = image;
        next
    }
}
