use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Bake configuration.
// Key notes:
//   - page size is auto-optimized below `max_texture_size` unless `forced_size` is set
//   - `heuristics` is the MaxRects portfolio tried for every candidate page size; the least wasted area wins
//   - `parallel` only has an effect when the crate feature "parallel" is on

/// MaxRects placement heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MaxRectsHeuristic {
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
    BottomLeft,
    ContactPoint,
}

impl FromStr for MaxRectsHeuristic {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baf" | "bestareafit" => Ok(Self::BestAreaFit),
            "bssf" | "bestshortsidefit" => Ok(Self::BestShortSideFit),
            "blsf" | "bestlongsidefit" => Ok(Self::BestLongSideFit),
            "bl" | "bottomleft" => Ok(Self::BottomLeft),
            "cp" | "contactpoint" => Ok(Self::ContactPoint),
            _ => Err(()),
        }
    }
}

/// How the pad border around a trimmed sprite is filled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PadMode {
    /// Transparent border.
    #[default]
    Default,
    /// Replicate the nearest interior row/column.
    Extend,
    /// Wrap the opposite edge into the border (seamless tiling).
    TileXY,
    /// Border filled with transparent black, whatever the source edge holds.
    None,
}

impl FromStr for PadMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "transparent" => Ok(Self::Default),
            "extend" => Ok(Self::Extend),
            "tilexy" | "tile" | "wrap" => Ok(Self::TileXY),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// Which dice cells are kept.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiceFilter {
    #[default]
    Complete,
    SolidOnly,
    TransparentOnly,
}

impl FromStr for DiceFilter {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "complete" | "all" => Ok(Self::Complete),
            "solid_only" | "solid" => Ok(Self::SolidOnly),
            "transparent_only" | "transparent" => Ok(Self::TransparentOnly),
            _ => Err(()),
        }
    }
}

/// Which faces of an extruded polygon collider get a triangulated cap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolygonCap {
    #[default]
    None,
    Front,
    Back,
    FrontAndBack,
}

impl PolygonCap {
    pub fn front(self) -> bool {
        matches!(self, PolygonCap::Front | PolygonCap::FrontAndBack)
    }
    pub fn back(self) -> bool {
        matches!(self, PolygonCap::Back | PolygonCap::FrontAndBack)
    }
}

impl FromStr for PolygonCap {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "front" => Ok(Self::Front),
            "back" => Ok(Self::Back),
            "front_and_back" | "both" => Ok(Self::FrontAndBack),
            _ => Err(()),
        }
    }
}

/// Target texture format for the baked pages. Only the dithered modes touch pixels;
/// the rest is echoed in the atlas metadata for the encoder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextureCompression {
    #[default]
    Uncompressed,
    Reduced16Bit,
    Compressed,
    /// RGBA4444 with error diffusion.
    Dithered16BitAlpha,
    /// RGB565 with error diffusion; alpha untouched.
    Dithered16BitNoAlpha,
}

impl FromStr for TextureCompression {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uncompressed" | "rgba32" => Ok(Self::Uncompressed),
            "reduced16bit" | "reduced16" => Ok(Self::Reduced16Bit),
            "compressed" => Ok(Self::Compressed),
            "dithered16bit_alpha" | "dithered16_alpha" | "rgba4444" => Ok(Self::Dithered16BitAlpha),
            "dithered16bit_no_alpha" | "dithered16_no_alpha" | "rgb565" => {
                Ok(Self::Dithered16BitNoAlpha)
            }
            _ => Err(()),
        }
    }
}

/// Sampling filter the pages are meant for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Point,
    #[default]
    Bilinear,
    Trilinear,
}

impl FromStr for FilterMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "point" | "nearest" => Ok(Self::Point),
            "bilinear" | "linear" => Ok(Self::Bilinear),
            "trilinear" => Ok(Self::Trilinear),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalGeneration {
    #[default]
    None,
    Normals,
    NormalsAndTangents,
}

impl FromStr for NormalGeneration {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "normals" => Ok(Self::Normals),
            "normals_and_tangents" | "tangents" => Ok(Self::NormalsAndTangents),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BakeConfig {
    /// Maximum page edge in pixels (auto-sized pages never exceed it).
    #[serde(default = "default_max_texture_size")]
    pub max_texture_size: u32,
    /// Exact page size; disables auto-shrinking and `force_square`.
    #[serde(default)]
    pub forced_size: Option<(u32, u32)>,
    /// Keep auto-sized pages square.
    #[serde(default)]
    pub force_square: bool,
    /// Spill onto extra pages instead of failing when one page is full.
    #[serde(default)]
    pub allow_multiple_pages: bool,
    /// Page limit when `allow_multiple_pages` is on.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Allow the packer to store rectangles transposed.
    #[serde(default = "default_true")]
    pub allow_rotation: bool,
    /// MaxRects portfolio evaluated per candidate page size.
    #[serde(default = "default_heuristics")]
    pub heuristics: Vec<MaxRectsHeuristic>,

    /// Fold pixel-identical tiles into one atlas slot.
    #[serde(default = "default_true")]
    pub remove_duplicates: bool,
    #[serde(default)]
    pub premultiplied_alpha: bool,
    #[serde(default)]
    pub texture_compression: TextureCompression,
    /// Global source downscale, in (0, 1].
    #[serde(default = "default_rescale")]
    pub global_texture_rescale: f32,
    /// Pad border per sprite; `None` picks 0 for point filtering and 2 otherwise.
    #[serde(default)]
    pub pad_amount: Option<u32>,
    #[serde(default)]
    pub filter_mode: FilterMode,
    #[serde(default)]
    pub disable_trimming: bool,
    /// Alpha values <= threshold count as transparent when trimming.
    #[serde(default)]
    pub trim_threshold: u8,

    /// Mesh units per source pixel = global_scale / pixels_per_unit.
    #[serde(default = "default_one")]
    pub global_scale: f32,
    #[serde(default = "default_one")]
    pub pixels_per_unit: f32,
    /// Half depth of extruded colliders.
    #[serde(default = "default_physics_depth")]
    pub physics_depth: f32,
    #[serde(default)]
    pub normal_generation: NormalGeneration,
    /// Emit a second UV channel holding the position within the untrimmed sprite rect.
    #[serde(default)]
    pub sprite_local_uv2: bool,

    /// Process sprites in parallel when feature "parallel" is on.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            max_texture_size: default_max_texture_size(),
            forced_size: None,
            force_square: false,
            allow_multiple_pages: false,
            max_pages: default_max_pages(),
            allow_rotation: true,
            heuristics: default_heuristics(),
            remove_duplicates: true,
            premultiplied_alpha: false,
            texture_compression: TextureCompression::default(),
            global_texture_rescale: default_rescale(),
            pad_amount: None,
            filter_mode: FilterMode::default(),
            disable_trimming: false,
            trim_threshold: 0,
            global_scale: default_one(),
            pixels_per_unit: default_one(),
            physics_depth: default_physics_depth(),
            normal_generation: NormalGeneration::default(),
            sprite_local_uv2: false,
            parallel: false,
        }
    }
}

impl BakeConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - Page dimensions are zero
    /// - The rescale factor is outside (0, 1]
    /// - Scale factors or the page budget would make the output meaningless
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::BakeError;

        let (w, h) = self.page_bounds();
        if w == 0 || h == 0 {
            return Err(BakeError::InvalidDimensions {
                width: w,
                height: h,
            });
        }

        let r = self.global_texture_rescale;
        if !(r > 0.0 && r <= 1.0) {
            return Err(BakeError::InvalidConfig(format!(
                "global_texture_rescale must be in (0, 1], got {r}"
            )));
        }
        if !(self.pixels_per_unit > 0.0) {
            return Err(BakeError::InvalidConfig(format!(
                "pixels_per_unit must be positive, got {}",
                self.pixels_per_unit
            )));
        }
        if !self.global_scale.is_finite() || self.global_scale == 0.0 {
            return Err(BakeError::InvalidConfig(format!(
                "global_scale must be finite and non-zero, got {}",
                self.global_scale
            )));
        }
        if self.max_pages == 0 {
            return Err(BakeError::InvalidConfig("max_pages must be at least 1".into()));
        }
        if self.heuristics.is_empty() {
            return Err(BakeError::InvalidConfig(
                "at least one MaxRects heuristic is required".into(),
            ));
        }

        Ok(())
    }

    /// Upper page bounds: the forced size, or the square max size.
    pub fn page_bounds(&self) -> (u32, u32) {
        self.forced_size
            .unwrap_or((self.max_texture_size, self.max_texture_size))
    }

    /// Resolved base pad amount for every tile.
    pub fn effective_pad(&self) -> u32 {
        match self.pad_amount {
            Some(p) => p,
            None if self.filter_mode == FilterMode::Point => 0,
            None => 2,
        }
    }

    /// Number of pages the packer may open.
    pub fn page_budget(&self) -> usize {
        if self.allow_multiple_pages {
            self.max_pages
        } else {
            1
        }
    }

    /// Mesh units per pixel of the (possibly rescaled) source.
    pub fn pixel_scale(&self) -> f32 {
        self.global_scale / (self.pixels_per_unit * self.global_texture_rescale)
    }
}

fn default_max_texture_size() -> u32 {
    1024
}
fn default_max_pages() -> usize {
    64
}
fn default_true() -> bool {
    true
}
fn default_one() -> f32 {
    1.0
}
fn default_rescale() -> f32 {
    1.0
}
fn default_physics_depth() -> f32 {
    0.1
}
fn default_heuristics() -> Vec<MaxRectsHeuristic> {
    vec![
        MaxRectsHeuristic::BestAreaFit,
        MaxRectsHeuristic::BestLongSideFit,
        MaxRectsHeuristic::BestShortSideFit,
        MaxRectsHeuristic::BottomLeft,
    ]
}

/// Builder for `BakeConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct BakeConfigBuilder {
    cfg: BakeConfig,
}

impl BakeConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: BakeConfig::default(),
        }
    }
    pub fn max_texture_size(mut self, v: u32) -> Self {
        self.cfg.max_texture_size = v;
        self
    }
    pub fn forced_size(mut self, w: u32, h: u32) -> Self {
        self.cfg.forced_size = Some((w, h));
        self
    }
    pub fn force_square(mut self, v: bool) -> Self {
        self.cfg.force_square = v;
        self
    }
    pub fn allow_multiple_pages(mut self, v: bool) -> Self {
        self.cfg.allow_multiple_pages = v;
        self
    }
    pub fn max_pages(mut self, v: usize) -> Self {
        self.cfg.max_pages = v;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.cfg.allow_rotation = v;
        self
    }
    pub fn heuristics(mut self, v: Vec<MaxRectsHeuristic>) -> Self {
        self.cfg.heuristics = v;
        self
    }
    pub fn remove_duplicates(mut self, v: bool) -> Self {
        self.cfg.remove_duplicates = v;
        self
    }
    pub fn premultiplied_alpha(mut self, v: bool) -> Self {
        self.cfg.premultiplied_alpha = v;
        self
    }
    pub fn texture_compression(mut self, v: TextureCompression) -> Self {
        self.cfg.texture_compression = v;
        self
    }
    pub fn global_texture_rescale(mut self, v: f32) -> Self {
        self.cfg.global_texture_rescale = v;
        self
    }
    pub fn pad_amount(mut self, v: u32) -> Self {
        self.cfg.pad_amount = Some(v);
        self
    }
    pub fn filter_mode(mut self, v: FilterMode) -> Self {
        self.cfg.filter_mode = v;
        self
    }
    pub fn disable_trimming(mut self, v: bool) -> Self {
        self.cfg.disable_trimming = v;
        self
    }
    pub fn trim_threshold(mut self, v: u8) -> Self {
        self.cfg.trim_threshold = v;
        self
    }
    pub fn global_scale(mut self, v: f32) -> Self {
        self.cfg.global_scale = v;
        self
    }
    pub fn pixels_per_unit(mut self, v: f32) -> Self {
        self.cfg.pixels_per_unit = v;
        self
    }
    pub fn physics_depth(mut self, v: f32) -> Self {
        self.cfg.physics_depth = v;
        self
    }
    pub fn normal_generation(mut self, v: NormalGeneration) -> Self {
        self.cfg.normal_generation = v;
        self
    }
    pub fn sprite_local_uv2(mut self, v: bool) -> Self {
        self.cfg.sprite_local_uv2 = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn build(self) -> BakeConfig {
        self.cfg
    }
}

impl BakeConfig {
    /// Create a fluent builder for `BakeConfig`.
    pub fn builder() -> BakeConfigBuilder {
        BakeConfigBuilder::new()
    }
}
