//! Input records handed to [`bake`](crate::bake): textures, sprite requests and fonts.
//!
//! All coordinates are in pixels of the original (un-rescaled) source texture,
//! origin top-left, y growing downwards.

use glam::Vec2;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::config::{DiceFilter, PadMode, PolygonCap};
use crate::font::FontDefinition;

/// Index into [`BakeInput::textures`].
pub type TextureId = usize;

/// Where a sprite's pixels come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRef {
    /// The whole texture.
    Texture(TextureId),
    /// A sub-rectangle of a sheet.
    Region {
        texture: TextureId,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    },
}

/// Anchor (mesh origin) of a sprite, relative to its untrimmed source rect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    UpperLeft,
    UpperCenter,
    UpperRight,
    MiddleLeft,
    #[default]
    MiddleCenter,
    MiddleRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
    /// Explicit position in original source pixels.
    Custom { x: f32, y: f32 },
}

impl Anchor {
    /// Anchor position in rescaled pixel space for a `w`x`h` (rescaled) source.
    pub fn resolve(self, w: f32, h: f32, rescale: f32) -> Vec2 {
        let (fx, fy) = match self {
            Anchor::UpperLeft => (0.0, 0.0),
            Anchor::UpperCenter => (0.5, 0.0),
            Anchor::UpperRight => (1.0, 0.0),
            Anchor::MiddleLeft => (0.0, 0.5),
            Anchor::MiddleCenter => (0.5, 0.5),
            Anchor::MiddleRight => (1.0, 0.5),
            Anchor::LowerLeft => (0.0, 1.0),
            Anchor::LowerCenter => (0.5, 1.0),
            Anchor::LowerRight => (1.0, 1.0),
            Anchor::Custom { x, y } => return Vec2::new(x, y) * rescale,
        };
        // Center anchors snap to whole pixels.
        Vec2::new((w * fx).floor(), (h * fy).floor())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceSettings {
    /// Cell width in original pixels; 0 means the full width.
    pub unit_x: u32,
    /// Cell height in original pixels; 0 means the full height.
    pub unit_y: u32,
    #[serde(default)]
    pub filter: DiceFilter,
}

/// One polygon outline, in original source pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryIsland {
    pub points: Vec<Vec2>,
    /// Closed loop (last point joins the first). Open chains only make sense for colliders.
    #[serde(default = "default_connected")]
    pub connected: bool,
}

impl GeometryIsland {
    pub fn closed(points: Vec<Vec2>) -> Self {
        Self {
            points,
            connected: true,
        }
    }
}

fn default_connected() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColliderSpec {
    #[default]
    None,
    /// The caller supplies its own collider; nothing is generated.
    UserDefined,
    /// Box around the trimmed render bounds.
    BoxTrimmed,
    /// Box between two corners in source pixels.
    BoxCustom { min: Vec2, max: Vec2 },
    /// Extruded polygon per island.
    Polygon {
        islands: Vec<GeometryIsland>,
        #[serde(default)]
        cap: PolygonCap,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachPointSpec {
    pub name: String,
    /// Source pixels.
    pub position: Vec2,
    /// Degrees.
    #[serde(default)]
    pub angle: f32,
}

/// One logical sprite to bake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteRequest {
    pub name: String,
    /// `None` (or a dangling texture id) bakes the missing-texture placeholder.
    pub source: Option<SourceRef>,
    pub scale: Vec2,
    pub anchor: Anchor,
    pub trim: bool,
    pub pad: PadMode,
    /// Added on top of the global pad amount.
    pub extra_padding: u32,
    /// Zero the alpha after premultiplying; ignored without premultiplied alpha.
    pub additive: bool,
    pub double_sided: bool,
    pub material_id: usize,
    pub dice: Option<DiceSettings>,
    pub custom_geometry: Option<Vec<GeometryIsland>>,
    pub collider: ColliderSpec,
    pub attach_points: Vec<AttachPointSpec>,
}

impl Default for SpriteRequest {
    fn default() -> Self {
        Self {
            name: String::new(),
            source: None,
            scale: Vec2::ONE,
            anchor: Anchor::default(),
            trim: true,
            pad: PadMode::default(),
            extra_padding: 0,
            additive: false,
            double_sided: false,
            material_id: 0,
            dice: None,
            custom_geometry: None,
            collider: ColliderSpec::None,
            attach_points: Vec::new(),
        }
    }
}

impl SpriteRequest {
    pub fn new(name: impl Into<String>, source: SourceRef) -> Self {
        Self {
            name: name.into(),
            source: Some(source),
            ..Default::default()
        }
    }

    /// Dicing and custom geometry are mutually exclusive; when both are set
    /// neither survives. Returns true if the request was changed.
    pub fn resolve_conflicts(&mut self) -> bool {
        if self.dice.is_some() && self.custom_geometry.is_some() {
            self.dice = None;
            self.custom_geometry = None;
            return true;
        }
        false
    }

    pub fn is_diced(&self) -> bool {
        self.dice.is_some()
    }

    pub fn has_custom_geometry(&self) -> bool {
        self.custom_geometry
            .as_ref()
            .is_some_and(|islands| !islands.is_empty())
    }
}

/// A bitmap font whose glyphs are baked alongside the sprites.
#[derive(Debug, Clone)]
pub struct FontRequest {
    pub name: String,
    pub texture: TextureId,
    pub definition: FontDefinition,
    /// Glyph rects are given bottom-up (flip them against the sheet height).
    pub flip_texture_y: bool,
}

/// Everything one bake consumes.
#[derive(Debug, Clone, Default)]
pub struct BakeInput {
    pub textures: Vec<RgbaImage>,
    pub sprites: Vec<SpriteRequest>,
    pub fonts: Vec<FontRequest>,
}
