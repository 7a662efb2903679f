use glam::{Vec2, Vec3, Vec4};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::config::{FilterMode, TextureCompression};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Inclusive right edge coordinate (`x + w - 1`).
    pub fn right(&self) -> u32 {
        self.x + self.w.saturating_sub(1)
    }
    /// Inclusive bottom edge coordinate (`y + h - 1`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h.saturating_sub(1)
    }
    /// Returns true if `r` is fully inside `self` (inclusive edges).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// True if the two rectangles share at least one pixel.
    pub fn intersects(&self, o: &Rect) -> bool {
        !(self.x >= o.x + o.w || o.x >= self.x + self.w || self.y >= o.y + o.h || o.y >= self.y + self.h)
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// Placement of one atlas slot on a page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtlasEntry {
    /// Atlas slot (deduplicated tile index) this placement stores.
    pub slot: usize,
    pub page: usize,
    pub x: u32,
    pub y: u32,
    /// Footprint on the page (post-flip width/height).
    pub w: u32,
    pub h: u32,
    /// Stored transposed: `page(x + ty, y + tx) = tile(tx, ty)`.
    pub flipped: bool,
}

impl AtlasEntry {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

/// Logical record of one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Used area / page area, as measured by the packer.
    pub occupancy: f32,
    pub entries: Vec<AtlasEntry>,
}

/// A composited page: layout plus pixels.
#[derive(Debug, Clone)]
pub struct AtlasPage {
    pub layout: PageLayout,
    pub rgba: RgbaImage,
}

/// Axis-aligned box in mesh space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Bounds {
    pub center: Vec3,
    pub size: Vec3,
}

impl Bounds {
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Self {
            center: (min + max) * 0.5,
            size: max - min,
        }
    }
    pub fn min(&self) -> Vec3 {
        self.center - self.size * 0.5
    }
    pub fn max(&self) -> Vec3 {
        self.center + self.size * 0.5
    }
}

/// Generated collider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColliderGeometry {
    #[default]
    None,
    /// Left to the caller.
    Unset,
    Box {
        center: Vec3,
        half_extents: Vec3,
    },
    /// Extruded polygon; `indices_back` holds the same triangles with reversed winding.
    Mesh {
        vertices: Vec<Vec3>,
        indices: Vec<u32>,
        indices_back: Vec<u32>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachPoint {
    pub name: String,
    pub position: Vec2,
    pub angle: f32,
}

/// Why a sprite's pixels were substituted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    /// Source texture missing; the checkerboard tile was baked.
    MissingTexture,
    /// Nothing visible (or zero-area region); a 1x1 transparent tile was baked.
    Transparent,
}

/// Render and physics data for one sprite request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteDefinition {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv2: Option<Vec<Vec2>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<Vec3>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tangents: Option<Vec<Vec4>>,
    pub indices: Vec<u32>,
    pub bounds: Bounds,
    pub untrimmed_bounds: Bounds,
    /// Size of one source pixel in mesh units.
    pub texel_size: Vec2,
    pub collider: ColliderGeometry,
    pub material_id: usize,
    /// First page the sprite samples from.
    pub page: usize,
    pub flipped: bool,
    pub attach_points: Vec<AttachPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<Placeholder>,
}

/// Atlas-level metadata echoed to exporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasMeta {
    /// Schema version for the JSON export; bumped on breaking changes.
    pub schema_version: String,
    pub app: String,
    pub version: String,
    pub texture_compression: TextureCompression,
    pub filter_mode: FilterMode,
    pub premultiplied_alpha: bool,
    pub pad_amount: u32,
    pub max_texture_size: u32,
    pub global_texture_rescale: f32,
}

/// Statistics about a bake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BakeStats {
    pub num_pages: usize,
    pub num_sprites: usize,
    /// Distinct atlas slots actually packed.
    pub num_slots: usize,
    /// Tiles that reused an existing slot.
    pub duplicates_folded: usize,
    /// Total area of all pages (sum of width * height for each page).
    pub total_page_area: u64,
    /// Sum of placed slot areas, padding included.
    pub used_area: u64,
    /// Occupancy ratio: used_area / total_page_area (0.0 to 1.0).
    pub occupancy: f64,
    pub max_page_width: u32,
    pub max_page_height: u32,
    pub num_flipped: usize,
}

impl BakeStats {
    pub fn from_pages(pages: &[AtlasPage], num_sprites: usize, duplicates_folded: usize) -> Self {
        let mut stats = BakeStats {
            num_pages: pages.len(),
            num_sprites,
            num_slots: 0,
            duplicates_folded,
            total_page_area: 0,
            used_area: 0,
            occupancy: 0.0,
            max_page_width: 0,
            max_page_height: 0,
            num_flipped: 0,
        };
        for page in pages {
            let l = &page.layout;
            stats.total_page_area += l.width as u64 * l.height as u64;
            stats.max_page_width = stats.max_page_width.max(l.width);
            stats.max_page_height = stats.max_page_height.max(l.height);
            for e in &l.entries {
                stats.num_slots += 1;
                stats.used_area += e.rect().area();
                if e.flipped {
                    stats.num_flipped += 1;
                }
            }
        }
        if stats.total_page_area > 0 {
            stats.occupancy = stats.used_area as f64 / stats.total_page_area as f64;
        }
        stats
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Pages: {}, Sprites: {}, Slots: {} ({} folded), Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px², Flipped: {}",
            self.num_pages,
            self.num_sprites,
            self.num_slots,
            self.duplicates_folded,
            self.occupancy * 100.0,
            self.total_page_area,
            self.used_area,
            self.num_flipped,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_page_area.saturating_sub(self.used_area)
    }

    /// Returns wasted space as a percentage (0.0 to 100.0).
    pub fn waste_percentage(&self) -> f64 {
        if self.total_page_area > 0 {
            (self.wasted_area() as f64 / self.total_page_area as f64) * 100.0
        } else {
            0.0
        }
    }
}
