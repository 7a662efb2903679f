//! Render mesh generation against the packed atlas.
//!
//! Pixel space is the rescaled source: origin top-left, y down. Mesh space is
//! y up, centred on the sprite's anchor. UVs are page-normalised with v down.

use glam::{Vec2, Vec3, Vec4};

use crate::config::NormalGeneration;
use crate::model::{AtlasEntry, Bounds};
use crate::process::ProcessedTile;
use crate::request::GeometryIsland;
use crate::triangulate::triangulate;

/// Inward UV inset in pixels, so bilinear taps never reach a neighbour.
const UV_INSET: f32 = 0.001;

/// Maps a sprite's pixel space into its mesh space.
#[derive(Debug, Clone, Copy)]
pub struct SpriteFrame {
    /// Untrimmed size in rescaled pixels.
    pub width: f32,
    pub height: f32,
    /// Anchor in rescaled pixels.
    pub anchor: Vec2,
    /// Per-sprite scale.
    pub scale: Vec2,
    /// Mesh units per rescaled pixel.
    pub pixel_scale: f32,
    /// Global texture rescale; original pixels * rescale = pixel space.
    pub rescale: f32,
}

impl SpriteFrame {
    pub fn local(&self, px: Vec2) -> Vec3 {
        Vec3::new(
            (px.x - self.anchor.x) * self.scale.x * self.pixel_scale,
            (self.anchor.y - px.y) * self.scale.y * self.pixel_scale,
            0.0,
        )
    }

    /// Same as [`local`](Self::local) for a point given in original source pixels.
    pub fn local_original(&self, p: Vec2) -> Vec3 {
        self.local(p * self.rescale)
    }

    /// Bounds of the full, untrimmed source rect.
    pub fn untrimmed_bounds(&self) -> Bounds {
        Bounds::from_points(&[self.local(Vec2::ZERO), self.local(Vec2::new(self.width, self.height))])
    }

    /// Mesh size of one original source pixel.
    pub fn texel_size(&self) -> Vec2 {
        self.scale * self.pixel_scale * self.rescale
    }
}

/// A processed tile together with where it landed.
#[derive(Debug, Clone, Copy)]
pub struct PlacedTile<'a> {
    pub tile: &'a ProcessedTile,
    pub entry: &'a AtlasEntry,
    pub page_size: (u32, u32),
    /// Top-left of the unprocessed rect in the sprite's pixel space (dice cell origin).
    pub cell_origin: (u32, u32),
}

/// Page-normalised content rect of a placement, pad excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl PlacedTile<'_> {
    /// Content rect with the anti-bleed inset applied.
    pub fn uv_rect(&self) -> UvRect {
        let (pw, ph) = (self.page_size.0 as f32, self.page_size.1 as f32);
        let (e, pad) = (self.entry, self.tile.pad as f32);
        let (eu, ev) = (UV_INSET / pw, UV_INSET / ph);
        UvRect {
            u0: (e.x as f32 + pad) / pw + eu,
            v0: (e.y as f32 + pad) / ph + ev,
            u1: (e.x as f32 + e.w as f32 - pad) / pw - eu,
            v1: (e.y as f32 + e.h as f32 - pad) / ph - ev,
        }
    }

    /// Trimmed rect in sprite pixel space.
    fn pixel_rect(&self) -> (Vec2, Vec2) {
        let t = &self.tile.trim;
        let min = Vec2::new((self.cell_origin.0 + t.x) as f32, (self.cell_origin.1 + t.y) as f32);
        (min, min + Vec2::new(t.w as f32, t.h as f32))
    }

    /// UV of a point given relative to the trimmed rect's top-left.
    fn uv_at(&self, d: Vec2) -> Vec2 {
        let (pw, ph) = (self.page_size.0 as f32, self.page_size.1 as f32);
        let pad = self.tile.pad as f32;
        let d = if self.entry.flipped { Vec2::new(d.y, d.x) } else { d };
        let r = self.uv_rect();
        Vec2::new(
            ((self.entry.x as f32 + pad + d.x) / pw).clamp(r.u0, r.u1),
            ((self.entry.y as f32 + pad + d.y) / ph).clamp(r.v0, r.v1),
        )
    }
}

/// Flat vertex/index buffers, plus each vertex's pixel-space position.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub pixels: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl MeshData {
    fn push_vertex(&mut self, frame: &SpriteFrame, px: Vec2, uv: Vec2) {
        self.positions.push(frame.local(px));
        self.uvs.push(uv);
        self.pixels.push(px);
    }

    /// Appends one quad for `placed`; vertices bottom-left, bottom-right,
    /// top-left, top-right, two counter-clockwise triangles.
    pub fn push_quad(&mut self, frame: &SpriteFrame, placed: &PlacedTile) {
        let base = self.positions.len() as u32;
        let (min, max) = placed.pixel_rect();
        let r = placed.uv_rect();
        let uvs = if placed.entry.flipped {
            [
                Vec2::new(r.u1, r.v0),
                Vec2::new(r.u1, r.v1),
                Vec2::new(r.u0, r.v0),
                Vec2::new(r.u0, r.v1),
            ]
        } else {
            [
                Vec2::new(r.u0, r.v1),
                Vec2::new(r.u1, r.v1),
                Vec2::new(r.u0, r.v0),
                Vec2::new(r.u1, r.v0),
            ]
        };
        let corners = [
            Vec2::new(min.x, max.y),
            Vec2::new(max.x, max.y),
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
        ];
        for (px, uv) in corners.into_iter().zip(uvs) {
            self.push_vertex(frame, px, uv);
        }
        self.indices
            .extend([0, 1, 3, 0, 3, 2].map(|i| base + i));
    }

    /// Appends each island as a triangulated polygon, UV-mapped straight from
    /// its pixel coordinates.
    pub fn push_polygons(&mut self, frame: &SpriteFrame, islands: &[GeometryIsland], placed: &PlacedTile) {
        let (min, _) = placed.pixel_rect();
        for island in islands {
            if island.points.len() < 3 {
                continue;
            }
            let base = self.positions.len() as u32;
            let pixels: Vec<Vec2> = island.points.iter().map(|p| *p * frame.rescale).collect();
            for px in &pixels {
                self.push_vertex(frame, *px, placed.uv_at(*px - min));
            }
            let mesh_pts: Vec<Vec2> = self.positions[base as usize..].iter().map(|p| p.truncate()).collect();
            self.indices.extend(triangulate(&mesh_pts).into_iter().map(|i| base + i));
        }
    }

    /// Duplicates every vertex and adds the reversed triangles on the copies.
    pub fn make_double_sided(&mut self) {
        let n = self.positions.len() as u32;
        self.positions.extend_from_within(..);
        self.uvs.extend_from_within(..);
        self.pixels.extend_from_within(..);
        let back: Vec<u32> = self
            .indices
            .chunks_exact(3)
            .flat_map(|t| [t[0] + n, t[2] + n, t[1] + n])
            .collect();
        self.indices.extend(back);
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.positions)
    }

    /// Area-weighted vertex normals.
    pub fn normals(&self) -> Vec<Vec3> {
        let mut acc = vec![Vec3::ZERO; self.positions.len()];
        for t in self.indices.chunks_exact(3) {
            let (a, b, c) = (t[0] as usize, t[1] as usize, t[2] as usize);
            let n = (self.positions[b] - self.positions[a]).cross(self.positions[c] - self.positions[a]);
            for i in [a, b, c] {
                acc[i] += n;
            }
        }
        acc.into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Z))
            .collect()
    }

    pub fn tangents(&self) -> Vec<Vec4> {
        vec![Vec4::new(1.0, 0.0, 0.0, 1.0); self.positions.len()]
    }

    /// Position of each vertex within the untrimmed rect, normalised, y up.
    pub fn uv2(&self, frame: &SpriteFrame) -> Vec<Vec2> {
        self.pixels
            .iter()
            .map(|p| Vec2::new(p.x / frame.width.max(1.0), 1.0 - p.y / frame.height.max(1.0)))
            .collect()
    }

    pub fn vertex_attributes(&self, mode: NormalGeneration) -> (Option<Vec<Vec3>>, Option<Vec<Vec4>>) {
        match mode {
            NormalGeneration::None => (None, None),
            NormalGeneration::Normals => (Some(self.normals()), None),
            NormalGeneration::NormalsAndTangents => (Some(self.normals()), Some(self.tangents())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;
    use crate::process::TileOrigin;

    fn frame() -> SpriteFrame {
        SpriteFrame {
            width: 10.0,
            height: 10.0,
            anchor: Vec2::new(5.0, 5.0),
            scale: Vec2::ONE,
            pixel_scale: 1.0,
            rescale: 1.0,
        }
    }

    fn tile() -> ProcessedTile {
        let mut t = ProcessedTile::transparent((10, 10), 1, TileOrigin::Sprite { sprite: 0 });
        t.trim = Rect::new(2, 3, 4, 5);
        t.rgba = image::RgbaImage::new(6, 7);
        t
    }

    #[test]
    fn quad_positions_follow_trim_and_anchor() {
        let t = tile();
        let entry = AtlasEntry {
            slot: 0,
            page: 0,
            x: 10,
            y: 20,
            w: 6,
            h: 7,
            flipped: false,
        };
        let placed = PlacedTile {
            tile: &t,
            entry: &entry,
            page_size: (64, 64),
            cell_origin: (0, 0),
        };
        let mut m = MeshData::default();
        m.push_quad(&frame(), &placed);
        // bottom-left: pixel (2, 8) -> (-3, -3)
        assert_eq!(m.positions[0], Vec3::new(-3.0, -3.0, 0.0));
        assert_eq!(m.positions[3], Vec3::new(1.0, 2.0, 0.0));
        let r = placed.uv_rect();
        assert!((r.u0 - 11.0 / 64.0).abs() < 1e-3 && r.u0 > 11.0 / 64.0);
        assert!((r.v1 - 26.0 / 64.0).abs() < 1e-3 && r.v1 < 26.0 / 64.0);
        assert_eq!(m.uvs[0], Vec2::new(r.u0, r.v1));
        assert_eq!(m.indices, vec![0, 1, 3, 0, 3, 2]);
        for n in m.normals() {
            assert_eq!(n, Vec3::Z);
        }
    }

    #[test]
    fn double_sided_reverses_copies() {
        let t = tile();
        let entry = AtlasEntry {
            slot: 0,
            page: 0,
            x: 0,
            y: 0,
            w: 7,
            h: 6,
            flipped: true,
        };
        let placed = PlacedTile {
            tile: &t,
            entry: &entry,
            page_size: (32, 32),
            cell_origin: (0, 0),
        };
        let mut m = MeshData::default();
        m.push_quad(&frame(), &placed);
        let r = placed.uv_rect();
        // top-left of the tile sits at the page-space top-left even when transposed
        assert_eq!(m.uvs[2], Vec2::new(r.u0, r.v0));
        assert_eq!(m.uvs[0], Vec2::new(r.u1, r.v0));
        m.make_double_sided();
        assert_eq!(m.positions.len(), 8);
        assert_eq!(&m.indices[6..], &[4, 7, 5, 4, 6, 7]);
        let normals = m.normals();
        assert_eq!(normals[0], Vec3::Z);
        assert_eq!(normals[4], -Vec3::Z);
    }
}
