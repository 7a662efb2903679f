//! Physics collider generation.

use glam::{Vec2, Vec3};

use crate::config::PolygonCap;
use crate::geometry::SpriteFrame;
use crate::model::{Bounds, ColliderGeometry};
use crate::request::{ColliderSpec, GeometryIsland};
use crate::triangulate::{signed_area, triangulate};

/// Builds the collider for `spec`. `render_bounds` are the sprite's trimmed
/// mesh bounds; `depth` is half the extrusion along z.
pub fn build_collider(spec: &ColliderSpec, frame: &SpriteFrame, render_bounds: &Bounds, depth: f32) -> ColliderGeometry {
    match spec {
        ColliderSpec::None => ColliderGeometry::None,
        ColliderSpec::UserDefined => ColliderGeometry::Unset,
        ColliderSpec::BoxTrimmed => ColliderGeometry::Box {
            center: Vec3::new(render_bounds.center.x, render_bounds.center.y, 0.0),
            half_extents: Vec3::new(render_bounds.size.x * 0.5, render_bounds.size.y * 0.5, depth),
        },
        ColliderSpec::BoxCustom { min, max } => {
            let a = frame.local_original(*min);
            let b = frame.local_original(*max);
            let lo = a.min(b);
            let hi = a.max(b);
            ColliderGeometry::Box {
                center: Vec3::new((lo.x + hi.x) * 0.5, (lo.y + hi.y) * 0.5, 0.0),
                half_extents: Vec3::new((hi.x - lo.x) * 0.5, (hi.y - lo.y) * 0.5, depth),
            }
        }
        ColliderSpec::Polygon { islands, cap } => extrude(islands, *cap, frame, depth),
    }
}

/// Extrudes each island into side walls (plus optional caps). Every vertex is
/// emitted twice: front at `-depth`, back at `+depth`.
pub fn extrude(islands: &[GeometryIsland], cap: PolygonCap, frame: &SpriteFrame, depth: f32) -> ColliderGeometry {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for island in islands {
        let n = island.points.len();
        if n < 2 {
            continue;
        }
        let pts: Vec<Vec2> = island
            .points
            .iter()
            .map(|p| frame.local_original(*p).truncate())
            .collect();
        let base = vertices.len() as u32;
        for p in &pts {
            vertices.push(p.extend(-depth));
            vertices.push(p.extend(depth));
        }
        // open chains are oriented as if they were closed
        let ccw = signed_area(&pts) >= 0.0;
        let edges = if island.connected { n } else { n - 1 };
        for e in 0..edges {
            let i = e as u32;
            let j = ((e + 1) % n) as u32;
            let (f0, b0, f1, b1) = (base + 2 * i, base + 2 * i + 1, base + 2 * j, base + 2 * j + 1);
            if ccw {
                indices.extend([f0, f1, b0, f1, b1, b0]);
            } else {
                indices.extend([b0, f1, f0, b0, b1, f1]);
            }
        }
        if island.connected && n >= 3 {
            let tris = triangulate(&pts);
            if cap.front() {
                for t in tris.chunks_exact(3) {
                    indices.extend([t[0], t[2], t[1]].map(|k| base + 2 * k));
                }
            }
            if cap.back() {
                indices.extend(tris.iter().map(|k| base + 2 * k + 1));
            }
        }
    }
    if indices.is_empty() {
        return ColliderGeometry::None;
    }
    let indices_back = indices
        .chunks_exact(3)
        .flat_map(|t| [t[0], t[2], t[1]])
        .collect();
    ColliderGeometry::Mesh {
        vertices,
        indices,
        indices_back,
    }
}
