//! Ear-clipping triangulation of simple polygons.

use glam::Vec2;

const EPS: f32 = 1e-6;

/// Shoelace area; positive for counter-clockwise winding in a y-up frame.
pub fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    let mut a = 0.0;
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        a += p.x * q.y - q.x * p.y;
    }
    a * 0.5
}

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a - o).perp_dot(b - o)
}

fn in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    cross(a, b, p) >= -EPS && cross(b, c, p) >= -EPS && cross(c, a, p) >= -EPS
}

/// Triangulates a simple polygon given in either winding. Returns indices into
/// `points`, three per triangle, every triangle counter-clockwise (y-up).
pub fn triangulate(points: &[Vec2]) -> Vec<u32> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    let mut ring: Vec<usize> = (0..n).collect();
    if signed_area(points) < 0.0 {
        ring.reverse();
    }
    let mut out = Vec::with_capacity((n - 2) * 3);
    while ring.len() > 3 {
        let m = ring.len();
        let ear = (0..m).find(|&i| {
            let (a, b, c) = (ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m]);
            let (pa, pb, pc) = (points[a], points[b], points[c]);
            if cross(pa, pb, pc) <= EPS {
                return false;
            }
            !ring
                .iter()
                .filter(|&&j| j != a && j != b && j != c)
                .any(|&j| points[j] != pa && points[j] != pb && points[j] != pc && in_triangle(points[j], pa, pb, pc))
        });
        match ear {
            Some(i) => {
                out.extend([ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m]].map(|v| v as u32));
                ring.remove(i);
            }
            None => {
                // degenerate or self-intersecting: fan what is left
                for i in 1..m - 1 {
                    out.extend([ring[0], ring[i], ring[i + 1]].map(|v| v as u32));
                }
                return out;
            }
        }
    }
    out.extend([ring[0], ring[1], ring[2]].map(|v| v as u32));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area_of(points: &[Vec2], idx: &[u32]) -> f32 {
        idx.chunks(3)
            .map(|t| cross(points[t[0] as usize], points[t[1] as usize], points[t[2] as usize]) * 0.5)
            .sum()
    }

    #[test]
    fn clockwise_input_gives_ccw_triangles() {
        let square = [Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0)];
        assert!(signed_area(&square) < 0.0);
        let idx = triangulate(&square);
        assert_eq!(idx.len(), 6);
        for t in idx.chunks(3) {
            assert!(cross(square[t[0] as usize], square[t[1] as usize], square[t[2] as usize]) > 0.0);
        }
    }

    #[test]
    fn concave_polygon_area_is_preserved() {
        let l = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let idx = triangulate(&l);
        assert_eq!(idx.len(), 12);
        assert!((area_of(&l, &idx) - 3.0).abs() < 1e-5);
    }
}
