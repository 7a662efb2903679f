use super::{Packer, Placed};
use crate::config::MaxRectsHeuristic;
use crate::model::Rect;

/// Best spot found for one rectangle.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    rect: Rect,
    flipped: bool,
    score: (i32, i32),
}

pub struct MaxRectsPacker {
    bin: Rect,
    free: Vec<Rect>,
    used: Vec<Rect>,
    heuristic: MaxRectsHeuristic,
    allow_rotation: bool,
}

impl MaxRectsPacker {
    pub fn new(width: u32, height: u32, heuristic: MaxRectsHeuristic, allow_rotation: bool) -> Self {
        let bin = Rect::new(0, 0, width, height);
        Self {
            bin,
            free: vec![bin],
            used: Vec::new(),
            heuristic,
            allow_rotation,
        }
    }

    fn place_rect(&mut self, node: &Rect) {
        // split all free rectangles that intersect with node
        let mut new_free: Vec<Rect> = Vec::new();
        for fr in self.free.iter() {
            if !fr.intersects(node) {
                new_free.push(*fr);
                continue;
            }
            let fr_x2 = fr.x + fr.w;
            let fr_y2 = fr.y + fr.h;
            let n_x2 = node.x + node.w;
            let n_y2 = node.y + node.h;

            // above
            if node.y > fr.y {
                new_free.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
            }
            // below
            if n_y2 < fr_y2 {
                new_free.push(Rect::new(fr.x, n_y2, fr.w, fr_y2 - n_y2));
            }
            // left
            if node.x > fr.x {
                new_free.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
            }
            // right
            if n_x2 < fr_x2 {
                new_free.push(Rect::new(n_x2, fr.y, fr_x2 - n_x2, fr.h));
            }
        }

        self.free = new_free;
        self.prune_free_list();
        self.used.push(*node);
    }

    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let mut j = i + 1;
            let a = self.free[i];
            let mut remove_i = false;
            while j < self.free.len() {
                let b = self.free[j];
                if b.contains(&a) {
                    remove_i = true;
                    break;
                }
                if a.contains(&b) {
                    self.free.remove(j);
                    continue;
                }
                j += 1;
            }
            if remove_i {
                self.free.remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn score(&self, fr: &Rect, w: u32, h: u32) -> (i32, i32) {
        let leftover_h = fr.w as i32 - w as i32;
        let leftover_v = fr.h as i32 - h as i32;
        let short_fit = leftover_h.abs().min(leftover_v.abs());
        let long_fit = leftover_h.abs().max(leftover_v.abs());
        let area_fit = (fr.area() - (w as u64 * h as u64)) as i32;
        match self.heuristic {
            MaxRectsHeuristic::BestAreaFit => (area_fit, short_fit),
            MaxRectsHeuristic::BestShortSideFit => (short_fit, long_fit),
            MaxRectsHeuristic::BestLongSideFit => (long_fit, short_fit),
            MaxRectsHeuristic::BottomLeft => ((fr.y + h) as i32, fr.x as i32),
            MaxRectsHeuristic::ContactPoint => {
                // maximize contact score: use negative for minimization
                let contact = self.contact_point_score(fr.x, fr.y, w, h);
                (-(contact as i32), area_fit)
            }
        }
    }

    fn find_position(&self, w: u32, h: u32) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        let mut best_top = u32::MAX; // tie-break: prefer smaller top side (y + h)
        let mut best_left = u32::MAX; // then prefer smaller x

        let mut consider = |fr: &Rect, cw: u32, ch: u32, flipped: bool| {
            let score = self.score(fr, cw, ch);
            let top = fr.y.saturating_add(ch);
            let better = match &best {
                None => true,
                Some(b) => {
                    score < b.score
                        || (score == b.score && (top < best_top || (top == best_top && fr.x < best_left)))
                }
            };
            if better {
                best = Some(Candidate {
                    rect: Rect::new(fr.x, fr.y, cw, ch),
                    flipped,
                    score,
                });
                best_top = top;
                best_left = fr.x;
            }
        };

        for fr in &self.free {
            if fr.w >= w && fr.h >= h {
                consider(fr, w, h, false);
            }
            if self.allow_rotation && w != h && fr.w >= h && fr.h >= w {
                consider(fr, h, w, true);
            }
        }
        best
    }

    fn contact_point_score(&self, x: u32, y: u32, w: u32, h: u32) -> u32 {
        let node = Rect::new(x, y, w, h);
        let mut score = 0u32;
        // contact with borders
        if node.x == self.bin.x {
            score += node.h;
        }
        if node.y == self.bin.y {
            score += node.w;
        }
        if node.x + node.w == self.bin.x + self.bin.w {
            score += node.h;
        }
        if node.y + node.h == self.bin.y + self.bin.h {
            score += node.w;
        }

        // contact with used rectangles
        for u in &self.used {
            // vertical contact (left/right edges)
            if node.x == u.x + u.w || u.x == node.x + node.w {
                score += overlap_1d(node.y, node.y + node.h, u.y, u.y + u.h);
            }
            // horizontal contact (top/bottom edges)
            if node.y == u.y + u.h || u.y == node.y + node.h {
                score += overlap_1d(node.x, node.x + node.w, u.x, u.x + u.w);
            }
        }
        score
    }

    fn used_area(&self) -> u64 {
        self.used.iter().map(Rect::area).sum()
    }
}

fn overlap_1d(a1: u32, a2: u32, b1: u32, b2: u32) -> u32 {
    let start = a1.max(b1);
    let end = a2.min(b2);
    end.saturating_sub(start)
}

impl<K: Copy> Packer<K> for MaxRectsPacker {
    /// Offline insertion: repeatedly places whichever remaining rectangle scores
    /// best anywhere on the page, until none fits. `items` keeps what was not placed.
    fn insert_batch(&mut self, items: &mut Vec<(K, u32, u32)>) -> Vec<Placed<K>> {
        let mut placed = Vec::with_capacity(items.len());
        loop {
            let mut best: Option<(usize, Candidate)> = None;
            for (i, &(_, w, h)) in items.iter().enumerate() {
                if let Some(c) = self.find_position(w, h) {
                    if best.as_ref().is_none_or(|(_, b)| c.score < b.score) {
                        best = Some((i, c));
                    }
                }
            }
            let Some((i, c)) = best else { break };
            let (key, _, _) = items.remove(i);
            self.place_rect(&c.rect);
            placed.push(Placed {
                key,
                rect: c.rect,
                flipped: c.flipped,
            });
        }
        placed
    }

    fn occupancy(&self) -> f32 {
        let bin = self.bin.area();
        if bin == 0 {
            return 0.0;
        }
        self.used_area() as f32 / bin as f32
    }

    fn wasted_area(&self) -> u64 {
        self.bin.area().saturating_sub(self.used_area())
    }
}
