//! Page builder: auto-sizes each page and spills onto further pages.

use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::maxrects::MaxRectsPacker;
use super::{Packer, Placed};
use crate::config::{BakeConfig, MaxRectsHeuristic};
use crate::error::{BakeError, Result};
use crate::model::{AtlasEntry, PageLayout};

/// Knobs of the page builder, usually derived from [`BakeConfig`].
#[derive(Debug, Clone)]
pub struct PagingOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// Pages are exactly `max_width` x `max_height`.
    pub forced: bool,
    pub force_square: bool,
    pub max_pages: usize,
    pub allow_rotation: bool,
    pub heuristics: Vec<MaxRectsHeuristic>,
    pub parallel: bool,
}

impl PagingOptions {
    pub fn from_config(cfg: &BakeConfig) -> Self {
        let (max_width, max_height) = cfg.page_bounds();
        Self {
            max_width,
            max_height,
            forced: cfg.forced_size.is_some(),
            force_square: cfg.force_square && cfg.forced_size.is_none(),
            max_pages: cfg.page_budget(),
            allow_rotation: cfg.allow_rotation,
            heuristics: cfg.heuristics.clone(),
            parallel: cfg.parallel,
        }
    }
}

/// One packing attempt at a fixed page size.
struct Attempt {
    placed: Vec<Placed<usize>>,
    left: Vec<(usize, u32, u32)>,
    occupancy: f32,
    wasted: u64,
}

fn attempt(width: u32, height: u32, items: &[(usize, u32, u32)], heuristic: MaxRectsHeuristic, rot: bool) -> Attempt {
    let mut packer = MaxRectsPacker::new(width, height, heuristic, rot);
    let mut left = items.to_vec();
    let placed = packer.insert_batch(&mut left);
    Attempt {
        placed,
        left,
        occupancy: <MaxRectsPacker as Packer<usize>>::occupancy(&packer),
        wasted: <MaxRectsPacker as Packer<usize>>::wasted_area(&packer),
    }
}

/// Runs the heuristic portfolio and keeps the least wasted result (first wins ties).
fn best_attempt(width: u32, height: u32, items: &[(usize, u32, u32)], opts: &PagingOptions) -> Attempt {
    #[cfg(feature = "parallel")]
    let results: Vec<Attempt> = if opts.parallel {
        opts.heuristics
            .par_iter()
            .map(|h| attempt(width, height, items, *h, opts.allow_rotation))
            .collect()
    } else {
        opts.heuristics
            .iter()
            .map(|h| attempt(width, height, items, *h, opts.allow_rotation))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let results: Vec<Attempt> = opts
        .heuristics
        .iter()
        .map(|h| attempt(width, height, items, *h, opts.allow_rotation))
        .collect();

    let mut best: Option<Attempt> = None;
    for a in results {
        if best.as_ref().is_none_or(|b| a.wasted < b.wasted) {
            best = Some(a);
        }
    }
    best.unwrap_or(Attempt {
        placed: Vec::new(),
        left: items.to_vec(),
        occupancy: 0.0,
        wasted: width as u64 * height as u64,
    })
}

/// Packs one page from `items`, shrinking from the maximum size while more than
/// half the page stays used, and stepping back up once a shrink no longer fits.
fn pack_page(items: &[(usize, u32, u32)], opts: &PagingOptions) -> (u32, u32, Attempt) {
    let (mut w, mut h) = (opts.max_width, opts.max_height);
    let mut passes = 1;
    let mut reverted = false;
    loop {
        let a = best_attempt(w, h, items, opts);
        let all_used = a.left.is_empty();
        debug!(width = w, height = h, placed = a.placed.len(), occupancy = a.occupancy, "page attempt");
        let first_pass_full = passes == 1 && a.occupancy > 0.5;
        if opts.forced || first_pass_full || (passes > 1 && a.occupancy > 0.5 && all_used) || reverted {
            return (w, h, a);
        }
        if !all_used {
            let grown = if opts.force_square {
                (w * 2, h * 2)
            } else if w < h {
                (w * 2, h)
            } else {
                (w, h * 2)
            };
            if grown.0 > opts.max_width || grown.1 > opts.max_height {
                return (w, h, a);
            }
            (w, h) = grown;
            reverted = true;
        } else {
            let shrunk = if opts.force_square {
                (w / 2, h / 2)
            } else if w < h {
                (w, h / 2)
            } else {
                (w / 2, h)
            };
            if shrunk.0 == 0 || shrunk.1 == 0 {
                return (w, h, a);
            }
            (w, h) = shrunk;
        }
        passes += 1;
    }
}

/// Packs `sizes` (indexed by slot) onto pages.
///
/// Fails with `OversizeTexture` if a slot cannot fit even an empty page, and with
/// `TooManyTextures` once the page budget is spent with slots left over.
#[instrument(skip_all, fields(slots = sizes.len()))]
pub fn pack_pages(sizes: &[(u32, u32)], opts: &PagingOptions) -> Result<Vec<PageLayout>> {
    let (max_w, max_h) = (opts.max_width, opts.max_height);
    for (slot, &(w, h)) in sizes.iter().enumerate() {
        let fits = if opts.allow_rotation {
            w.max(h) <= max_w.max(max_h) && w.min(h) <= max_w.min(max_h)
        } else {
            w <= max_w && h <= max_h
        };
        if !fits {
            return Err(BakeError::OversizeTexture {
                slot,
                width: w,
                height: h,
                max_width: max_w,
                max_height: max_h,
            });
        }
    }

    let total = sizes.len();
    let mut remaining: Vec<(usize, u32, u32)> = sizes.iter().enumerate().map(|(i, &(w, h))| (i, w, h)).collect();
    let mut pages: Vec<PageLayout> = Vec::new();
    while !remaining.is_empty() {
        if pages.len() >= opts.max_pages {
            return Err(BakeError::TooManyTextures {
                placed: total - remaining.len(),
                total,
                pages: pages.len(),
            });
        }
        let index = pages.len();
        let (width, height, a) = pack_page(&remaining, opts);
        if a.placed.is_empty() {
            return Err(BakeError::TooManyTextures {
                placed: total - remaining.len(),
                total,
                pages: pages.len(),
            });
        }
        let entries = a
            .placed
            .iter()
            .map(|p| AtlasEntry {
                slot: p.key,
                page: index,
                x: p.rect.x,
                y: p.rect.y,
                w: p.rect.w,
                h: p.rect.h,
                flipped: p.flipped,
            })
            .collect();
        debug!(page = index, width, height, occupancy = a.occupancy, "page packed");
        pages.push(PageLayout {
            index,
            width,
            height,
            occupancy: a.occupancy,
            entries,
        });
        remaining = a.left;
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> PagingOptions {
        PagingOptions::from_config(&BakeConfig::default())
    }

    #[test]
    fn shrinks_to_smallest_fitting_page() {
        let pages = pack_pages(&[(60, 60), (60, 60)], &opts()).expect("pack");
        assert_eq!(pages.len(), 1);
        // halves alternate width then height: ... 128x128 -> 64x128
        assert_eq!((pages[0].width, pages[0].height), (64, 128));
        assert!(pages[0].occupancy > 0.5);
    }

    #[test]
    fn forced_size_is_kept() {
        let mut o = opts();
        o.max_width = 300;
        o.max_height = 200;
        o.forced = true;
        let pages = pack_pages(&[(10, 10)], &o).expect("pack");
        assert_eq!((pages[0].width, pages[0].height), (300, 200));
    }

    #[test]
    fn oversize_is_not_capacity() {
        let mut o = opts();
        o.max_width = 64;
        o.max_height = 64;
        let err = pack_pages(&[(10, 10), (65, 4)], &o).unwrap_err();
        assert!(matches!(err, BakeError::OversizeTexture { slot: 1, .. }));
    }
}
