//! Sprite processing: trim, pad, premultiply, dither.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::config::PadMode;
use crate::dedup::content_hash;
use crate::dither::{DitherTarget, dither};
use crate::model::Rect;

/// What a processed tile stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileOrigin {
    Sprite { sprite: usize },
    Split { sprite: usize, index: usize },
    Glyph { font: usize, char_id: u32 },
    MissingGlyph { font: usize },
}

/// Per-tile processing policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessParams {
    pub trim: bool,
    pub trim_threshold: u8,
    pub pad_mode: PadMode,
    pub pad: u32,
    pub premultiply: bool,
    pub additive: bool,
    pub dither: Option<DitherTarget>,
    /// Trim box forced by custom geometry, relative to the processed rect.
    pub geometry_box: Option<Rect>,
}

/// A trimmed and padded tile ready for packing.
#[derive(Debug, Clone)]
pub struct ProcessedTile {
    /// Padded pixels, `(trim.w + 2 * pad) x (trim.h + 2 * pad)`.
    pub rgba: RgbaImage,
    /// Trimmed area relative to the unprocessed rect (`rx, ry, rw, rh`).
    pub trim: Rect,
    pub pad: u32,
    /// Size of the unprocessed rect.
    pub source_size: (u32, u32),
    pub origin: TileOrigin,
    pub hash: String,
    /// Never folded by content hash.
    pub dedup_exempt: bool,
}

impl ProcessedTile {
    fn new(rgba: RgbaImage, trim: Rect, pad: u32, source_size: (u32, u32), origin: TileOrigin) -> Self {
        let hash = content_hash(&rgba);
        Self {
            rgba,
            trim,
            pad,
            source_size,
            origin,
            hash,
            dedup_exempt: false,
        }
    }

    /// Stand-in for a rect with nothing visible: a padded 1x1 transparent tile
    /// centred in the original rect.
    pub fn transparent(source_size: (u32, u32), pad: u32, origin: TileOrigin) -> Self {
        let (w, h) = source_size;
        let trim = Rect::new(w / 2, h / 2, 1, 1);
        Self::new(RgbaImage::new(1 + 2 * pad, 1 + 2 * pad), trim, pad, source_size, origin)
    }

    pub fn padded_size(&self) -> (u32, u32) {
        self.rgba.dimensions()
    }
}

/// Processes `rect` of `src`. Returns `None` when the rect has nothing visible
/// (and no geometry box forces a crop).
pub fn process(src: &RgbaImage, rect: Rect, params: &ProcessParams, origin: TileOrigin) -> Option<ProcessedTile> {
    let trim = match params.geometry_box {
        Some(g) => clamp_to(g, rect.w, rect.h)?,
        None => {
            let opaque = opaque_bounds(src, rect, params.trim_threshold)?;
            if params.trim {
                opaque
            } else {
                Rect::new(0, 0, rect.w, rect.h)
            }
        }
    };
    let pad = params.pad;
    let mut out = RgbaImage::new(trim.w + 2 * pad, trim.h + 2 * pad);
    for y in 0..trim.h {
        for x in 0..trim.w {
            let mut p = *src.get_pixel(rect.x + trim.x + x, rect.y + trim.y + y);
            if params.premultiply {
                premultiply(&mut p, params.additive);
            }
            out.put_pixel(pad + x, pad + y, p);
        }
    }
    apply_padding(&mut out, pad, params.pad_mode);
    if let Some(target) = params.dither {
        dither(&mut out, target);
    }
    Some(ProcessedTile::new(out, trim, pad, (rect.w, rect.h), origin))
}

fn clamp_to(r: Rect, w: u32, h: u32) -> Option<Rect> {
    let x0 = r.x.min(w);
    let y0 = r.y.min(h);
    let x1 = (r.x + r.w).min(w);
    let y1 = (r.y + r.h).min(h);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
}

/// `c = (c * a + 127) / 255` for RGB; additive tiles drop their alpha.
pub fn premultiply(p: &mut Rgba<u8>, additive: bool) {
    let a = p[3] as u32;
    for c in 0..3 {
        p[c] = ((p[c] as u32 * a + 127) / 255) as u8;
    }
    if additive {
        p[3] = 0;
    }
}

/// Bounding box (relative to `rect`) of pixels with alpha above `threshold`.
pub fn opaque_bounds(img: &RgbaImage, rect: Rect, threshold: u8) -> Option<Rect> {
    let visible = |x: u32, y: u32| img.get_pixel(rect.x + x, rect.y + y)[3] > threshold;
    let col_has = |x: u32| (0..rect.h).any(|y| visible(x, y));
    let x1 = (0..rect.w).find(|&x| col_has(x))?;
    let x2 = (x1..rect.w).rev().find(|&x| col_has(x))?;
    let row_has = |y: u32| (x1..=x2).any(|x| visible(x, y));
    let y1 = (0..rect.h).find(|&y| row_has(y))?;
    let y2 = (y1..rect.h).rev().find(|&y| row_has(y))?;
    Some(Rect::new(x1, y1, x2 - x1 + 1, y2 - y1 + 1))
}

/// Fills the `pad`-wide border around the interior of `img`. Rows first
/// (interior columns only), then full-height columns so corners follow.
pub fn apply_padding(img: &mut RgbaImage, pad: u32, mode: PadMode) {
    if pad == 0 || matches!(mode, PadMode::Default | PadMode::None) {
        return;
    }
    let (w, h) = img.dimensions();
    let (iw, ih) = (w - 2 * pad, h - 2 * pad);
    if iw == 0 || ih == 0 {
        return;
    }
    let wrap = mode == PadMode::TileXY;

    for j in 0..pad {
        // top row `pad - 1 - j`, bottom row `pad + ih + j`
        let (top_src, bottom_src) = if wrap {
            (pad + (ih - 1 - j % ih), pad + j % ih)
        } else {
            (pad, pad + ih - 1)
        };
        for x in pad..pad + iw {
            let t = *img.get_pixel(x, top_src);
            let b = *img.get_pixel(x, bottom_src);
            img.put_pixel(x, pad - 1 - j, t);
            img.put_pixel(x, pad + ih + j, b);
        }
    }
    for j in 0..pad {
        let (left_src, right_src) = if wrap {
            (pad + (iw - 1 - j % iw), pad + j % iw)
        } else {
            (pad, pad + iw - 1)
        };
        for y in 0..h {
            let l = *img.get_pixel(left_src, y);
            let r = *img.get_pixel(right_src, y);
            img.put_pixel(pad - 1 - j, y, l);
            img.put_pixel(pad + iw + j, y, r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pad_mode: PadMode, pad: u32) -> ProcessParams {
        ProcessParams {
            trim: true,
            trim_threshold: 0,
            pad_mode,
            pad,
            premultiply: false,
            additive: false,
            dither: None,
            geometry_box: None,
        }
    }

    const ORIGIN: TileOrigin = TileOrigin::Sprite { sprite: 0 };

    #[test]
    fn trims_to_visible_box() {
        let mut img = RgbaImage::new(16, 16);
        img.put_pixel(3, 5, Rgba([1, 2, 3, 4]));
        img.put_pixel(9, 7, Rgba([1, 2, 3, 4]));
        let tile = process(&img, Rect::new(0, 0, 16, 16), &params(PadMode::Default, 0), ORIGIN)
            .expect("visible pixels");
        assert_eq!(tile.trim, Rect::new(3, 5, 7, 3));
        assert_eq!(tile.rgba.dimensions(), (7, 3));
    }

    #[test]
    fn fully_transparent_yields_nothing() {
        let img = RgbaImage::new(8, 8);
        assert!(process(&img, Rect::new(0, 0, 8, 8), &params(PadMode::Extend, 2), ORIGIN).is_none());
        let t = ProcessedTile::transparent((8, 6), 2, ORIGIN);
        assert_eq!(t.trim, Rect::new(4, 3, 1, 1));
        assert_eq!(t.rgba.dimensions(), (5, 5));
    }

    #[test]
    fn geometry_box_overrides_alpha_trim() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([9, 9, 9, 255]));
        let mut p = params(PadMode::Default, 1);
        p.geometry_box = Some(Rect::new(2, 2, 20, 3));
        let tile = process(&img, Rect::new(0, 0, 10, 10), &p, ORIGIN).expect("tile");
        assert_eq!(tile.trim, Rect::new(2, 2, 8, 3));
        assert_eq!(tile.rgba.dimensions(), (10, 5));
        // default padding stays transparent
        assert_eq!(tile.rgba.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn tile_padding_wraps_opposite_edge() {
        let mut img = RgbaImage::new(4, 4);
        for y in 1..3 {
            for x in 1..3 {
                img.put_pixel(x, y, Rgba([(x * 10) as u8, (y * 10) as u8, 0, 255]));
            }
        }
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        let mut p = params(PadMode::TileXY, 1);
        p.trim = false;
        let tile = process(&img, Rect::new(0, 0, 4, 4), &p, ORIGIN).expect("tile");
        let out = &tile.rgba;
        assert_eq!(out.dimensions(), (6, 6));
        // left pad column mirrors interior column 3 (rightmost), top pad row interior row 3
        for y in 1..5 {
            assert_eq!(out.get_pixel(0, y), out.get_pixel(4, y));
            assert_eq!(out.get_pixel(5, y), out.get_pixel(1, y));
        }
        for x in 0..6 {
            assert_eq!(out.get_pixel(x, 0), out.get_pixel(x, 4));
            assert_eq!(out.get_pixel(x, 5), out.get_pixel(x, 1));
        }
    }

    #[test]
    fn premultiply_rounds_and_additive_clears_alpha() {
        let mut p = Rgba([255, 128, 1, 128]);
        premultiply(&mut p, false);
        assert_eq!(p.0, [128, 64, 1, 128]);
        let mut q = Rgba([200, 200, 200, 255]);
        premultiply(&mut q, true);
        assert_eq!(q.0, [200, 200, 200, 0]);
    }
}
