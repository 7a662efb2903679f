use std::collections::HashMap;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::request::{SourceRef, TextureId};

/// Identity of an unprocessed source; equal keys mean the same pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Texture(TextureId),
    Region {
        texture: TextureId,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    },
    Missing,
    Empty,
}

impl SourceKey {
    /// Key of a request's source, without touching any pixels.
    pub fn of(source: Option<SourceRef>) -> Self {
        match source {
            None => SourceKey::Missing,
            Some(SourceRef::Texture(t)) => SourceKey::Texture(t),
            Some(SourceRef::Region { texture, x, y, w, h }) => SourceKey::Region { texture, x, y, w, h },
        }
    }
}

/// Where a [`SourceImage`] came from. Region coordinates are in rescaled pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Whole {
        texture: TextureId,
        rescaled: bool,
    },
    Region {
        texture: TextureId,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        rescaled: bool,
    },
    /// Checkerboard stand-in for a missing texture.
    MissingTexture,
    /// 1x1 transparent stand-in for a zero-area region.
    Empty,
}

/// Pixels one sprite is cut from.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub key: SourceKey,
    pub provenance: Provenance,
    pub rgba: RgbaImage,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }
    pub fn height(&self) -> u32 {
        self.rgba.height()
    }
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self.provenance,
            Provenance::MissingTexture | Provenance::Empty
        )
    }
}

/// Resolves sprite sources against the input textures, keeping one rescaled
/// copy per texture.
pub struct SourceResolver<'a> {
    textures: &'a [RgbaImage],
    rescale: f32,
    divisor: Option<u32>,
    cache: HashMap<TextureId, RgbaImage>,
}

impl<'a> SourceResolver<'a> {
    pub fn new(textures: &'a [RgbaImage], rescale: f32) -> Self {
        Self {
            textures,
            rescale,
            divisor: nice_rescale_divisor(rescale),
            cache: HashMap::new(),
        }
    }

    fn is_rescaling(&self) -> bool {
        self.rescale < 1.0
    }

    /// Number of rescaled copies currently held.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// The (possibly rescaled) sheet for `id`.
    pub fn sheet(&mut self, id: TextureId) -> Option<&RgbaImage> {
        let textures = self.textures;
        let src = textures.get(id)?;
        if !self.is_rescaling() {
            return Some(src);
        }
        let r = self.rescale;
        Some(self.cache.entry(id).or_insert_with(|| {
            debug!(texture = id, factor = r, "rescaling source texture");
            rescale_image(src, r)
        }))
    }

    pub fn resolve(&mut self, source: Option<SourceRef>) -> SourceImage {
        let Some(source) = source else {
            return missing_source();
        };
        let rescaled = self.is_rescaling();
        match source {
            SourceRef::Texture(texture) => match self.sheet(texture) {
                Some(sheet) => SourceImage {
                    key: SourceKey::Texture(texture),
                    provenance: Provenance::Whole { texture, rescaled },
                    rgba: sheet.clone(),
                },
                None => {
                    warn!(texture, "sprite references a texture that was not supplied");
                    missing_source()
                }
            },
            SourceRef::Region {
                texture,
                x,
                y,
                w,
                h,
            } => {
                let key = SourceKey::Region {
                    texture,
                    x,
                    y,
                    w,
                    h,
                };
                if w <= 0 || h <= 0 {
                    warn!(texture, w, h, "zero-area source region");
                    return empty_source();
                }
                let (rescale, divisor) = (self.rescale, self.divisor);
                let Some(sheet) = self.sheet(texture) else {
                    warn!(texture, "sprite references a texture that was not supplied");
                    return missing_source();
                };
                let Some((rx, ry, rw, rh)) =
                    region_after_rescale(x, y, w, h, rescale, divisor, sheet.width(), sheet.height())
                else {
                    warn!(texture, x, y, w, h, "source region lies outside its texture");
                    return empty_source();
                };
                SourceImage {
                    key,
                    provenance: Provenance::Region {
                        texture,
                        x: rx,
                        y: ry,
                        w: rw,
                        h: rh,
                        rescaled,
                    },
                    rgba: imageops::crop_imm(sheet, rx, ry, rw, rh).to_image(),
                }
            }
        }
    }
}

fn missing_source() -> SourceImage {
    SourceImage {
        key: SourceKey::Missing,
        provenance: Provenance::MissingTexture,
        rgba: missing_texture_placeholder(),
    }
}

fn empty_source() -> SourceImage {
    SourceImage {
        key: SourceKey::Empty,
        provenance: Provenance::Empty,
        rgba: RgbaImage::new(1, 1),
    }
}

/// Block size for exact box-filter downsampling, if `r` is one of the "nice" ratios.
pub fn nice_rescale_divisor(r: f32) -> Option<u32> {
    const EPS: f32 = 1e-4;
    if (r - 0.5).abs() < EPS {
        Some(2)
    } else if (r - 0.25).abs() < EPS {
        Some(4)
    } else {
        None
    }
}

/// Downscale by `r`: box-average k x k blocks for 1/2 and 1/4, bilinear otherwise.
pub fn rescale_image(img: &RgbaImage, r: f32) -> RgbaImage {
    match nice_rescale_divisor(r) {
        Some(k) => box_downsample(img, k),
        None => {
            let w = ((img.width() as f32 * r) as u32).max(1);
            let h = ((img.height() as f32 * r) as u32).max(1);
            imageops::resize(img, w, h, FilterType::Triangle)
        }
    }
}

/// Average every `k`x`k` block; partial blocks at the right/bottom edge average
/// the pixels they actually cover.
pub fn box_downsample(img: &RgbaImage, k: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let (dw, dh) = (w.div_ceil(k), h.div_ceil(k));
    let mut out = RgbaImage::new(dw, dh);
    for dy in 0..dh {
        for dx in 0..dw {
            let mut sum = [0u32; 4];
            let mut n = 0u32;
            for y in (dy * k)..((dy + 1) * k).min(h) {
                for x in (dx * k)..((dx + 1) * k).min(w) {
                    let p = img.get_pixel(x, y);
                    for c in 0..4 {
                        sum[c] += p[c] as u32;
                    }
                    n += 1;
                }
            }
            let avg = sum.map(|s| ((s + n / 2) / n) as u8);
            out.put_pixel(dx, dy, Rgba(avg));
        }
    }
    out
}

/// Maps a region given in original pixels onto the rescaled sheet, clamped to it.
/// Returns `None` when nothing of the region remains.
#[allow(clippy::too_many_arguments)]
pub fn region_after_rescale(
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    rescale: f32,
    divisor: Option<u32>,
    sheet_w: u32,
    sheet_h: u32,
) -> Option<(u32, u32, u32, u32)> {
    // clip against the sheet's top-left first so the far edge stays put
    let (x_end, y_end) = (x as i64 + w as i64, y as i64 + h as i64);
    let (x, y) = (x.max(0) as u32, y.max(0) as u32);
    let w = (x_end - x as i64).clamp(0, u32::MAX as i64) as u32;
    let h = (y_end - y as i64).clamp(0, u32::MAX as i64) as u32;
    let (x0, y0, x1, y1) = match divisor {
        Some(k) => {
            let (x0, y0) = (x / k, y / k);
            (x0, y0, x0 + w.div_ceil(k), y0 + h.div_ceil(k))
        }
        None if rescale < 1.0 => (
            (x as f32 * rescale).floor() as u32,
            (y as f32 * rescale).floor() as u32,
            ((x + w) as f32 * rescale).ceil() as u32,
            ((y + h) as f32 * rescale).ceil() as u32,
        ),
        None => (x, y, x + w, y + h),
    };
    let (x1, y1) = (x1.min(sheet_w), y1.min(sheet_h));
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}

/// 2x2 checkerboard: magenta, yellow / cyan, grey.
pub fn missing_texture_placeholder() -> RgbaImage {
    const CELLS: [[u8; 4]; 4] = [
        [255, 0, 255, 255],
        [255, 255, 0, 255],
        [0, 255, 255, 255],
        [128, 128, 128, 255],
    ];
    RgbaImage::from_fn(2, 2, |x, y| Rgba(CELLS[(x + 2 * y) as usize]))
}
