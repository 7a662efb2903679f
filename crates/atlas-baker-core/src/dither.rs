use image::RgbaImage;

use crate::config::TextureCompression;

/// 16-bit target layouts for error-diffusion dithering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DitherTarget {
    /// 4 bits per channel, alpha included.
    Rgba4444,
    /// 5/6/5 bits for RGB; alpha is discarded (written opaque).
    Rgb565,
}

impl DitherTarget {
    /// Target for the dithered compression modes; `None` leaves pixels alone.
    pub fn for_compression(c: TextureCompression) -> Option<Self> {
        match c {
            TextureCompression::Dithered16BitAlpha => Some(DitherTarget::Rgba4444),
            TextureCompression::Dithered16BitNoAlpha => Some(DitherTarget::Rgb565),
            _ => None,
        }
    }

    fn bits(self) -> [Option<u32>; 4] {
        match self {
            DitherTarget::Rgba4444 => [Some(4), Some(4), Some(4), Some(4)],
            DitherTarget::Rgb565 => [Some(5), Some(6), Some(5), None],
        }
    }
}

/// Snap an 8-bit value to the nearest level representable with `bits` bits,
/// expressed back in 8-bit range (so 0 and 255 are fixed points).
fn quantize(v: f32, bits: u32) -> f32 {
    let levels = ((1u32 << bits) - 1) as f32;
    (v * levels / 255.0).round() * 255.0 / levels
}

/// Floyd–Steinberg dithering in place. Error is spread 7/16 right,
/// 3/16 down-left, 5/16 down, 1/16 down-right.
pub fn dither(img: &mut RgbaImage, target: DitherTarget) {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 {
        return;
    }
    let bits = target.bits();
    let mut buf: Vec<f32> = img.as_raw().iter().map(|&b| b as f32).collect();
    let idx = |x: usize, y: usize, c: usize| (y * w + x) * 4 + c;

    for y in 0..h {
        for x in 0..w {
            for (c, b) in bits.iter().enumerate() {
                let Some(b) = *b else { continue };
                let i = idx(x, y, c);
                let old = buf[i].clamp(0.0, 255.0);
                let new = quantize(old, b);
                buf[i] = new;
                let err = old - new;
                if err == 0.0 {
                    continue;
                }
                if x + 1 < w {
                    buf[idx(x + 1, y, c)] += err * 7.0 / 16.0;
                }
                if y + 1 < h {
                    if x > 0 {
                        buf[idx(x - 1, y + 1, c)] += err * 3.0 / 16.0;
                    }
                    buf[idx(x, y + 1, c)] += err * 5.0 / 16.0;
                    if x + 1 < w {
                        buf[idx(x + 1, y + 1, c)] += err * 1.0 / 16.0;
                    }
                }
            }
        }
    }

    for (dst, v) in img.iter_mut().zip(buf) {
        *dst = v.clamp(0.0, 255.0).round() as u8;
    }
    if bits[3].is_none() {
        for p in img.pixels_mut() {
            p[3] = 255;
        }
    }
}
