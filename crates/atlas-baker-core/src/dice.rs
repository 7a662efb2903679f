use image::RgbaImage;

use crate::config::DiceFilter;
use crate::model::Rect;
use crate::request::DiceSettings;

/// One retained grid cell of a diced source, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceCell {
    /// Position among the retained cells.
    pub index: usize,
    pub rect: Rect,
}

/// Cell size in rescaled pixels; a zero unit spans the whole axis.
pub fn dice_units(settings: &DiceSettings, rescale: f32, w: u32, h: u32) -> (u32, u32) {
    let scaled = |unit: u32, full: u32| {
        if unit == 0 {
            full
        } else {
            ((unit as f32 * rescale) as u32).clamp(1, full.max(1))
        }
    };
    (scaled(settings.unit_x, w), scaled(settings.unit_y, h))
}

/// Sweeps the grid column by column and returns the cells the filter keeps.
/// The last row/column is clipped at the image edge.
pub fn dice(img: &RgbaImage, settings: &DiceSettings, rescale: f32) -> Vec<DiceCell> {
    let (w, h) = img.dimensions();
    let (ux, uy) = dice_units(settings, rescale, w, h);
    let mut cells = Vec::new();
    if w == 0 || h == 0 {
        return cells;
    }
    for sx in (0..w).step_by(ux as usize) {
        for sy in (0..h).step_by(uy as usize) {
            let rect = Rect::new(sx, sy, ux.min(w - sx), uy.min(h - sy));
            if keep_cell(img, &rect, settings.filter) {
                cells.push(DiceCell {
                    index: cells.len(),
                    rect,
                });
            }
        }
    }
    cells
}

fn keep_cell(img: &RgbaImage, rect: &Rect, filter: DiceFilter) -> bool {
    match filter {
        DiceFilter::Complete => true,
        DiceFilter::SolidOnly => is_solid(img, rect),
        DiceFilter::TransparentOnly => !is_solid(img, rect),
    }
}

fn is_solid(img: &RgbaImage, rect: &Rect) -> bool {
    (rect.y..rect.y + rect.h).all(|y| (rect.x..rect.x + rect.w).all(|x| img.get_pixel(x, y)[3] == 255))
}
