use image::RgbaImage;

use crate::model::PageLayout;

/// Blit `tile` into `canvas` with its top-left at (dx, dy).
///
/// - flipped: store transposed, `canvas(dx + ty, dy + tx) = tile(tx, ty)`;
///   the footprint is then `tile.h x tile.w`
///
/// Pixels falling outside the canvas are dropped.
pub fn blit_tile(tile: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32, flipped: bool) {
    let (cw, ch) = canvas.dimensions();
    for (tx, ty, px) in tile.enumerate_pixels() {
        let (x, y) = if flipped { (dx + ty, dy + tx) } else { (dx + tx, dy + ty) };
        if x < cw && y < ch {
            canvas.put_pixel(x, y, *px);
        }
    }
}

/// Composites every entry of `layout` onto a fresh transparent page.
/// `tile_of_slot` yields the processed pixels for an atlas slot.
pub fn composite_page<'a, F>(layout: &PageLayout, mut tile_of_slot: F) -> RgbaImage
where
    F: FnMut(usize) -> Option<&'a RgbaImage>,
{
    let mut canvas = RgbaImage::new(layout.width, layout.height);
    for e in &layout.entries {
        if let Some(tile) = tile_of_slot(e.slot) {
            blit_tile(tile, &mut canvas, e.x, e.y, e.flipped);
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AtlasEntry;
    use image::Rgba;

    /// Reads an entry back out of a page, undoing the flip.
    fn extract_tile(canvas: &RgbaImage, entry: &AtlasEntry) -> RgbaImage {
        let (tw, th) = if entry.flipped { (entry.h, entry.w) } else { (entry.w, entry.h) };
        RgbaImage::from_fn(tw, th, |tx, ty| {
            let (x, y) = if entry.flipped { (entry.x + ty, entry.y + tx) } else { (entry.x + tx, entry.y + ty) };
            *canvas.get_pixel(x, y)
        })
    }

    #[test]
    fn flipped_blit_round_trips() {
        let tile = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8, y as u8, 7, 255]));
        let mut canvas = RgbaImage::new(8, 8);
        blit_tile(&tile, &mut canvas, 4, 1, true);
        assert_eq!(canvas.get_pixel(4 + 1, 1 + 2).0, [2, 1, 7, 255]);
        let entry = AtlasEntry {
            slot: 0,
            page: 0,
            x: 4,
            y: 1,
            w: 2,
            h: 3,
            flipped: true,
        };
        assert_eq!(extract_tile(&canvas, &entry), tile);
    }
}
