use crate::model::Rect;

pub mod maxrects;
pub mod paging;

/// A rectangle placed by a packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed<K> {
    pub key: K,
    /// Placed rectangle within the page (post-flip width/height).
    pub rect: Rect,
    /// True if width and height were swapped to fit.
    pub flipped: bool,
}

/// A packer places rectangles into a page.
///
/// Implementations must ensure no overlaps and keep every placement inside the page.
pub trait Packer<K> {
    /// Places as many of `items` (`(key, w, h)`) as fit; what stays in `items` did not.
    fn insert_batch(&mut self, items: &mut Vec<(K, u32, u32)>) -> Vec<Placed<K>>;
    /// Used area / page area.
    fn occupancy(&self) -> f32;
    /// Page area not covered by placed rectangles.
    fn wasted_area(&self) -> u64;
}
