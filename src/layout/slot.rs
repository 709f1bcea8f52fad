//! Slot rectangles and aspect-preserving crops.

use serde::{Deserialize, Serialize};

/// A rectangular region of the output canvas that receives one photo.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SlotRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && (x as u64) < self.right() && (y as u64) < self.bottom()
    }

    pub fn fits_in(&self, width: u32, height: u32) -> bool {
        self.right() <= width as u64 && self.bottom() <= height as u64
    }
}

/// Region of a source photo kept by [`center_crop`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Computes the centered region of a `src_w × src_h` photo whose aspect ratio
/// matches a `slot_w × slot_h` slot.
///
/// Photos relatively wider than the slot lose equal margins on the left and
/// right; the others lose equal margins on top and bottom. The kept size is
/// floored, so the ratio matches to within one pixel and odd margins put the
/// extra pixel on the far side.
///
/// All four sizes must be positive.
pub fn center_crop(src_w: u32, src_h: u32, slot_w: u32, slot_h: u32) -> CropRect {
    let (sw, sh) = (src_w as u64, src_h as u64);
    let (tw, th) = (slot_w as u64, slot_h as u64);
    if sw * th > tw * sh {
        let width = ((sh * tw / th) as u32).clamp(1, src_w);
        CropRect { x: (src_w - width) / 2, y: 0, width, height: src_h }
    } else {
        let height = ((sw * th / tw) as u32).clamp(1, src_h);
        CropRect { x: 0, y: (src_h - height) / 2, width: src_w, height }
    }
}
