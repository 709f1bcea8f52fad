//! Grid layouts, whose slots follow from padding, gap and a row/column count.

use crate::error::{Error, Result};
use crate::layout::slot::SlotRect;

use itertools::iproduct;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of rows and columns of a grid layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Arrangement {
    pub rows: u32,
    pub columns: u32,
}

impl Arrangement {
    pub const fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    pub fn slot_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }
}

impl FromStr for Arrangement {
    type Err = &'static str;

    /// Parses identifiers such as `2x2` or `4x1` as `ROWSxCOLUMNS`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let re = Regex::new(r"^(\d+)\s*[xX]\s*(\d+)$").unwrap();
        let captures = re
            .captures(s.trim())
            .ok_or("string not in form RxC where R and C are integer numbers")?;
        let rows = captures[1].parse::<u32>().map_err(|_| "row count out of range")?;
        let columns = captures[2].parse::<u32>().map_err(|_| "column count out of range")?;
        if rows == 0 || columns == 0 {
            return Err("row and column counts must be positive");
        }
        Ok(Self { rows, columns })
    }
}

impl fmt::Display for Arrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.columns)
    }
}

/// Pixels reserved around the photo area.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Padding {
    pub pad_top: u32,
    pub pad_bottom: u32,
    pub pad_left: u32,
    pub pad_right: u32,
}

impl Padding {
    pub const fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self { pad_top: top, pad_bottom: bottom, pad_left: left, pad_right: right }
    }

    pub fn horizontal(&self) -> u64 {
        self.pad_left as u64 + self.pad_right as u64
    }

    pub fn vertical(&self) -> u64 {
        self.pad_top as u64 + self.pad_bottom as u64
    }
}

/// A layout whose slots are an evenly divided grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    #[serde(flatten)]
    pub padding: Padding,
    pub gap: u32,
    pub rows: u32,
    pub columns: u32,
}

impl GridLayout {
    pub fn new(
        (canvas_width, canvas_height): (u32, u32),
        padding: Padding,
        gap: u32,
        arrangement: Arrangement,
    ) -> Self {
        Self {
            canvas_width,
            canvas_height,
            padding,
            gap,
            rows: arrangement.rows,
            columns: arrangement.columns,
        }
    }

    pub fn arrangement(&self) -> Arrangement {
        Arrangement::new(self.rows, self.columns)
    }

    /// Size shared by every slot.
    ///
    /// The area left after padding and gaps is floor-divided, so up to
    /// `columns - 1` (resp. `rows - 1`) pixels stay unassigned next to the
    /// right (resp. bottom) padding.
    pub fn slot_size(&self) -> Result<(u32, u32)> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(Error::geometry(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if self.rows == 0 || self.columns == 0 {
            return Err(Error::geometry(format!(
                "grid needs at least one row and column, got {}x{}",
                self.rows, self.columns
            )));
        }
        let gap = self.gap as i64;
        let avail_w = self.canvas_width as i64
            - self.padding.horizontal() as i64
            - (self.columns as i64 - 1) * gap;
        let avail_h = self.canvas_height as i64
            - self.padding.vertical() as i64
            - (self.rows as i64 - 1) * gap;
        let slot_w = avail_w.div_euclid(self.columns as i64);
        let slot_h = avail_h.div_euclid(self.rows as i64);
        if slot_w <= 0 || slot_h <= 0 {
            return Err(Error::geometry(format!(
                "padding and gaps leave no room for {} slots on a {}x{} canvas",
                self.arrangement(),
                self.canvas_width,
                self.canvas_height
            )));
        }
        Ok((slot_w as u32, slot_h as u32))
    }

    /// Slot rectangles in row-major order.
    pub fn slots(&self) -> Result<Vec<SlotRect>> {
        let (w, h) = self.slot_size()?;
        let Padding { pad_top, pad_left, .. } = self.padding;
        let slots = iproduct!(0..self.rows, 0..self.columns)
            .map(|(row, col)| {
                SlotRect::new(
                    pad_left + col * (w + self.gap),
                    pad_top + row * (h + self.gap),
                    w,
                    h,
                )
            })
            .collect();
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn two_by_two() -> GridLayout {
        GridLayout::new((933, 782), Padding::new(30, 156, 30, 30), 35, Arrangement::new(2, 2))
    }

    #[test]
    fn arrangement_parses_rows_first() {
        assert_eq!("4x1".parse(), Ok(Arrangement::new(4, 1)));
        assert_eq!("1 X 2".parse(), Ok(Arrangement::new(1, 2)));
        assert!("0x2".parse::<Arrangement>().is_err());
        assert!("Custom_Layout".parse::<Arrangement>().is_err());
        assert_eq!(Arrangement::new(2, 1).to_string(), "2x1");
    }

    #[test]
    fn two_by_two_slots() {
        let slots = two_by_two().slots().unwrap();
        assert_eq!(
            slots,
            vec![
                SlotRect::new(30, 30, 419, 280),
                SlotRect::new(484, 30, 419, 280),
                SlotRect::new(30, 345, 419, 280),
                SlotRect::new(484, 345, 419, 280),
            ]
        );
    }

    #[test]
    fn crowded_grid_is_rejected() {
        let grid = GridLayout::new((100, 100), Padding::new(40, 40, 0, 0), 30, Arrangement::new(2, 1));
        assert!(matches!(grid.slots(), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn grid_serializes_flat() {
        let json = serde_json::to_value(two_by_two()).unwrap();
        assert_eq!(json["padBottom"], 156);
        assert_eq!(json["canvasWidth"], 933);
        assert_eq!(json["rows"], 2);
    }

    #[quickcheck]
    fn partition_accounts_for_every_pixel(
        w: u16,
        h: u16,
        pads: (u8, u8, u8, u8),
        gap: u8,
        rows: u8,
        cols: u8,
    ) -> TestResult {
        let (rows, cols) = (rows as u32 % 6 + 1, cols as u32 % 6 + 1);
        let padding = Padding::new(pads.0 as u32, pads.1 as u32, pads.2 as u32, pads.3 as u32);
        let grid = GridLayout::new(
            (w as u32 % 3000 + 1, h as u32 % 3000 + 1),
            padding,
            gap as u32,
            Arrangement::new(rows, cols),
        );
        let Ok(slots) = grid.slots() else {
            return TestResult::discard();
        };
        let (sw, sh) = (slots[0].width as u64, slots[0].height as u64);
        let used_w = sw * cols as u64 + (cols as u64 - 1) * gap as u64 + padding.horizontal();
        let used_h = sh * rows as u64 + (rows as u64 - 1) * gap as u64 + padding.vertical();
        let stray_w = grid.canvas_width as u64 - used_w;
        let stray_h = grid.canvas_height as u64 - used_h;
        let in_bounds = slots.iter().all(|s| s.fits_in(grid.canvas_width, grid.canvas_height));
        TestResult::from_bool(
            slots.len() == (rows * cols) as usize
                && used_w <= grid.canvas_width as u64
                && used_h <= grid.canvas_height as u64
                && stray_w < cols as u64
                && stray_h < rows as u64
                && in_bounds,
        )
    }

    #[quickcheck]
    fn grid_slots_never_overlap(w: u16, h: u16, gap: u8, rows: u8, cols: u8) -> TestResult {
        let grid = GridLayout::new(
            (w as u32 % 2000 + 1, h as u32 % 2000 + 1),
            Padding::default(),
            gap as u32,
            Arrangement::new(rows as u32 % 4 + 1, cols as u32 % 4 + 1),
        );
        let Ok(slots) = grid.slots() else {
            return TestResult::discard();
        };
        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                let disjoint = a.right() <= b.x as u64
                    || b.right() <= a.x as u64
                    || a.bottom() <= b.y as u64
                    || b.bottom() <= a.y as u64;
                if !disjoint {
                    return TestResult::failed();
                }
            }
        }
        TestResult::passed()
    }
}
