//! Declarative collage layouts.
//!
//! A layout is either a [`GridLayout`], whose slots are derived from padding,
//! gap and a row/column arrangement, or a [`FreeFormLayout`], which lists its
//! slot rectangles explicitly. Both resolve to an ordered list of
//! [`SlotRect`]s; the i-th photo of a collage goes into the i-th slot.

mod grid;
mod slot;

pub use crate::layout::grid::{Arrangement, GridLayout, Padding};
pub use crate::layout::slot::{center_crop, CropRect, SlotRect};

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};

/// A layout given as an explicit list of slots.
///
/// Slots may overlap; later slots are drawn over earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeFormLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub slots: Vec<SlotRect>,
}

impl FreeFormLayout {
    pub fn new((canvas_width, canvas_height): (u32, u32), slots: Vec<SlotRect>) -> Self {
        Self { canvas_width, canvas_height, slots }
    }

    fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(Error::geometry(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if self.slots.is_empty() {
            return Err(Error::geometry("free-form layout has no slots"));
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.width == 0 || slot.height == 0 {
                return Err(Error::geometry(format!("slot #{i} has zero area")));
            }
            if !slot.fits_in(self.canvas_width, self.canvas_height) {
                return Err(Error::geometry(format!(
                    "slot #{i} ({}, {}, {}x{}) extends outside the {}x{} canvas",
                    slot.x,
                    slot.y,
                    slot.width,
                    slot.height,
                    self.canvas_width,
                    self.canvas_height
                )));
            }
        }
        Ok(())
    }
}

/// Geometry of a collage: canvas size plus the slots photos are placed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutGeometry {
    FreeForm(FreeFormLayout),
    Grid(GridLayout),
}

impl LayoutGeometry {
    pub fn canvas_size(&self) -> (u32, u32) {
        match self {
            Self::FreeForm(f) => (f.canvas_width, f.canvas_height),
            Self::Grid(g) => (g.canvas_width, g.canvas_height),
        }
    }

    /// Number of photos the layout takes.
    pub fn slot_count(&self) -> usize {
        match self {
            Self::FreeForm(f) => f.slots.len(),
            Self::Grid(g) => g.arrangement().slot_count(),
        }
    }

    pub fn is_free_form(&self) -> bool {
        matches!(self, Self::FreeForm(_))
    }

    /// Checks the geometry without resolving its slots.
    pub fn validate(&self) -> Result<()> {
        self.slots().map(|_| ())
    }

    /// Resolves the slot rectangles, in photo order.
    pub fn slots(&self) -> Result<Vec<SlotRect>> {
        match self {
            Self::FreeForm(f) => {
                f.validate()?;
                Ok(f.slots.clone())
            }
            Self::Grid(g) => g.slots(),
        }
    }
}

impl From<GridLayout> for LayoutGeometry {
    fn from(value: GridLayout) -> Self {
        Self::Grid(value)
    }
}

impl From<FreeFormLayout> for LayoutGeometry {
    fn from(value: FreeFormLayout) -> Self {
        Self::FreeForm(value)
    }
}
