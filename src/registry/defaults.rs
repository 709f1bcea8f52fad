//! Layouts shipped with the kiosk.

use crate::layout::{Arrangement, GridLayout, LayoutGeometry, Padding};

/// Identifier used when a lenient lookup misses.
pub const DEFAULT_FALLBACK: &str = "1x2";

pub const BUILTIN_IDS: [&str; 4] = ["1x2", "2x1", "2x2", "4x1"];

/// The [`DEFAULT_FALLBACK`] layout.
pub fn default_fallback() -> LayoutGeometry {
    GridLayout::new((943, 974), Padding::new(50, 50, 63, 249), 37, Arrangement::new(1, 2)).into()
}

pub fn builtin(id: &str) -> Option<LayoutGeometry> {
    let (canvas, padding, gap) = match id {
        DEFAULT_FALLBACK => return Some(default_fallback()),
        "2x1" => ((1286, 652), Padding::new(53, 219, 48, 48), 42),
        "2x2" => ((933, 782), Padding::new(30, 156, 30, 30), 35),
        "4x1" => ((551, 1517), Padding::new(48, 186, 53, 53), 32),
        _ => return None,
    };
    let arrangement: Arrangement = id.parse().ok()?;
    Some(GridLayout::new(canvas, padding, gap, arrangement).into())
}

pub fn is_builtin(id: &str) -> bool {
    BUILTIN_IDS.contains(&id)
}

pub fn builtins() -> impl Iterator<Item = (String, LayoutGeometry)> {
    BUILTIN_IDS
        .iter()
        .filter_map(|id| builtin(id).map(|g| (id.to_string(), g)))
}
