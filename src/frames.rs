//! Frame template discovery and placeholder generation.

use crate::error::{Error, Result};
use crate::image::{Color, ImgBackend};
use crate::layout::LayoutGeometry;
use crate::registry::LayoutRegistry;

use std::fs;
use std::path::{Path, PathBuf};

/// Folder of frame templates, one sub-folder per layout identifier.
///
/// ```text
/// frames/
///   2x2/frame_2x2.png
///   2x2/hearts.png
///   generic.png
/// ```
#[derive(Debug, Clone)]
pub struct FrameLibrary {
    root: PathBuf,
}

impl FrameLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout_folder(&self, layout_id: &str) -> PathBuf {
        self.root.join(layout_id)
    }

    pub fn placeholder_path(&self, layout_id: &str) -> PathBuf {
        self.layout_folder(layout_id).join(format!("frame_{layout_id}.png"))
    }

    /// PNG templates made for `layout_id`, or the shared ones at the library
    /// root when the layout has none. Sorted by file name.
    pub fn templates_for(&self, layout_id: &str) -> Result<Vec<PathBuf>> {
        let specific = Self::list_png(&self.layout_folder(layout_id))?;
        if !specific.is_empty() {
            return Ok(specific);
        }
        Self::list_png(&self.root)
    }

    fn list_png(folder: &Path) -> Result<Vec<PathBuf>> {
        if !folder.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(folder).map_err(|e| Error::frames_folder(folder, e))?;
        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::frames_folder(folder, e))?.path();
            let is_png = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
            if is_png && path.is_file() {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }

    /// Writes a placeholder frame for every known layout that has none yet.
    ///
    /// Returns the paths written.
    pub fn generate_placeholders(
        &self,
        registry: &LayoutRegistry,
        ib: &ImgBackend,
        color: &Color,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (id, geometry) in registry.list_all() {
            let id = id.as_str();
            let path = self.placeholder_path(id);
            if path.exists() {
                continue;
            }
            let folder = self.layout_folder(id);
            fs::create_dir_all(&folder).map_err(|e| Error::frames_folder(&folder, e))?;
            let frame = placeholder_frame(ib, &geometry, color)?;
            ib.write(&frame, &path)?;
            log::info!("created placeholder frame {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

/// An opaque frame in `color` with a transparent window over every slot.
pub fn placeholder_frame(
    ib: &ImgBackend,
    geometry: &LayoutGeometry,
    color: &Color,
) -> Result<libvips::VipsImage> {
    let (w, h) = geometry.canvas_size();
    let opaque = Color { a: Some(255), ..*color };
    let mut frame = ib.new_rgba_canvas(&opaque, w, h)?;
    for slot in geometry.slots()? {
        frame = ib.fill(&frame, slot, &Color::TRANSPARENT)?;
    }
    Ok(frame)
}
