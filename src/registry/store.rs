//! Backing stores for custom layouts.

use crate::error::{Error, Result};
use crate::layout::LayoutGeometry;

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A custom layout as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedLayout {
    pub name: String,
    pub geometry: LayoutGeometry,
}

/// Persisted document holding every custom layout, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    #[serde(default)]
    pub custom_layouts: Vec<NamedLayout>,
}

/// Durable storage for custom layouts.
pub trait LayoutStore: Send + Sync {
    fn load(&self) -> Result<LayoutDocument>;
    fn save(&self, doc: &LayoutDocument) -> Result<()>;
}

/// Stores layouts in a JSON file, rewritten atomically on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LayoutStore for JsonFileStore {
    fn load(&self) -> Result<LayoutDocument> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LayoutDocument::default()),
            Err(e) => return Err(Error::store_open(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(LayoutDocument::default());
        }
        serde_json::from_str(&content).map_err(|e| Error::store_deser(&self.path, e))
    }

    fn save(&self, doc: &LayoutDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::store_write(&self.path, e))?;
        }
        let content =
            serde_json::to_string_pretty(doc).map_err(|e| Error::store_write(&self.path, e))?;
        let tmp = self.temp_path();
        fs::write(&tmp, content).map_err(|e| Error::store_write(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::store_write(&self.path, e))
    }
}

/// Keeps layouts in memory only, for kiosks without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<LayoutDocument>,
}

impl MemoryStore {
    pub fn new(doc: LayoutDocument) -> Self {
        Self { doc: Mutex::new(doc) }
    }
}

impl LayoutStore for MemoryStore {
    fn load(&self) -> Result<LayoutDocument> {
        let doc = self.doc.lock().map_err(|e| Error::mutex_lock("memory store", e))?;
        Ok(doc.clone())
    }

    fn save(&self, doc: &LayoutDocument) -> Result<()> {
        let mut current = self.doc.lock().map_err(|e| Error::mutex_lock("memory store", e))?;
        *current = doc.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FreeFormLayout, SlotRect};

    fn scratch(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("collagist-store-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample() -> LayoutDocument {
        LayoutDocument {
            custom_layouts: vec![NamedLayout {
                name: "Custom_Custom1".into(),
                geometry: FreeFormLayout::new(
                    (1286, 652),
                    vec![SlotRect::new(36, 36, 586, 397), SlotRect::new(664, 36, 586, 397)],
                )
                .into(),
            }],
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let store = JsonFileStore::new(scratch("missing").join("layouts.json"));
        assert_eq!(store.load().unwrap(), LayoutDocument::default());
    }

    #[test]
    fn saved_document_reads_back() {
        let dir = scratch("saved");
        let store = JsonFileStore::new(dir.join("nested").join("layouts.json"));
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
        assert!(!store.temp_path().exists());

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("customLayouts"));
        assert!(raw.contains("canvasWidth"));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = scratch("malformed");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("layouts.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(Error::StoreDeser(..))));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn memory_store_keeps_last_save() {
        let store = MemoryStore::default();
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }
}
