//! Lookup table from layout identifiers to geometries.
//!
//! The registry merges the built-in grid layouts with custom layouts kept in a
//! [`LayoutStore`]. Custom entries win over built-in ones of the same name.
//! The table is an immutable snapshot behind an `Arc`: [`LayoutRegistry::append`]
//! and [`LayoutRegistry::reload`] build a new table and swap it in, so readers
//! always see either the old or the new table in full, and geometries already
//! handed out are never touched.

mod defaults;
mod store;

pub use crate::registry::defaults::{
    builtin, default_fallback, is_builtin, BUILTIN_IDS, DEFAULT_FALLBACK,
};
pub use crate::registry::store::{
    JsonFileStore, LayoutDocument, LayoutStore, MemoryStore, NamedLayout,
};

use crate::error::{Error, Result};
use crate::layout::LayoutGeometry;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

/// How [`LayoutRegistry::resolve`] treats unknown identifiers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Resolution {
    /// Unknown identifiers resolve to the fallback layout.
    #[default]
    Lenient,
    /// Unknown identifiers are an [`Error::UnknownLayout`].
    Strict,
}

#[derive(Debug, Default)]
struct LayoutTable {
    builtin: BTreeMap<String, LayoutGeometry>,
    custom: BTreeMap<String, LayoutGeometry>,
}

impl LayoutTable {
    fn build(doc: &LayoutDocument) -> Self {
        let mut custom = BTreeMap::new();
        for NamedLayout { name, geometry } in doc.custom_layouts.iter() {
            if let Err(e) = geometry.validate() {
                log::warn!("skipping custom layout `{name}`: {e}");
                continue;
            }
            if custom.insert(name.clone(), geometry.clone()).is_some() {
                log::warn!("custom layout `{name}` is defined more than once, keeping the last");
            }
        }
        Self { builtin: defaults::builtins().collect(), custom }
    }

    fn get(&self, id: &str) -> Option<&LayoutGeometry> {
        self.custom.get(id).or_else(|| self.builtin.get(id))
    }
}

pub struct LayoutRegistry {
    table: RwLock<Arc<LayoutTable>>,
    store: Box<dyn LayoutStore>,
    writer: Mutex<()>,
    fallback: String,
    resolution: Resolution,
}

impl LayoutRegistry {
    /// Creates a registry and loads every custom layout from `store`.
    pub fn open(store: impl LayoutStore + 'static) -> Result<Self> {
        let doc = store.load()?;
        Ok(Self {
            table: RwLock::new(Arc::new(LayoutTable::build(&doc))),
            store: Box::new(store),
            writer: Mutex::new(()),
            fallback: DEFAULT_FALLBACK.to_string(),
            resolution: Resolution::default(),
        })
    }

    /// Registry with built-in layouts only, whose appends live in memory.
    pub fn in_memory() -> Self {
        Self {
            table: RwLock::new(Arc::new(LayoutTable::build(&LayoutDocument::default()))),
            store: Box::new(MemoryStore::default()),
            writer: Mutex::new(()),
            fallback: DEFAULT_FALLBACK.to_string(),
            resolution: Resolution::default(),
        }
    }

    pub fn with_fallback(mut self, id: impl Into<String>) -> Self {
        self.fallback = id.into();
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn snapshot(&self) -> Arc<LayoutTable> {
        // the table is only ever replaced whole, so a poisoned lock still holds a valid one
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&table)
    }

    fn swap(&self, table: LayoutTable) {
        let mut current = self.table.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(table);
    }

    /// Resolves `id` according to the configured [`Resolution`].
    pub fn resolve(&self, id: &str) -> Result<LayoutGeometry> {
        match self.resolution {
            Resolution::Lenient => Ok(self.resolve_lenient(id)),
            Resolution::Strict => self.resolve_strict(id),
        }
    }

    pub fn resolve_strict(&self, id: &str) -> Result<LayoutGeometry> {
        self.snapshot()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownLayout(id.to_string()))
    }

    /// Resolves `id`, falling back to the fallback layout when it is unknown.
    pub fn resolve_lenient(&self, id: &str) -> LayoutGeometry {
        let table = self.snapshot();
        if let Some(geometry) = table.get(id) {
            return geometry.clone();
        }
        log::warn!("unknown layout `{id}`, using `{}`", self.fallback);
        match table.get(&self.fallback) {
            Some(geometry) => geometry.clone(),
            None => {
                log::warn!("fallback layout `{}` is unknown too", self.fallback);
                defaults::default_fallback()
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot().get(id).is_some()
    }

    /// Every known layout; custom entries shadow built-in ones.
    pub fn list_all(&self) -> BTreeMap<String, LayoutGeometry> {
        let table = self.snapshot();
        let mut all = table.builtin.clone();
        all.extend(table.custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        all
    }

    pub fn custom_names(&self) -> Vec<String> {
        self.snapshot().custom.keys().cloned().collect()
    }

    /// Registers a new custom layout and persists it.
    ///
    /// Built-in identifiers and existing custom names are rejected: layouts
    /// are never edited in place.
    pub fn append(&self, name: impl Into<String>, geometry: LayoutGeometry) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() || name.trim() != name {
            return Err(Error::InvalidLayoutName(name));
        }
        if is_builtin(&name) {
            return Err(Error::ReservedLayoutName(name));
        }
        geometry.validate()?;

        let _guard = self.writer.lock().map_err(|e| Error::mutex_lock("layout store", e))?;
        let mut doc = self.store.load()?;
        let taken = self.snapshot().custom.contains_key(&name)
            || doc.custom_layouts.iter().any(|l| l.name == name);
        if taken {
            return Err(Error::DuplicateLayout(name));
        }
        doc.custom_layouts.push(NamedLayout { name: name.clone(), geometry });
        self.store.save(&doc)?;
        self.swap(LayoutTable::build(&doc));
        log::info!("registered custom layout `{name}`");
        Ok(())
    }

    /// Re-reads the store. On failure the current table stays in place.
    ///
    /// Returns the number of custom layouts now known.
    pub fn reload(&self) -> Result<usize> {
        let _guard = self.writer.lock().map_err(|e| Error::mutex_lock("layout store", e))?;
        let doc = self.store.load()?;
        let table = LayoutTable::build(&doc);
        let n = table.custom.len();
        self.swap(table);
        log::debug!("reloaded {n} custom layouts");
        Ok(n)
    }
}
