//! TOML batch manifests.
//!
//! ```toml
//! [[job]]
//! layout = "2x2"
//! photos = ["shots/a.jpg", "shots/b.jpg", "shots/c.jpg", "shots/d.jpg"]
//! frame = "frames/2x2/hearts.png"
//! output = "out/session-1.jpg"
//! ```

use crate::error::{Error, Result};
use crate::pipeline::CollageJob;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "job")]
    pub jobs: Vec<CollageJob>,
}

impl Manifest {
    /// Reads a manifest, resolving relative paths against its folder.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::manifest_open(path, e))?;
        let raw = Self::parse(&content).map_err(|e| Error::manifest_deser(path, e))?;
        let folder = path.parent().unwrap_or(Path::new("")).to_path_buf();
        Ok(raw.relative_to(&folder))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Prefixes every relative path with `folder`.
    pub fn relative_to(self, folder: &Path) -> Self {
        let prefix = |p: PathBuf| if p.is_relative() { folder.join(p) } else { p };
        let jobs = self
            .jobs
            .into_iter()
            .map(|job| CollageJob {
                layout: job.layout,
                photos: job.photos.into_iter().map(prefix).collect(),
                frame: job.frame.map(prefix),
                output: prefix(job.output),
            })
            .collect();
        Self { jobs }
    }

    pub fn into_jobs(self) -> Vec<CollageJob> {
        self.jobs
    }
}
