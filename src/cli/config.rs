//! Configuration of the `collagist` command.
//!
//! ```toml
//! [layouts]
//! store = "layouts.json"
//! fallback = "1x2"
//! strict = false
//!
//! [collage]
//! background = "#000000"
//!
//! [frames]
//! path = "frames"
//! placeholder = "#709A8A"
//!
//! [output]
//! path = "out"
//! ext = "jpg"
//! ```

use crate::error::{Error, Result};
use crate::image::Color;
use crate::registry::{JsonFileStore, LayoutRegistry, Resolution, DEFAULT_FALLBACK};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub layouts: LayoutsConfig,
    #[serde(default)]
    pub collage: CollageConfig,
    #[serde(default)]
    pub frames: FramesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LayoutsConfig {
    #[serde(default = "default_store")]
    pub store: PathBuf,
    #[serde(default = "default_fallback")]
    pub fallback: String,
    #[serde(default)]
    pub strict: bool,
}

impl Default for LayoutsConfig {
    fn default() -> Self {
        Self { store: default_store(), fallback: default_fallback(), strict: false }
    }
}

fn default_store() -> PathBuf {
    PathBuf::from("layouts.json")
}

fn default_fallback() -> String {
    String::from(DEFAULT_FALLBACK)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollageConfig {
    #[serde(default)]
    pub background: Color,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FramesConfig {
    #[serde(default = "default_frames")]
    pub path: PathBuf,
    #[serde(default = "default_placeholder")]
    pub placeholder: Color,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self { path: default_frames(), placeholder: default_placeholder() }
    }
}

fn default_frames() -> PathBuf {
    PathBuf::from("frames")
}

fn default_placeholder() -> Color {
    Color::SAGE
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output")]
    pub path: PathBuf,
    #[serde(default = "default_ext")]
    pub ext: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { path: default_output(), ext: default_ext() }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("out")
}

fn default_ext() -> String {
    String::from("jpg")
}

impl Config {
    pub const FILE_NAME: &'static str = "collagist.toml";

    /// Looks for a config file at `path`, then `./collagist.toml`, then
    /// `config.toml` in the user config folder.
    ///
    /// Returns the folder relative paths are resolved against, together with
    /// the config. Without any file, that is the current folder and defaults.
    pub fn find(path: Option<&Path>) -> Result<(PathBuf, Self)> {
        if let Some(path) = path {
            return Self::open(path);
        }
        let local = PathBuf::from(".").join(Self::FILE_NAME);
        if local.is_file() {
            return Self::open(&local);
        }
        if let Ok(folder) = Self::config_folder() {
            let user = folder.join("config.toml");
            if user.is_file() {
                return Self::open(&user);
            }
        }
        log::debug!("no config file found, using defaults");
        Ok((PathBuf::from("."), Self::default()))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<(PathBuf, Self)> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::config_open(path, e))?;
        let config = Self::parse(&content).map_err(|e| Error::config_deser(path, e))?;
        let folder = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        log::debug!("using config {}", path.display());
        Ok((folder, config))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    #[cfg(target_os = "windows")]
    fn config_folder() -> Result<PathBuf> {
        let home = std::env::var("APPDATA").map_err(|_| Error::no_env_variable("APPDATA"))?;
        let mut home = PathBuf::from(home);
        home.push("collagist");
        Ok(home)
    }

    #[cfg(not(target_os = "windows"))]
    fn config_folder() -> Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| Error::no_env_variable("HOME"))?;
        let mut home = PathBuf::from(home);
        home.push(".collagist");
        Ok(home)
    }

    fn prefix(folder: &Path, path: &Path) -> PathBuf {
        if path.is_relative() {
            folder.join(path)
        } else {
            path.to_path_buf()
        }
    }

    pub fn store_path(&self, folder: &Path) -> PathBuf {
        Self::prefix(folder, &self.layouts.store)
    }

    pub fn frames_folder(&self, folder: &Path) -> PathBuf {
        Self::prefix(folder, &self.frames.path)
    }

    pub fn output_folder(&self, folder: &Path) -> PathBuf {
        Self::prefix(folder, &self.output.path)
    }

    pub fn resolution(&self) -> Resolution {
        if self.layouts.strict {
            Resolution::Strict
        } else {
            Resolution::Lenient
        }
    }

    /// Opens the layout registry this config points to.
    pub fn registry(&self, folder: &Path) -> Result<LayoutRegistry> {
        let store = JsonFileStore::new(self.store_path(folder));
        Ok(LayoutRegistry::open(store)?
            .with_fallback(self.layouts.fallback.clone())
            .with_resolution(self.resolution()))
    }
}
