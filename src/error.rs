//! Common error types.

use std::fmt;
use std::path::{Path, PathBuf};

/// A shortcut type equivalent to `Result<T, collagist::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error that occurs within the crate.
#[derive(Debug, Clone)]
pub enum Error {
    SlotCountMismatch { expected: usize, actual: usize },
    InvalidGeometry(String),
    UnknownLayout(String),
    ReservedLayoutName(String),
    DuplicateLayout(String),
    InvalidLayoutName(String),
    EmptyPhoto(usize),
    VipsError(String),
    StoreOpen(PathBuf, String),
    StoreWrite(PathBuf, String),
    StoreDeser(PathBuf, String),
    ConfigOpen(PathBuf, String),
    ConfigDeser(PathBuf, String),
    ManifestOpen(PathBuf, String),
    ManifestDeser(PathBuf, String),
    FramesFolder(PathBuf, String),
    OutputFolder(PathBuf, String),
    MissingVariable(&'static str),
    ReadLockError(&'static str, String),
    WriteLockError(&'static str, String),
    MutexLockError(&'static str, String),
    ThreadJoin(usize),
    BatchAborted(usize),
}

impl Error {
    pub fn slot_count(expected: usize, actual: usize) -> Self {
        Self::SlotCountMismatch { expected, actual }
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn store_open(path: impl AsRef<Path>, e: impl fmt::Display) -> Self {
        Self::StoreOpen(path.as_ref().to_path_buf(), e.to_string())
    }

    pub fn store_write(path: impl AsRef<Path>, e: impl fmt::Display) -> Self {
        Self::StoreWrite(path.as_ref().to_path_buf(), e.to_string())
    }

    pub fn store_deser(path: impl AsRef<Path>, e: impl fmt::Display) -> Self {
        Self::StoreDeser(path.as_ref().to_path_buf(), e.to_string())
    }

    pub fn config_open(path: impl AsRef<Path>, e: impl fmt::Display) -> Self {
        Self::ConfigOpen(path.as_ref().to_path_buf(), e.to_string())
    }

    pub fn config_deser(path: impl AsRef<Path>, e: impl fmt::Display) -> Self {
        Self::ConfigDeser(path.as_ref().to_path_buf(), e.to_string())
    }

    pub fn manifest_open(path: impl AsRef<Path>, e: impl fmt::Display) -> Self {
        Self::ManifestOpen(path.as_ref().to_path_buf(), e.to_string())
    }

    pub fn manifest_deser(path: impl AsRef<Path>, e: impl fmt::Display) -> Self {
        Self::ManifestDeser(path.as_ref().to_path_buf(), e.to_string())
    }

    pub fn frames_folder(path: impl AsRef<Path>, e: impl fmt::Display) -> Self {
        Self::FramesFolder(path.as_ref().to_path_buf(), e.to_string())
    }

    pub fn output_folder(path: impl AsRef<Path>, e: impl fmt::Display) -> Self {
        Self::OutputFolder(path.as_ref().to_path_buf(), e.to_string())
    }

    pub fn no_env_variable(var: &'static str) -> Self {
        Self::MissingVariable(var)
    }

    pub fn read_lock(what: &'static str, e: impl fmt::Display) -> Self {
        Self::ReadLockError(what, e.to_string())
    }

    pub fn write_lock(what: &'static str, e: impl fmt::Display) -> Self {
        Self::WriteLockError(what, e.to_string())
    }

    pub fn mutex_lock(what: &'static str, e: impl fmt::Display) -> Self {
        Self::MutexLockError(what, e.to_string())
    }

    pub fn thread_join(id: usize) -> Self {
        Self::ThreadJoin(id)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SlotCountMismatch { expected, actual } => {
                write!(f, "layout has {expected} slots, but {actual} photos were given")
            }
            Error::InvalidGeometry(e) => write!(f, "Invalid layout geometry: {e}"),
            Error::UnknownLayout(id) => write!(f, "Unknown layout `{id}`"),
            Error::ReservedLayoutName(id) => {
                write!(f, "`{id}` is a built-in layout and cannot be redefined")
            }
            Error::DuplicateLayout(id) => write!(f, "A layout named `{id}` already exists"),
            Error::InvalidLayoutName(id) => write!(f, "Invalid layout name `{id}`"),
            Error::EmptyPhoto(i) => write!(f, "Photo #{i} has no pixels"),
            Error::VipsError(e) => write!(f, "Image error: {e}"),
            Error::StoreOpen(p, e) => {
                write!(f, "Failed to open layout store {}: {e}", p.display())
            }
            Error::StoreWrite(p, e) => {
                write!(f, "Failed to write layout store {}: {e}", p.display())
            }
            Error::StoreDeser(p, e) => {
                write!(f, "Failed to parse layout store {}: {e}", p.display())
            }
            Error::ConfigOpen(p, e) => write!(f, "Failed to open config {}: {e}", p.display()),
            Error::ConfigDeser(p, e) => write!(f, "Failed to parse config {}: {e}", p.display()),
            Error::ManifestOpen(p, e) => {
                write!(f, "Failed to open manifest {}: {e}", p.display())
            }
            Error::ManifestDeser(p, e) => {
                write!(f, "Failed to parse manifest {}: {e}", p.display())
            }
            Error::FramesFolder(p, e) => {
                write!(f, "Failed to access frames folder {}: {e}", p.display())
            }
            Error::OutputFolder(p, e) => {
                write!(f, "Failed to create output folder {}: {e}", p.display())
            }
            Error::MissingVariable(e) => write!(f, "Missing environment variable: {e}"),
            Error::ReadLockError(what, e) => write!(f, "Failed to read-lock {what}: {e}"),
            Error::WriteLockError(what, e) => write!(f, "Failed to write-lock {what}: {e}"),
            Error::MutexLockError(what, e) => write!(f, "Failed to lock {what}: {e}"),
            Error::ThreadJoin(id) => write!(f, "Worker thread #{id} panicked"),
            Error::BatchAborted(i) => {
                write!(f, "Batch stopped before job {i} after a worker failed")
            }
        }
    }
}

impl std::error::Error for Error {}
