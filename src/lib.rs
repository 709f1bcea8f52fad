//! # Collagist
//!
//! A library to compose photo-booth collages from declarative layouts and
//! overlay frame templates on them.

#[cfg(feature = "cli")]
pub mod cli;
pub mod compose;
pub mod error;
pub mod frames;
pub mod image;
pub mod layout;
#[cfg(feature = "cli")]
pub mod logs;
pub mod pipeline;
pub mod registry;

pub use error::{Error, Result};
