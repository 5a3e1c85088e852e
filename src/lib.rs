//! Talya - reader core for `.talya` page archives
//!
//! - [`document`]: open archives, load and cache pages
//! - [`ink`]: standalone indexed ink-stroke files
//! - [`archive`]: ZIP entry access shared by both document levels
//! - [`binary`]: little-endian cursor reader and half-float conversion

pub mod archive;
pub mod binary;
pub mod config;
pub mod document;
pub mod ink;

pub use config::LoaderConfig;
pub use document::{DocumentManager, TalyaDocument, TalyaError, TalyaPage};
