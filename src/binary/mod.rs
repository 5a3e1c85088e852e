//! Little-endian binary helpers
//!
//! Shared by the compact ink-stroke codec and the page bundle stroke parser.

pub mod half;
mod reader;

pub use reader::ByteReader;
