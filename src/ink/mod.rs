//! Standalone ink-stroke storage
//!
//! Two layers:
//!
//! - [`BinaryInkStroke`]: compact per-stroke codec with absolute or
//!   differential point encoding
//! - [`BinaryStrokeFile`]: an indexed container of such strokes, each blob
//!   optionally zlib-compressed, supporting full loads and random access
//!
//! This format is independent of the `strokes.bin` entries found inside
//! page bundles (see [`crate::document`]).

mod error;
mod file;
mod stroke;

pub use error::{InkFileError, InkFileResult};
pub use file::{decode_file, encode_file, BinaryFileHeader, BinaryStrokeFile, FileFlags, StrokeIndex};
pub use stroke::{
    BinaryInkStroke, InkTool, Point2D, Rgba, DIFFERENTIAL_TOLERANCE, MAX_POINTS,
    STROKE_HEADER_SIZE,
};
