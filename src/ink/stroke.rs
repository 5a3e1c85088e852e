//! Compact binary ink stroke
//!
//! Wire layout (little-endian):
//!
//! ```text
//! id         16 bytes  UUID
//! color       4 bytes  packed 0xRRGGBBAA
//! width       2 bytes  binary16
//! alpha       2 bytes  binary16
//! tool        1 byte
//! timestamp   4 bytes  f32 unix seconds
//! count       2 bytes  u16 point count
//! points      absolute: count x (f32 x, f32 y)
//!             differential: (f32 x, f32 y) then (count - 1) x (i16 dx, i16 dy)
//! ```
//!
//! Differential deltas are stored in tenths of a unit. The encoder measures
//! each delta against the point the decoder will reconstruct, so every
//! decoded point stays within half a tenth of its source.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::binary::half::{f16_bits_to_f32, f32_to_f16_bits};
use crate::binary::ByteReader;

/// Fixed header size before any point data
pub const STROKE_HEADER_SIZE: usize = 31;

/// Maximum number of points a stroke can carry
pub const MAX_POINTS: usize = u16::MAX as usize;

/// Delta quantization: stored value = delta * 10
const DELTA_SCALE: f32 = 10.0;

/// Worst-case per-coordinate error of differential encoding
pub const DIFFERENTIAL_TOLERANCE: f32 = 0.05;

/// A point in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// RGBA colour, packed as `0xRRGGBBAA`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 255 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_packed(value: u32) -> Self {
        let [r, g, b, a] = value.to_be_bytes();
        Self { r, g, b, a }
    }

    pub fn to_packed(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    /// Build from unit-range components, clamping out-of-range input
    pub fn from_unit(r: f32, g: f32, b: f32, a: f32) -> Self {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u8;
        Self::new(channel(r), channel(g), channel(b), channel(a))
    }
}

/// Drawing tool recorded with a stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkTool {
    Pen,
    Pencil,
    Highlighter,
    Eraser,
    Lasso,
}

impl InkTool {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Pen),
            1 => Some(Self::Pencil),
            2 => Some(Self::Highlighter),
            3 => Some(Self::Eraser),
            4 => Some(Self::Lasso),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// A single ink stroke in the compact format
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryInkStroke {
    pub id: Uuid,
    pub points: Vec<Point2D>,
    /// Packed `0xRRGGBBAA`
    pub color: u32,
    /// Stored as binary16
    pub width: f32,
    /// Stored as binary16
    pub alpha: f32,
    pub tool: u8,
    /// Unix seconds; stored as f32 on the wire
    pub timestamp: f64,
}

impl Default for BinaryInkStroke {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryInkStroke {
    /// New empty black pen stroke stamped with the current time
    pub fn new() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4(),
            points: Vec::new(),
            color: Rgba::BLACK.to_packed(),
            width: 2.0,
            alpha: 1.0,
            tool: InkTool::Pen.id(),
            timestamp,
        }
    }

    pub fn with_points(mut self, points: Vec<Point2D>) -> Self {
        self.points = points;
        self
    }

    pub fn add_point(&mut self, point: Point2D) {
        self.points.push(point);
    }

    pub fn rgba(&self) -> Rgba {
        Rgba::from_packed(self.color)
    }

    /// Known tool, or `None` for an unrecognised tool byte
    pub fn ink_tool(&self) -> Option<InkTool> {
        InkTool::from_id(self.tool)
    }

    /// Encoded size in bytes for the given point mode
    pub fn encoded_len(&self, use_differential: bool) -> usize {
        let count = self.points.len().min(MAX_POINTS);
        let points = if use_differential && count > 1 {
            8 + (count - 1) * 4
        } else {
            count * 8
        };
        STROKE_HEADER_SIZE + points
    }

    /// Encode the stroke
    ///
    /// Point lists longer than [`MAX_POINTS`] are truncated by the u16 count
    /// field; keeping strokes within that bound is the caller's job.
    pub fn serialize(&self, use_differential: bool) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.encoded_len(use_differential));
        let points = &self.points[..self.points.len().min(MAX_POINTS)];

        data.extend_from_slice(self.id.as_bytes());
        data.extend_from_slice(&self.color.to_le_bytes());
        data.extend_from_slice(&f32_to_f16_bits(self.width).to_le_bytes());
        data.extend_from_slice(&f32_to_f16_bits(self.alpha).to_le_bytes());
        data.push(self.tool);
        data.extend_from_slice(&(self.timestamp as f32).to_le_bytes());
        data.extend_from_slice(&(points.len() as u16).to_le_bytes());

        if use_differential && points.len() > 1 {
            write_differential_points(points, &mut data);
        } else {
            write_absolute_points(points, &mut data);
        }

        data
    }

    /// Decode a stroke
    ///
    /// Returns `None` only when the fixed header is incomplete. A truncated
    /// point list yields the points that could be read.
    pub fn deserialize(data: &[u8], use_differential: bool) -> Option<Self> {
        if data.len() < STROKE_HEADER_SIZE {
            return None;
        }

        let mut reader = ByteReader::new(data);
        let id_bytes: [u8; 16] = reader.read_slice(16)?.try_into().ok()?;
        let color = reader.read_u32()?;
        let width = f16_bits_to_f32(reader.read_u16()?);
        let alpha = f16_bits_to_f32(reader.read_u16()?);
        let tool = reader.read_u8()?;
        let timestamp = reader.read_f32()? as f64;
        let count = reader.read_u16()? as usize;

        let points = if use_differential && count > 0 {
            read_differential_points(&mut reader, count)
        } else {
            read_absolute_points(&mut reader, count)
        };

        Some(Self {
            id: Uuid::from_bytes(id_bytes),
            points,
            color,
            width,
            alpha,
            tool,
            timestamp,
        })
    }
}

fn write_absolute_points(points: &[Point2D], data: &mut Vec<u8>) {
    for point in points {
        data.extend_from_slice(&point.x.to_le_bytes());
        data.extend_from_slice(&point.y.to_le_bytes());
    }
}

fn write_differential_points(points: &[Point2D], data: &mut Vec<u8>) {
    let Some(first) = points.first() else {
        return;
    };
    data.extend_from_slice(&first.x.to_le_bytes());
    data.extend_from_slice(&first.y.to_le_bytes());

    // Track the decoder's running position so rounding never accumulates
    let mut current = *first;
    for point in &points[1..] {
        let dx = quantize_delta(point.x - current.x);
        let dy = quantize_delta(point.y - current.y);
        data.extend_from_slice(&dx.to_le_bytes());
        data.extend_from_slice(&dy.to_le_bytes());
        current.x += dx as f32 / DELTA_SCALE;
        current.y += dy as f32 / DELTA_SCALE;
    }
}

/// Saturating: jumps beyond +-3276.7 units are clamped and caught up by
/// the following deltas.
fn quantize_delta(delta: f32) -> i16 {
    (delta * DELTA_SCALE).round() as i16
}

fn read_absolute_points(reader: &mut ByteReader<'_>, count: usize) -> Vec<Point2D> {
    let mut points = Vec::with_capacity(count.min(reader.bytes_remaining() / 8));
    for _ in 0..count {
        let (Some(x), Some(y)) = (reader.read_f32(), reader.read_f32()) else {
            break;
        };
        points.push(Point2D::new(x, y));
    }
    points
}

fn read_differential_points(reader: &mut ByteReader<'_>, count: usize) -> Vec<Point2D> {
    let mut points = Vec::with_capacity(count.min(1 + reader.bytes_remaining() / 4));
    if reader.bytes_remaining() < 8 {
        return points;
    }
    let (Some(x0), Some(y0)) = (reader.read_f32(), reader.read_f32()) else {
        return points;
    };

    let mut current = Point2D::new(x0, y0);
    points.push(current);

    for _ in 1..count {
        if reader.bytes_remaining() < 4 {
            break;
        }
        let (Some(dx), Some(dy)) = (reader.read_i16(), reader.read_i16()) else {
            break;
        };
        current.x += dx as f32 / DELTA_SCALE;
        current.y += dy as f32 / DELTA_SCALE;
        points.push(current);
    }

    points
}
