//! Page-bundle `strokes.bin` codec
//!
//! ```text
//! u32 stroke count
//! per stroke:
//!   u32 block length
//!   block:
//!     36 bytes  id (UTF-8, NUL padded)
//!     u8        type
//!     4 x u8    RGBA
//!     f32       width
//!     f64       timestamp
//!     u32       point count
//!     points    count x (u16 x*10, u16 y*10, u8 pressure*255)
//! ```
//!
//! Parsing is best effort: a block that fails to decode is skipped, and a
//! length field that points past the buffer ends the scan.

use crate::binary::ByteReader;

use super::types::{Stroke, StrokePoint};

/// Counts above this are treated as corruption
pub const MAX_STROKE_COUNT: u32 = 10_000;

pub const STROKE_ID_LEN: usize = 36;

/// Fixed bytes in a block before the points
const BLOCK_HEADER_LEN: usize = STROKE_ID_LEN + 1 + 4 + 4 + 8 + 4;

const POINT_LEN: usize = 5;

const COORD_SCALE: f32 = 10.0;

/// Decode every readable stroke in a `strokes.bin` blob
pub fn parse_strokes(data: &[u8]) -> Vec<Stroke> {
    let mut reader = ByteReader::new(data);

    let Some(count) = reader.read_u32() else {
        tracing::warn!(bytes = data.len(), "Stroke data too short to contain count");
        return Vec::new();
    };

    if count > MAX_STROKE_COUNT {
        tracing::warn!(count, "Suspicious stroke count, ignoring stroke data");
        return Vec::new();
    }

    tracing::debug!(count, bytes = data.len(), "Parsing strokes");

    let mut strokes = Vec::with_capacity(count as usize);
    for ordinal in 0..count {
        let Some(block_len) = reader.read_u32() else {
            tracing::warn!(ordinal, "Stroke data ended before block length");
            break;
        };
        let Some(block) = reader.read_slice(block_len as usize) else {
            tracing::warn!(ordinal, block_len, "Stroke block exceeds remaining buffer");
            break;
        };

        match parse_stroke(block) {
            Some(stroke) => strokes.push(stroke),
            None => tracing::debug!(ordinal, "Skipping undecodable stroke"),
        }
    }

    tracing::debug!(parsed = strokes.len(), "Parsed strokes");
    strokes
}

/// Decode a single stroke block
///
/// Returns `None` if the fixed fields are incomplete or the id is not
/// UTF-8. A short point list yields the points that fit.
pub fn parse_stroke(block: &[u8]) -> Option<Stroke> {
    let mut reader = ByteReader::new(block);

    let id = reader.read_string(STROKE_ID_LEN)?;
    let kind = reader.read_u8()?;
    let color = [
        reader.read_u8()?,
        reader.read_u8()?,
        reader.read_u8()?,
        reader.read_u8()?,
    ];
    let width = reader.read_f32()?;
    let timestamp = reader.read_f64()?;
    let point_count = reader.read_u32()? as usize;

    let mut points = Vec::with_capacity(point_count.min(reader.bytes_remaining() / POINT_LEN));
    for _ in 0..point_count {
        let (Some(x), Some(y), Some(pressure)) =
            (reader.read_u16(), reader.read_u16(), reader.read_u8())
        else {
            break;
        };
        points.push(StrokePoint {
            x: x as f32 / COORD_SCALE,
            y: y as f32 / COORD_SCALE,
            pressure: pressure as f32 / 255.0,
        });
    }

    Some(Stroke {
        id,
        kind,
        color,
        width,
        timestamp,
        points,
    })
}

/// Encode strokes into a `strokes.bin` blob
pub fn encode_strokes(strokes: &[Stroke]) -> Vec<u8> {
    let blocks: Vec<Vec<u8>> = strokes.iter().map(encode_stroke).collect();
    let total: usize = blocks.iter().map(|b| 4 + b.len()).sum();

    let mut data = Vec::with_capacity(4 + total);
    data.extend_from_slice(&(blocks.len() as u32).to_le_bytes());
    for block in &blocks {
        data.extend_from_slice(&(block.len() as u32).to_le_bytes());
        data.extend_from_slice(block);
    }
    data
}

/// Encode one stroke block
///
/// Ids longer than 36 bytes are cut at a character boundary. Coordinates
/// are clamped to the u16 range after scaling.
pub fn encode_stroke(stroke: &Stroke) -> Vec<u8> {
    let mut block = Vec::with_capacity(BLOCK_HEADER_LEN + stroke.points.len() * POINT_LEN);

    let mut id_len = stroke.id.len().min(STROKE_ID_LEN);
    while !stroke.id.is_char_boundary(id_len) {
        id_len -= 1;
    }
    block.extend_from_slice(&stroke.id.as_bytes()[..id_len]);
    block.resize(STROKE_ID_LEN, 0);

    block.push(stroke.kind);
    block.extend_from_slice(&stroke.color);
    block.extend_from_slice(&stroke.width.to_le_bytes());
    block.extend_from_slice(&stroke.timestamp.to_le_bytes());
    block.extend_from_slice(&(stroke.points.len() as u32).to_le_bytes());

    for point in &stroke.points {
        block.extend_from_slice(&quantize_coord(point.x).to_le_bytes());
        block.extend_from_slice(&quantize_coord(point.y).to_le_bytes());
        block.push((point.pressure.clamp(0.0, 1.0) * 255.0).round() as u8);
    }

    block
}

fn quantize_coord(value: f32) -> u16 {
    (value * COORD_SCALE).round().clamp(0.0, u16::MAX as f32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stroke(id: &str, point_count: usize) -> Stroke {
        Stroke {
            id: id.to_string(),
            kind: 1,
            color: [255, 0, 0, 255],
            width: 2.5,
            timestamp: 1_700_000_000.25,
            points: (0..point_count)
                .map(|i| StrokePoint {
                    x: 10.0 + i as f32 * 0.5,
                    y: 20.0 + i as f32,
                    pressure: 1.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_block_layout() {
        let block = encode_stroke(&sample_stroke("abc", 2));
        assert_eq!(block.len(), BLOCK_HEADER_LEN + 2 * POINT_LEN);
        assert_eq!(&block[..3], b"abc");
        assert!(block[3..36].iter().all(|&b| b == 0));
        assert_eq!(block[36], 1);
        assert_eq!(&block[37..41], &[255, 0, 0, 255]);
        // first point x = 10.0 -> 100
        assert_eq!(u16::from_le_bytes([block[57], block[58]]), 100);
        assert_eq!(block[61], 255);
    }

    #[test]
    fn test_round_trip() {
        let strokes = vec![
            sample_stroke("5b0c7c1e-2f43-4c41-9d3a-6e1f2a3b4c5d", 4),
            sample_stroke("second", 0),
        ];
        let parsed = parse_strokes(&encode_strokes(&strokes));
        assert_eq!(parsed, strokes);
    }

    #[test]
    fn test_quantization() {
        let mut stroke = sample_stroke("q", 0);
        stroke.points = vec![StrokePoint { x: 12.34, y: -5.0, pressure: 0.5 }];

        let parsed = parse_stroke(&encode_stroke(&stroke)).unwrap();
        let point = parsed.points[0];
        assert!((point.x - 12.3).abs() < 1e-4);
        assert_eq!(point.y, 0.0);
        assert!((point.pressure - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_corrupt_count_yields_nothing() {
        let mut data = u32::MAX.to_le_bytes().to_vec();
        data.extend_from_slice(&encode_stroke(&sample_stroke("x", 3)));
        assert!(parse_strokes(&data).is_empty());

        let data = (MAX_STROKE_COUNT + 1).to_le_bytes();
        assert!(parse_strokes(&data).is_empty());
    }

    #[test]
    fn test_short_buffer() {
        assert!(parse_strokes(&[]).is_empty());
        assert!(parse_strokes(&[1, 0]).is_empty());
    }

    #[test]
    fn test_block_past_end_stops_scan() {
        let mut data = encode_strokes(&[sample_stroke("a", 2), sample_stroke("b", 2)]);
        // Drop the last byte so the second block overruns
        data.pop();
        let parsed = parse_strokes(&data);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, "a");
    }

    #[test]
    fn test_bad_block_is_skipped() {
        let good = encode_stroke(&sample_stroke("good", 1));
        let bad = vec![0u8; 10];

        let mut data = 3u32.to_le_bytes().to_vec();
        for block in [&good, &bad, &good] {
            data.extend_from_slice(&(block.len() as u32).to_le_bytes());
            data.extend_from_slice(block);
        }

        let parsed = parse_strokes(&data);
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(|s| s.id == "good"));
    }

    #[test]
    fn test_truncated_points_tolerated() {
        let mut block = encode_stroke(&sample_stroke("t", 3));
        block.truncate(block.len() - 2);
        let parsed = parse_stroke(&block).unwrap();
        assert_eq!(parsed.points.len(), 2);
    }

    #[test]
    fn test_long_id_cut_at_char_boundary() {
        let id = format!("{}é", "a".repeat(35));
        let parsed = parse_stroke(&encode_stroke(&sample_stroke(&id, 0))).unwrap();
        assert_eq!(parsed.id, "a".repeat(35));
    }
}
