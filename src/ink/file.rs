//! Indexed ink-stroke file
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Header (32 bytes)            │ magic "INKS", version, flags,
//! │                              │ stroke count, creation time
//! ├──────────────────────────────┤
//! │ Index table                  │ count x 13 bytes
//! │   offset u32, size u32,      │
//! │   timestamp u32, flags u8    │
//! ├──────────────────────────────┤
//! │ Data section                 │ stroke blobs, each optionally
//! │                              │ zlib-compressed on its own
//! └──────────────────────────────┘
//! ```
//!
//! Saves always use differential point encoding. Loads honour whatever the
//! header's flags say.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::error::{InkFileError, InkFileResult};
use super::stroke::{BinaryInkStroke, MAX_POINTS, STROKE_HEADER_SIZE};
use crate::binary::ByteReader;

/// Header flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileFlags(u16);

impl FileFlags {
    pub const COMPRESSED: FileFlags = FileFlags(1 << 0);
    /// Reserved; never set by this writer
    pub const ENCRYPTED: FileFlags = FileFlags(1 << 1);
    pub const DIFFERENTIAL: FileFlags = FileFlags(1 << 2);
    pub const HAS_INDEX: FileFlags = FileFlags(1 << 3);

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: FileFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: FileFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for FileFlags {
    type Output = FileFlags;

    fn bitor(self, rhs: FileFlags) -> FileFlags {
        FileFlags(self.0 | rhs.0)
    }
}

/// Fixed 32-byte file header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryFileHeader {
    pub magic: u32,
    pub version: u16,
    pub flags: FileFlags,
    pub stroke_count: u32,
    pub creation_time: f64,
}

impl BinaryFileHeader {
    /// "INKS"
    pub const MAGIC: u32 = 0x494E_4B53;
    pub const CURRENT_VERSION: u16 = 0x0001;
    pub const SIZE: usize = 32;

    /// Header for a new file stamped with the current time
    pub fn new(stroke_count: u32, flags: FileFlags) -> Self {
        let creation_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        Self {
            magic: Self::MAGIC,
            version: Self::CURRENT_VERSION,
            flags,
            stroke_count,
            creation_time,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.flags.contains(FileFlags::COMPRESSED)
    }

    pub fn is_differential(&self) -> bool {
        self.flags.contains(FileFlags::DIFFERENTIAL)
    }

    /// Offset of the first byte after the index table
    pub fn data_offset(&self) -> usize {
        Self::SIZE + self.stroke_count as usize * StrokeIndex::SIZE
    }

    pub fn write_to_buffer(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.magic.to_le_bytes());
        buffer.extend_from_slice(&self.version.to_le_bytes());
        buffer.extend_from_slice(&self.flags.bits().to_le_bytes());
        buffer.extend_from_slice(&self.stroke_count.to_le_bytes());
        buffer.extend_from_slice(&0u32.to_le_bytes());
        buffer.extend_from_slice(&self.creation_time.to_le_bytes());
        buffer.extend_from_slice(&[0u8; 8]);
    }

    /// Parse and validate a header from the start of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> InkFileResult<Self> {
        if bytes.len() < Self::SIZE {
            return Err(InkFileError::InvalidFileFormat(format!(
                "header needs {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }

        let mut reader = ByteReader::new(&bytes[..Self::SIZE]);
        let magic = reader.read_u32().unwrap_or_default();
        if magic != Self::MAGIC {
            return Err(InkFileError::InvalidFileFormat(format!(
                "bad magic {:#010x}",
                magic
            )));
        }

        let version = reader.read_u16().unwrap_or_default();
        if version != Self::CURRENT_VERSION {
            return Err(InkFileError::UnsupportedVersion(version));
        }

        let flags = FileFlags::from_bits(reader.read_u16().unwrap_or_default());
        let stroke_count = reader.read_u32().unwrap_or_default();
        let _reserved = reader.read_u32();
        let creation_time = reader.read_f64().unwrap_or_default();

        Ok(Self {
            magic,
            version,
            flags,
            stroke_count,
            creation_time,
        })
    }
}

/// One index table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeIndex {
    pub offset: u32,
    pub size: u32,
    /// Stroke timestamp truncated to whole seconds
    pub timestamp: u32,
    pub flags: u8,
}

impl StrokeIndex {
    pub const SIZE: usize = 13;

    pub fn write_to_buffer(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.offset.to_le_bytes());
        buffer.extend_from_slice(&self.size.to_le_bytes());
        buffer.extend_from_slice(&self.timestamp.to_le_bytes());
        buffer.push(self.flags);
    }

    fn read_from(reader: &mut ByteReader<'_>) -> Option<Self> {
        Some(Self {
            offset: reader.read_u32()?,
            size: reader.read_u32()?,
            timestamp: reader.read_u32()?,
            flags: reader.read_u8()?,
        })
    }

    /// Byte range of the blob, if it does not overflow
    fn range(&self) -> Option<std::ops::Range<usize>> {
        let start = self.offset as usize;
        let end = start.checked_add(self.size as usize)?;
        Some(start..end)
    }
}

/// Parse up to `count` index entries following the header
///
/// Entries that would run past the end of `bytes` are dropped.
fn parse_index_table(bytes: &[u8], count: u32) -> Vec<StrokeIndex> {
    let table = bytes.get(BinaryFileHeader::SIZE..).unwrap_or_default();
    let mut reader = ByteReader::new(table);
    let available = table.len() / StrokeIndex::SIZE;
    let mut indices = Vec::with_capacity((count as usize).min(available));

    for _ in 0..count {
        match StrokeIndex::read_from(&mut reader) {
            Some(index) => indices.push(index),
            None => break,
        }
    }

    indices
}

fn compress(data: &[u8]) -> InkFileResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len()), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| InkFileError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| InkFileError::Compression(e.to_string()))
}

/// Largest stroke encoding the codec can produce
const MAX_STROKE_BYTES: usize = STROKE_HEADER_SIZE + MAX_POINTS * 8;

fn decompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decompressed = Vec::with_capacity(data.len().saturating_mul(3).max(64));
    ZlibDecoder::new(data)
        .take(MAX_STROKE_BYTES as u64 + 1)
        .read_to_end(&mut decompressed)?;
    if decompressed.len() > MAX_STROKE_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("inflated stroke exceeds {} bytes", MAX_STROKE_BYTES),
        ));
    }
    Ok(decompressed)
}

/// Decode one stroke blob according to the header flags
fn decode_blob(blob: &[u8], header: &BinaryFileHeader) -> Option<BinaryInkStroke> {
    if header.is_compressed() {
        match decompress(blob) {
            Ok(raw) => BinaryInkStroke::deserialize(&raw, header.is_differential()),
            Err(e) => {
                tracing::warn!("Skipping stroke blob that failed to inflate: {}", e);
                None
            }
        }
    } else {
        BinaryInkStroke::deserialize(blob, header.is_differential())
    }
}

/// Encode a complete ink file in memory
pub fn encode_file(strokes: &[BinaryInkStroke], compressed: bool) -> InkFileResult<Vec<u8>> {
    let mut flags = FileFlags::DIFFERENTIAL | FileFlags::HAS_INDEX;
    if compressed {
        flags.insert(FileFlags::COMPRESSED);
    }

    let stroke_count = u32::try_from(strokes.len())
        .map_err(|_| InkFileError::CorruptedData("too many strokes for one file".into()))?;
    let header = BinaryFileHeader::new(stroke_count, flags);

    let blobs = strokes
        .iter()
        .map(|stroke| {
            let raw = stroke.serialize(true);
            if compressed {
                compress(&raw)
            } else {
                Ok(raw)
            }
        })
        .collect::<InkFileResult<Vec<_>>>()?;

    let data_len: usize = blobs.iter().map(Vec::len).sum();
    let mut buffer = Vec::with_capacity(header.data_offset() + data_len);
    header.write_to_buffer(&mut buffer);

    let mut offset = header.data_offset();
    for (stroke, blob) in strokes.iter().zip(&blobs) {
        let index = StrokeIndex {
            offset: u32::try_from(offset)
                .map_err(|_| InkFileError::CorruptedData("data exceeds 4 GiB".into()))?,
            size: blob.len() as u32,
            timestamp: stroke.timestamp as u32,
            flags: 0,
        };
        index.write_to_buffer(&mut buffer);
        offset += blob.len();
    }

    for blob in &blobs {
        buffer.extend_from_slice(blob);
    }

    Ok(buffer)
}

/// Decode a complete ink file held in memory
///
/// Index entries pointing past the end of the data are skipped.
pub fn decode_file(
    bytes: &[u8],
) -> InkFileResult<(BinaryFileHeader, Vec<StrokeIndex>, Vec<BinaryInkStroke>)> {
    let header = BinaryFileHeader::from_bytes(bytes)?;
    let indices = parse_index_table(bytes, header.stroke_count);

    let mut strokes = Vec::with_capacity(indices.len());
    for (ordinal, index) in indices.iter().enumerate() {
        let Some(blob) = index.range().and_then(|r| bytes.get(r)) else {
            tracing::debug!(ordinal, "Skipping stroke with out-of-range index entry");
            continue;
        };
        if let Some(stroke) = decode_blob(blob, &header) {
            strokes.push(stroke);
        }
    }

    Ok((header, indices, strokes))
}

/// File-backed stroke store
///
/// After the first `load_all` or `load_stroke` the header and index table
/// are kept in memory; random access then reads only the requested blob.
#[derive(Debug)]
pub struct BinaryStrokeFile {
    path: PathBuf,
    header: Option<BinaryFileHeader>,
    indices: Vec<StrokeIndex>,
}

impl BinaryStrokeFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            header: None,
            indices: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header from the last load or save
    pub fn header(&self) -> Option<&BinaryFileHeader> {
        self.header.as_ref()
    }

    /// Index table from the last load or save
    pub fn indices(&self) -> &[StrokeIndex] {
        &self.indices
    }

    /// Write all strokes, replacing the file
    pub fn save(&mut self, strokes: &[BinaryInkStroke], compressed: bool) -> InkFileResult<()> {
        let bytes = encode_file(strokes, compressed)?;
        std::fs::write(&self.path, &bytes)?;

        let header = BinaryFileHeader::from_bytes(&bytes)?;
        self.indices = parse_index_table(&bytes, header.stroke_count);
        self.header = Some(header);

        tracing::info!(
            path = %self.path.display(),
            strokes = strokes.len(),
            bytes = bytes.len(),
            "Saved ink file"
        );
        Ok(())
    }

    /// Load every stroke in the file
    ///
    /// On error the cached header and index are left untouched.
    pub fn load_all(&mut self) -> InkFileResult<Vec<BinaryInkStroke>> {
        let bytes = std::fs::read(&self.path)?;
        let (header, indices, strokes) = decode_file(&bytes)?;

        tracing::debug!(
            path = %self.path.display(),
            declared = header.stroke_count,
            loaded = strokes.len(),
            "Loaded ink file"
        );

        self.header = Some(header);
        self.indices = indices;
        Ok(strokes)
    }

    /// Load a single stroke by position
    ///
    /// Returns `Ok(None)` for an ordinal past the index table or for an
    /// entry whose blob cannot be read or decoded.
    pub fn load_stroke(&mut self, ordinal: usize) -> InkFileResult<Option<BinaryInkStroke>> {
        let mut file = File::open(&self.path)?;
        let header = match self.header {
            Some(header) => header,
            None => self.read_index(&mut file)?,
        };

        let Some(index) = self.indices.get(ordinal).copied() else {
            return Ok(None);
        };

        let file_len = file.metadata()?.len();
        let in_bounds = index
            .range()
            .is_some_and(|r| r.end as u64 <= file_len);
        if !in_bounds {
            return Ok(None);
        }

        let mut blob = vec![0u8; index.size as usize];
        file.seek(SeekFrom::Start(index.offset as u64))?;
        file.read_exact(&mut blob)?;

        Ok(decode_blob(&blob, &header))
    }

    /// Append one stroke
    ///
    /// Rewrites the whole file: cost grows with the number of strokes.
    pub fn append_stroke(&mut self, stroke: BinaryInkStroke, compressed: bool) -> InkFileResult<()> {
        let mut strokes = if self.path.exists() {
            self.load_all()?
        } else {
            Vec::new()
        };
        strokes.push(stroke);
        self.save(&strokes, compressed)
    }

    /// Read and cache the header and index table without touching stroke data
    fn read_index(&mut self, file: &mut File) -> InkFileResult<BinaryFileHeader> {
        let mut head = [0u8; BinaryFileHeader::SIZE];
        file.seek(SeekFrom::Start(0))?;
        let read = read_up_to(file, &mut head)?;
        let header = BinaryFileHeader::from_bytes(&head[..read])?;

        let table_len = header.stroke_count as usize * StrokeIndex::SIZE;
        let file_len = file.metadata()?.len() as usize;
        let mut table = vec![0u8; table_len.min(file_len.saturating_sub(BinaryFileHeader::SIZE))];
        file.read_exact(&mut table)?;

        let mut with_header = Vec::with_capacity(BinaryFileHeader::SIZE + table.len());
        with_header.extend_from_slice(&head);
        with_header.extend_from_slice(&table);

        self.indices = parse_index_table(&with_header, header.stroke_count);
        self.header = Some(header);
        Ok(header)
    }
}

/// Fill as much of `buf` as the reader allows
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
