//! Cursor-based reader over an immutable byte buffer
//!
//! Every read is bounds-checked: on insufficient data it returns `None`
//! and leaves the cursor where it was. One reader performs one linear scan;
//! it is not meant to be shared between threads.

/// Little-endian cursor over a borrowed byte slice
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Number of unread bytes
    pub fn bytes_remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Whether the cursor reached the end of the buffer
    pub fn is_empty(&self) -> bool {
        self.bytes_remaining() == 0
    }

    /// Take the next `N` bytes as a fixed array
    #[inline]
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.bytes_remaining() < N {
            return None;
        }
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        Some(buf)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|b| b[0])
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    pub fn read_i16(&mut self) -> Option<i16> {
        self.take::<2>().map(i16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> Option<f32> {
        self.take::<4>().map(f32::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> Option<f64> {
        self.take::<8>().map(f64::from_le_bytes)
    }

    /// Borrow the next `count` bytes without copying
    pub fn read_slice(&mut self, count: usize) -> Option<&'a [u8]> {
        if count > self.bytes_remaining() {
            return None;
        }
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Some(slice)
    }

    /// Copy out the next `count` bytes
    pub fn read_bytes(&mut self, count: usize) -> Option<Vec<u8>> {
        self.read_slice(count).map(<[u8]>::to_vec)
    }

    /// Read a fixed-width UTF-8 field, stripping trailing NUL padding
    ///
    /// Fails (cursor unchanged) if the bytes are not valid UTF-8.
    pub fn read_string(&mut self, length: usize) -> Option<String> {
        if length > self.bytes_remaining() {
            return None;
        }
        let raw = &self.data[self.offset..self.offset + length];
        let text = std::str::from_utf8(raw).ok()?;
        self.offset += length;
        Some(text.trim_end_matches('\0').to_string())
    }
}
