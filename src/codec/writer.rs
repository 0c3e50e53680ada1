use bytes::{BufMut, Bytes, BytesMut};

/// Buffered encoder for Native blocks.
///
/// The writer accumulates encoded bytes until [`BlockWriter::take`] hands them
/// to an outbound request body. Taking resets the buffer, so one writer can be
/// reused across sequential exchanges.
#[derive(Debug, Default)]
pub struct BlockWriter {
    buf: BytesMut,
}

impl BlockWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Detach everything written so far.
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn put_uvarint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.put_u8((value as u8) | 0x80);
            value >>= 7;
        }
        self.buf.put_u8(value as u8);
    }

    pub fn put_str(&mut self, value: &str) {
        self.put_uvarint(value.len() as u64);
        self.buf.put_slice(value.as_bytes());
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn put_i16(&mut self, value: i16) {
        self.buf.put_i16_le(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn put_f64(&mut self, value: f64) {
        self.buf.put_f64_le(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uvarint_matches_leb128() {
        let mut w = BlockWriter::new();
        w.put_uvarint(0);
        w.put_uvarint(127);
        w.put_uvarint(128);
        w.put_uvarint(300);
        assert_eq!(&w.take()[..], &[0x00, 0x7f, 0x80, 0x01, 0xac, 0x02]);
    }

    #[test]
    fn take_resets_buffer() {
        let mut w = BlockWriter::new();
        w.put_str("abc");
        assert_eq!(w.len(), 4);
        let first = w.take();
        assert_eq!(&first[..], b"\x03abc");
        assert!(w.is_empty());
    }
}
