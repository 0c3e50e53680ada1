use super::{CodecError, MAX_LENGTH};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Streaming decoder for Native blocks over any `AsyncRead`.
///
/// Reads are buffered so the reader can tell a clean end of stream (between
/// blocks) apart from a truncated block.
pub struct BlockReader<R> {
    inner: BufReader<R>,
}

macro_rules! read_fixed {
    ($(#[$meta:meta])* $name:ident, $inner:ident, $ty:ty, $what:literal) => {
        $(#[$meta])*
        pub async fn $name(&mut self) -> Result<$ty, CodecError> {
            self.inner.$inner().await.map_err(|e| eof(e, $what))
        }
    };
}

fn eof(err: std::io::Error, what: &'static str) -> CodecError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        CodecError::UnexpectedEof(what)
    } else {
        CodecError::Io(err)
    }
}

impl<R: AsyncRead + Unpin> BlockReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }

    /// True when no more bytes are available.
    pub async fn is_eof(&mut self) -> Result<bool, CodecError> {
        Ok(self.inner.fill_buf().await?.is_empty())
    }

    pub async fn read_uvarint(&mut self) -> Result<u64, CodecError> {
        let mut value: u64 = 0;
        for shift in (0..64).step_by(7) {
            let byte = self.read_u8().await?;
            if shift == 63 && byte > 1 {
                return Err(CodecError::VarintOverflow);
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::VarintOverflow)
    }

    /// Length prefix checked against [`MAX_LENGTH`].
    pub async fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = self.read_uvarint().await?;
        if len > MAX_LENGTH {
            return Err(CodecError::LengthTooLarge(len));
        }
        Ok(len as usize)
    }

    pub async fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_len().await?;
        let mut buf = vec![0u8; len];
        self.inner
            .read_exact(&mut buf)
            .await
            .map_err(|e| eof(e, "string body"))?;
        Ok(buf)
    }

    pub async fn read_string(&mut self, column: &str) -> Result<String, CodecError> {
        String::from_utf8(self.read_bytes().await?)
            .map_err(|_| CodecError::InvalidUtf8(column.to_string()))
    }

    pub async fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8().await? != 0)
    }

    read_fixed!(read_u8, read_u8, u8, "UInt8");
    read_fixed!(read_i8, read_i8, i8, "Int8");
    read_fixed!(read_u16, read_u16_le, u16, "UInt16");
    read_fixed!(read_i16, read_i16_le, i16, "Int16");
    read_fixed!(read_u32, read_u32_le, u32, "UInt32");
    read_fixed!(read_i32, read_i32_le, i32, "Int32");
    read_fixed!(read_u64, read_u64_le, u64, "UInt64");
    read_fixed!(read_i64, read_i64_le, i64, "Int64");
    read_fixed!(read_f32, read_f32_le, f32, "Float32");
    read_fixed!(read_f64, read_f64_le, f64, "Float64");
}
