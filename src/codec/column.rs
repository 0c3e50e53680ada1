use super::{BlockReader, BlockWriter, CodecError};
use std::fmt;
use tokio::io::AsyncRead;

/// Column types understood by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    String,
    /// Seconds since the epoch, optionally pinned to a named zone.
    DateTime(Option<String>),
}

impl ColumnType {
    pub fn parse(name: &str) -> Result<Self, CodecError> {
        let ty = match name.trim() {
            "UInt8" => ColumnType::UInt8,
            "UInt16" => ColumnType::UInt16,
            "UInt32" => ColumnType::UInt32,
            "UInt64" => ColumnType::UInt64,
            "Int8" => ColumnType::Int8,
            "Int16" => ColumnType::Int16,
            "Int32" => ColumnType::Int32,
            "Int64" => ColumnType::Int64,
            "Float32" => ColumnType::Float32,
            "Float64" => ColumnType::Float64,
            "Bool" => ColumnType::Bool,
            "String" => ColumnType::String,
            "DateTime" => ColumnType::DateTime(None),
            other => {
                let tz = other
                    .strip_prefix("DateTime(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .map(|inner| inner.trim().trim_matches('\''));
                match tz {
                    Some(tz) if !tz.is_empty() => ColumnType::DateTime(Some(tz.to_string())),
                    _ => return Err(CodecError::UnsupportedType(other.to_string())),
                }
            }
        };
        Ok(ty)
    }

    /// Zone named in a `DateTime('<zone>')` type.
    pub fn timezone(&self) -> Option<&str> {
        match self {
            ColumnType::DateTime(tz) => tz.as_deref(),
            _ => None,
        }
    }

    fn accepts(&self, data: &ColumnData) -> bool {
        matches!(
            (self, data),
            (ColumnType::UInt8, ColumnData::UInt8(_))
                | (ColumnType::UInt16, ColumnData::UInt16(_))
                | (ColumnType::UInt32, ColumnData::UInt32(_))
                | (ColumnType::UInt64, ColumnData::UInt64(_))
                | (ColumnType::Int8, ColumnData::Int8(_))
                | (ColumnType::Int16, ColumnData::Int16(_))
                | (ColumnType::Int32, ColumnData::Int32(_))
                | (ColumnType::Int64, ColumnData::Int64(_))
                | (ColumnType::Float32, ColumnData::Float32(_))
                | (ColumnType::Float64, ColumnData::Float64(_))
                | (ColumnType::Bool, ColumnData::Bool(_))
                | (ColumnType::String, ColumnData::String(_))
                | (ColumnType::DateTime(_), ColumnData::DateTime(_))
        )
    }

    pub(crate) fn check(&self, data: &ColumnData) -> Result<(), CodecError> {
        if self.accepts(data) {
            Ok(())
        } else {
            Err(CodecError::UnsupportedType(format!(
                "{} cannot hold {} values",
                self,
                data.column_type()
            )))
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::UInt8 => "UInt8",
            ColumnType::UInt16 => "UInt16",
            ColumnType::UInt32 => "UInt32",
            ColumnType::UInt64 => "UInt64",
            ColumnType::Int8 => "Int8",
            ColumnType::Int16 => "Int16",
            ColumnType::Int32 => "Int32",
            ColumnType::Int64 => "Int64",
            ColumnType::Float32 => "Float32",
            ColumnType::Float64 => "Float64",
            ColumnType::Bool => "Bool",
            ColumnType::String => "String",
            ColumnType::DateTime(None) => "DateTime",
            ColumnType::DateTime(Some(tz)) => return write!(f, "DateTime('{}')", tz),
        };
        f.write_str(name)
    }
}

/// Values of one column, stored contiguously.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Bool(Vec<bool>),
    String(Vec<String>),
    DateTime(Vec<u32>),
}

macro_rules! decode_fixed {
    ($reader:expr, $rows:expr, $read:ident, $variant:ident) => {{
        let mut values = Vec::with_capacity($rows.min(PREALLOC_LIMIT));
        for _ in 0..$rows {
            values.push($reader.$read().await?);
        }
        ColumnData::$variant(values)
    }};
}

// Row counts come off the wire; don't trust them for allocation.
const PREALLOC_LIMIT: usize = 1 << 16;

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::UInt8(v) => v.len(),
            ColumnData::UInt16(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::String(v) => v.len(),
            ColumnData::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The type these values are written as when no explicit type is given.
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::UInt8(_) => ColumnType::UInt8,
            ColumnData::UInt16(_) => ColumnType::UInt16,
            ColumnData::UInt32(_) => ColumnType::UInt32,
            ColumnData::UInt64(_) => ColumnType::UInt64,
            ColumnData::Int8(_) => ColumnType::Int8,
            ColumnData::Int16(_) => ColumnType::Int16,
            ColumnData::Int32(_) => ColumnType::Int32,
            ColumnData::Int64(_) => ColumnType::Int64,
            ColumnData::Float32(_) => ColumnType::Float32,
            ColumnData::Float64(_) => ColumnType::Float64,
            ColumnData::Bool(_) => ColumnType::Bool,
            ColumnData::String(_) => ColumnType::String,
            ColumnData::DateTime(_) => ColumnType::DateTime(None),
        }
    }

    pub(crate) fn encode(&self, w: &mut BlockWriter) {
        match self {
            ColumnData::UInt8(v) => v.iter().for_each(|x| w.put_u8(*x)),
            ColumnData::UInt16(v) => v.iter().for_each(|x| w.put_u16(*x)),
            ColumnData::UInt32(v) => v.iter().for_each(|x| w.put_u32(*x)),
            ColumnData::UInt64(v) => v.iter().for_each(|x| w.put_u64(*x)),
            ColumnData::Int8(v) => v.iter().for_each(|x| w.put_i8(*x)),
            ColumnData::Int16(v) => v.iter().for_each(|x| w.put_i16(*x)),
            ColumnData::Int32(v) => v.iter().for_each(|x| w.put_i32(*x)),
            ColumnData::Int64(v) => v.iter().for_each(|x| w.put_i64(*x)),
            ColumnData::Float32(v) => v.iter().for_each(|x| w.put_f32(*x)),
            ColumnData::Float64(v) => v.iter().for_each(|x| w.put_f64(*x)),
            ColumnData::Bool(v) => v.iter().for_each(|x| w.put_bool(*x)),
            ColumnData::String(v) => v.iter().for_each(|x| w.put_str(x)),
            ColumnData::DateTime(v) => v.iter().for_each(|x| w.put_u32(*x)),
        }
    }

    pub(crate) async fn decode<R: AsyncRead + Unpin>(
        r: &mut BlockReader<R>,
        ty: &ColumnType,
        rows: usize,
        column: &str,
    ) -> Result<Self, CodecError> {
        let data = match ty {
            ColumnType::UInt8 => decode_fixed!(r, rows, read_u8, UInt8),
            ColumnType::UInt16 => decode_fixed!(r, rows, read_u16, UInt16),
            ColumnType::UInt32 => decode_fixed!(r, rows, read_u32, UInt32),
            ColumnType::UInt64 => decode_fixed!(r, rows, read_u64, UInt64),
            ColumnType::Int8 => decode_fixed!(r, rows, read_i8, Int8),
            ColumnType::Int16 => decode_fixed!(r, rows, read_i16, Int16),
            ColumnType::Int32 => decode_fixed!(r, rows, read_i32, Int32),
            ColumnType::Int64 => decode_fixed!(r, rows, read_i64, Int64),
            ColumnType::Float32 => decode_fixed!(r, rows, read_f32, Float32),
            ColumnType::Float64 => decode_fixed!(r, rows, read_f64, Float64),
            ColumnType::Bool => decode_fixed!(r, rows, read_bool, Bool),
            ColumnType::DateTime(_) => decode_fixed!(r, rows, read_u32, DateTime),
            ColumnType::String => {
                let mut values = Vec::with_capacity(rows.min(PREALLOC_LIMIT));
                for _ in 0..rows {
                    values.push(r.read_string(column).await?);
                }
                ColumnData::String(values)
            }
        };
        Ok(data)
    }
}
