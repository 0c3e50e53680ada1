//! Native block codec.
//!
//! A minimal implementation of the ClickHouse `Native` format: enough to carry
//! result blocks back from the server and insert blocks out to it. The
//! transport treats blocks as opaque; it only binds a [`BlockWriter`] to the
//! outbound request body and a [`BlockReader`] to the inbound response body.
//!
//! ## Layout
//!
//! ```text
//! [block info]  uvarint(columns)  uvarint(rows)  { string(name) string(type) data }*
//!      │
//!      └── only when revision >= MIN_REVISION_WITH_BLOCK_INFO
//! ```

mod block;
mod column;
mod reader;
mod writer;

pub use block::{Block, Column, MIN_REVISION_WITH_BLOCK_INFO};
pub use column::{ColumnData, ColumnType};
pub use reader::BlockReader;
pub use writer::BlockWriter;

/// Protocol revision used by the HTTP transport for every block.
pub const HTTP_REVISION: u64 = 0;

/// Upper bound accepted for a single length prefix (strings, row counts).
pub(crate) const MAX_LENGTH: u64 = 1 << 30;

/// Error type for block encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended in the middle of a block.
    #[error("unexpected end of stream while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("unsupported column type {0:?}")]
    UnsupportedType(String),

    #[error("column {column:?} has {actual} rows, block has {expected}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid UTF-8 in String column {0:?}")]
    InvalidUtf8(String),

    #[error("varint overflows u64")]
    VarintOverflow,

    #[error("length prefix {0} exceeds limit")]
    LengthTooLarge(u64),

    #[error("unknown block info field {0}")]
    UnknownBlockInfoField(u64),
}

impl CodecError {
    /// Returns true if the stream ended before a block was complete.
    pub fn is_truncated(&self) -> bool {
        matches!(self, CodecError::UnexpectedEof(_))
    }
}
