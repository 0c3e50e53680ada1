//! Block codec adapter: binds the block writer and reader to the current
//! exchange.

use crate::codec::{Block, CodecError, HTTP_REVISION};
use crate::{Error, Result};

use super::connection::{BoundReader, HttpConnection};
use super::context::QueryContext;
use super::response::ResponseBody;

impl HttpConnection {
    /// Encode `block` into the outbound buffer at revision 0.
    ///
    /// Queued blocks are sent, in order, ahead of the block passed to the
    /// next [`HttpConnection::insert`].
    pub fn write_data(&mut self, block: &Block) -> Result<()> {
        block
            .encode(&mut self.encoder, HTTP_REVISION)
            .map_err(Error::Encode)
    }

    /// Decode the next block of the bound response at revision 0.
    ///
    /// Returns `None` once the response is exhausted. The reader is detached
    /// at the end of the stream and after any error.
    pub async fn read_data(&mut self) -> Result<Option<Block>> {
        let bound = self.decoder.as_mut().ok_or_else(|| {
            Error::Decode(CodecError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no response stream is bound",
            )))
        })?;

        let result = tokio::select! {
            biased;
            _ = bound.cancel.cancelled() => Err(Error::Cancelled),
            block = Block::decode(&mut bound.reader, HTTP_REVISION) => block.map_err(Error::Decode),
        };

        if !matches!(result, Ok(Some(_))) {
            self.decoder = None;
        }
        result
    }

    /// Server-acknowledged asynchronous inserts are not available over HTTP.
    ///
    /// Always fails with [`Error::UnsupportedOperation`]; callers should fall
    /// back to a synchronous [`HttpConnection::insert`].
    pub async fn async_insert(&mut self, _ctx: &QueryContext, _query: &str, _wait: bool) -> Result<()> {
        Err(Error::UnsupportedOperation {
            operation: "async_insert",
        })
    }

    pub(crate) fn bind_decoder(&mut self, body: ResponseBody) {
        let (reader, cancel) = body.into_block_reader();
        self.decoder = Some(BoundReader { reader, cancel });
    }
}
