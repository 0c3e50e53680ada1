//! Response classification and body draining.

use crate::codec::BlockReader;
use crate::config::QUERY_ID_PARAM;
use crate::{BoxStream, Error, Result};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::StatusCode;
use std::pin::Pin;
use std::time::Instant;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::connection::HttpConnection;
use super::request::PreparedRequest;

// Content-Length is advisory; never reserve more than this up front.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

pub(crate) type BodyReader =
    StreamReader<Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>, Bytes>;

/// Live, unread body of a successful response.
pub struct ResponseBody {
    stream: BoxStream<'static, Bytes>,
    cancel: CancellationToken,
}

impl ResponseBody {
    fn new(response: reqwest::Response, cancel: CancellationToken) -> Self {
        Self {
            stream: Box::pin(response.bytes_stream().map_err(Error::Read)),
            cancel,
        }
    }

    pub fn into_stream(self) -> BoxStream<'static, Bytes> {
        self.stream
    }

    /// Read the rest of the body and discard it.
    pub async fn drain(mut self) -> Result<u64> {
        let mut total = 0u64;
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                next = self.stream.next() => next,
            };
            match next {
                Some(chunk) => total += chunk?.len() as u64,
                None => return Ok(total),
            }
        }
    }

    pub(crate) fn into_block_reader(self) -> (BlockReader<BodyReader>, CancellationToken) {
        let io_stream: Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>> = Box::pin(
            self.stream
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        );
        (BlockReader::new(StreamReader::new(io_stream)), self.cancel)
    }
}

/// Drain a response body into memory.
///
/// The buffer is pre-sized from a positive Content-Length. The response is
/// consumed, so its body is released whether draining succeeds or not.
pub async fn read_response(mut response: reqwest::Response) -> Result<Bytes> {
    let mut buf = match response.content_length() {
        Some(len) if len > 0 => BytesMut::with_capacity(len.min(MAX_PREALLOC) as usize),
        _ => BytesMut::new(),
    };
    while let Some(chunk) = response.chunk().await.map_err(Error::Read)? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

impl HttpConnection {
    /// Run the exchange and classify the response.
    ///
    /// Fails with [`Error::ConnectionClosed`] without any I/O when the
    /// connection has been closed. A non-200 status becomes
    /// [`Error::Server`] carrying the status and the body verbatim. The
    /// call's cancellation token is honoured while that body is read.
    pub async fn execute_request(&self, prepared: PreparedRequest) -> Result<ResponseBody> {
        let transport = self.transport().ok_or(Error::ConnectionClosed)?;
        let PreparedRequest { request, cancel } = prepared;
        let query_id = request
            .url()
            .query_pairs()
            .find(|(k, _)| k == QUERY_ID_PARAM)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();

        let start = Instant::now();
        let response = match transport.send(request, &cancel).await {
            Ok(response) => response,
            Err(e) => {
                info!(
                    connection = self.connection_id(),
                    query_id = query_id.as_str(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "clickhouse http exchange failed"
                );
                return Err(e);
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                body = read_response(response) => body?,
            };
            info!(
                connection = self.connection_id(),
                http_status = status.as_u16(),
                query_id = query_id.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                "clickhouse http request failed"
            );
            return Err(Error::Server {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        debug!(
            connection = self.connection_id(),
            http_status = status.as_u16(),
            query_id = query_id.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            "clickhouse http request started streaming"
        );
        Ok(ResponseBody::new(response, cancel))
    }
}
