//! Mock ClickHouse HTTP endpoint for integration tests

use clickhouse_http::codec::{BlockWriter, HTTP_REVISION};
use clickhouse_http::{Block, ColumnData, HttpConnection, Options, QueryContext};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub addr: String,
}

/// Encode blocks exactly as the server would send them.
pub fn native_body(blocks: &[Block]) -> Vec<u8> {
    let mut w = BlockWriter::new();
    for block in blocks {
        block.encode(&mut w, HTTP_REVISION).expect("encode block");
    }
    w.take().to_vec()
}

pub fn string_block(column: &str, values: &[&str]) -> Block {
    let mut block = Block::new();
    block
        .add_column(
            column,
            ColumnData::String(values.iter().map(|v| v.to_string()).collect()),
        )
        .expect("string column");
    block
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let addr = server.host_with_port();
        Self {
            server: Arc::new(Mutex::new(server)),
            addr,
        }
    }

    /// Answer the dial handshake with one row per zone name.
    pub async fn mock_handshake(&self, zones: &[&str]) -> Mock {
        let body = if zones.is_empty() {
            Vec::new()
        } else {
            native_body(&[string_block("timeZone()", zones)])
        };
        self.mock_query("SELECT timeZone()", 200, body).await
    }

    /// Answer a POST whose body is exactly `sql`.
    pub async fn mock_query(&self, sql: &str, status: usize, body: Vec<u8>) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/")
            .match_query(Matcher::UrlEncoded(
                "default_format".into(),
                "Native".into(),
            ))
            .match_body(sql)
            .with_status(status)
            .with_body(body)
            .create_async()
            .await
    }

    /// Like [`Self::mock_query`] with an empty 200 body, expected `hits` times.
    pub async fn mock_query_expecting(&self, sql: &str, hits: usize) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/")
            .match_body(sql)
            .with_status(200)
            .expect(hits)
            .create_async()
            .await
    }

    /// Answer a POST carrying the given URL parameters, whatever the body.
    pub async fn mock_params(&self, params: &[(&str, &str)], status: usize, body: Vec<u8>) -> Mock {
        let matchers = params
            .iter()
            .map(|(k, v)| Matcher::UrlEncoded(k.to_string(), v.to_string()))
            .collect();
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/")
            .match_query(Matcher::AllOf(matchers))
            .with_status(status)
            .with_body(body)
            .create_async()
            .await
    }

    /// Answer a POST carrying the given URL parameters and exactly `body`.
    pub async fn mock_params_with_body(
        &self,
        params: &[(&str, &str)],
        body: Vec<u8>,
        status: usize,
    ) -> Mock {
        let matchers = params
            .iter()
            .map(|(k, v)| Matcher::UrlEncoded(k.to_string(), v.to_string()))
            .collect();
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/")
            .match_query(Matcher::AllOf(matchers))
            .match_body(Matcher::from(body))
            .with_status(status)
            .create_async()
            .await
    }

    /// Answer `sql` with `status`, sending `head` at once and `tail` only
    /// after `stall`.
    pub async fn mock_stalled_body(
        &self,
        sql: &str,
        status: usize,
        head: &'static str,
        tail: &'static str,
        stall: Duration,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/")
            .match_query(Matcher::UrlEncoded(
                "default_format".into(),
                "Native".into(),
            ))
            .match_body(sql)
            .with_status(status)
            .with_chunked_body(move |w| {
                w.write_all(head.as_bytes())?;
                w.flush()?;
                std::thread::sleep(stall);
                w.write_all(tail.as_bytes())
            })
            .create_async()
            .await
    }

    pub async fn dial(&self) -> clickhouse_http::Result<HttpConnection> {
        self.dial_with(&Options::default()).await
    }

    pub async fn dial_with(&self, options: &Options) -> clickhouse_http::Result<HttpConnection> {
        HttpConnection::open(&QueryContext::new(), &self.addr, 1, options).await
    }
}
