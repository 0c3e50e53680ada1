use crate::codec::{Block, BlockReader, BlockWriter};
use crate::config::Options;
use crate::timezone::{TimezoneResolver, TzDatabase};
use crate::transport::HttpTransport;
use crate::{Error, Result};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::context::QueryContext;
use super::request::build_endpoint;
use super::response::BodyReader;
use super::rows::{ReleaseFn, Rows};

/// Block reader attached to the response currently being consumed.
pub(crate) struct BoundReader {
    pub(crate) reader: BlockReader<BodyReader>,
    pub(crate) cancel: CancellationToken,
}

/// One logical client connection over HTTP.
///
/// The handle is meant for sequential use: every operation that touches the
/// wire takes `&mut self`, and a [`Rows`] cursor borrows the connection until
/// it is dropped. Closing is one-way; a closed handle reports
/// [`HttpConnection::is_bad`] and every exchange on it fails with
/// [`Error::ConnectionClosed`].
pub struct HttpConnection {
    id: usize,
    endpoint: Url,
    transport: Option<HttpTransport>,
    timezone: Option<Tz>,
    pub(crate) encoder: BlockWriter,
    pub(crate) decoder: Option<BoundReader>,
}

impl HttpConnection {
    /// Dial `addr` and resolve the server time zone.
    pub async fn open(ctx: &QueryContext, addr: &str, num: usize, options: &Options) -> Result<Self> {
        Self::open_with_resolver(ctx, addr, num, options, &TzDatabase).await
    }

    /// Dial with a custom time zone resolver.
    ///
    /// Runs `SELECT timeZone()` before returning. Any failure of that query,
    /// or of resolving a returned zone name, fails the dial. If several rows
    /// come back the last one wins; no rows leaves the zone unset.
    pub async fn open_with_resolver(
        ctx: &QueryContext,
        addr: &str,
        num: usize,
        options: &Options,
        resolver: &dyn TimezoneResolver,
    ) -> Result<Self> {
        options.validate().map_err(Error::connect)?;
        let endpoint =
            build_endpoint(&options.scheme, addr, &options.settings).map_err(Error::connect)?;
        let transport = HttpTransport::new(options).map_err(Error::connect)?;

        let mut conn = HttpConnection {
            id: num,
            endpoint,
            transport: Some(transport),
            timezone: None,
            encoder: BlockWriter::new(),
            decoder: None,
        };
        debug!(
            connection = num,
            endpoint = %conn.endpoint,
            "dialing clickhouse over http"
        );

        // Per-call options belong to the caller's queries, not the handshake.
        let handshake = QueryContext::new().with_cancellation(ctx.cancellation().clone());
        let mut timezone = None;
        {
            let release: ReleaseFn = Box::new(|_: Option<&Error>| {});
            let mut rows = conn
                .query(&handshake, Some(release), "SELECT timeZone()")
                .await
                .map_err(Error::connect)?;
            while rows.next().await.map_err(Error::connect)? {
                let name = rows.get_str(0).map_err(Error::connect)?;
                timezone = Some(resolver.resolve(name).map_err(Error::connect)?);
            }
        }
        conn.timezone = timezone;

        info!(
            connection = num,
            server_timezone = timezone.map(|tz| tz.name()).unwrap_or(""),
            "clickhouse http connection established"
        );
        Ok(conn)
    }

    /// True iff the transport is gone (closed).
    pub fn is_bad(&self) -> bool {
        self.transport.is_none()
    }

    /// `SELECT 1`; succeeds iff exactly one column named `1` comes back.
    pub async fn ping(&mut self, ctx: &QueryContext) -> Result<()> {
        let rows = self.query(ctx, None, "SELECT 1").await?;
        let columns = rows.columns().to_vec();
        drop(rows);

        if columns.len() == 1 && columns[0] == "1" {
            return Ok(());
        }
        Err(Error::Ping { columns })
    }

    /// Release idle pooled connections and mark the handle closed.
    ///
    /// Idempotent.
    pub fn close(&mut self) -> Result<()> {
        let Some(transport) = self.transport.take() else {
            return Ok(());
        };
        self.decoder = None;
        transport.close_idle_connections();
        debug!(connection = self.id, "clickhouse http connection closed");
        Ok(())
    }

    /// Run `sql` and stream its result blocks.
    ///
    /// The first block is read eagerly so column names are known.
    /// `release` is called once, with the terminal error if any, when the
    /// rows are exhausted, fail, or are dropped; a failing query calls it
    /// immediately.
    pub async fn query(
        &mut self,
        ctx: &QueryContext,
        release: Option<ReleaseFn>,
        sql: &str,
    ) -> Result<Rows<'_>> {
        let first = match self.start_query(ctx, sql).await {
            Ok(first) => first,
            Err(e) => {
                if let Some(release) = release {
                    release(Some(&e));
                }
                return Err(e);
            }
        };
        Ok(Rows::new(self, first, release))
    }

    async fn start_query(&mut self, ctx: &QueryContext, sql: &str) -> Result<Option<Block>> {
        let request = self.prepare_request(ctx, sql.to_string(), ctx.options())?;
        let body = self.execute_request(request).await?;
        self.bind_decoder(body);
        self.read_data().await
    }

    /// Run a statement that returns no rows; the response is drained.
    pub async fn exec(&mut self, ctx: &QueryContext, sql: &str) -> Result<()> {
        let request = self.prepare_request(ctx, sql.to_string(), ctx.options())?;
        let drained = self.execute_request(request).await?.drain().await?;
        debug!(connection = self.id, bytes = drained, "clickhouse exec finished");
        Ok(())
    }

    /// Insert `block` after any blocks already queued with
    /// [`HttpConnection::write_data`].
    ///
    /// The outbound buffer is flushed into the request body and left empty,
    /// whether or not the request succeeds. The statement travels in the
    /// `query` parameter with a `FORMAT Native` clause appended unless one is
    /// present.
    pub async fn insert(&mut self, ctx: &QueryContext, sql: &str, block: &Block) -> Result<()> {
        self.write_data(block)?;
        let payload = self.encoder.take();

        let options = ctx
            .options()
            .cloned()
            .unwrap_or_default()
            .with_setting("query", insert_statement(sql));
        let request = self.prepare_request(ctx, payload, Some(&options))?;
        self.execute_request(request).await?.drain().await?;
        debug!(
            connection = self.id,
            rows = block.rows(),
            "clickhouse insert finished"
        );
        Ok(())
    }

    pub fn connection_id(&self) -> usize {
        self.id
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Zone reported by the server during the handshake.
    pub fn server_timezone(&self) -> Option<Tz> {
        self.timezone
    }

    pub(crate) fn transport(&self) -> Option<&HttpTransport> {
        self.transport.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn closed(endpoint: Url) -> Self {
        HttpConnection {
            id: 0,
            endpoint,
            transport: None,
            timezone: None,
            encoder: BlockWriter::new(),
            decoder: None,
        }
    }
}

fn insert_statement(sql: &str) -> String {
    let sql = sql.trim().trim_end_matches(';').trim_end();
    let has_format = sql
        .split_whitespace()
        .any(|word| word.eq_ignore_ascii_case("FORMAT"));
    if has_format {
        sql.to_string()
    } else {
        format!("{} FORMAT Native", sql)
    }
}
