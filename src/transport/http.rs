use crate::config::Options;
use crate::{Error, ErrorContext, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Pooled HTTP client for one logical connection.
///
/// Connections to the endpoint are reused by reqwest; at most one idle
/// connection is kept per host.
pub struct HttpTransport {
    client: reqwest::Client,
    header_timeout: Duration,
}

impl HttpTransport {
    pub fn new(options: &Options) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(options.dial_timeout)
            .tcp_keepalive(Some(options.conn_max_lifetime))
            .pool_max_idle_per_host(1)
            .pool_idle_timeout(Some(options.conn_max_lifetime));

        if let Some(tls) = &options.tls {
            builder = builder.use_preconfigured_tls(tls.as_ref().clone());
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                "failed to build HTTP client",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("http_transport"),
            )
        })?;

        Ok(Self {
            client,
            header_timeout: options.read_timeout,
        })
    }

    /// Send a request and wait for the response headers.
    ///
    /// The body is left unread. Cancelling `cancel` or exceeding the
    /// response-header timeout aborts the exchange.
    pub async fn send(
        &self,
        request: reqwest::Request,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            res = tokio::time::timeout(self.header_timeout, self.client.execute(request)) => match res {
                Err(_) => Err(Error::ResponseTimeout(self.header_timeout)),
                Ok(Err(e)) => Err(Error::Network(e)),
                Ok(Ok(resp)) => Ok(resp),
            },
        }
    }

    /// Release pooled idle connections.
    ///
    /// Consumes the transport; sockets close once in-flight bodies that still
    /// reference the pool are dropped.
    pub fn close_idle_connections(self) {
        debug!(
            header_timeout_ms = self.header_timeout.as_millis() as u64,
            "releasing idle HTTP connections"
        );
        drop(self.client);
    }
}
