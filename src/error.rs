use crate::codec::CodecError;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for configuration and scanning failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Option or column that caused the error (e.g., "options.scheme", "rows[0]")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "options_from_env", "rows_scan")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the HTTP transport.
///
/// Every failure is returned to the caller; nothing here is retried or
/// suppressed. Reconnect logic upstream should dispatch on
/// [`Error::is_bad_connection`] rather than on message text.
#[derive(Debug, Error)]
pub enum Error {
    #[error("clickhouse [dial]:: {source}")]
    Connect {
        #[source]
        source: Box<Error>,
    },

    #[error("clickhouse [ping]:: cannot ping clickhouse (columns: {columns:?})")]
    Ping { columns: Vec<String> },

    #[error("clickhouse [execute]:: connection is closed")]
    ConnectionClosed,

    #[error("clickhouse [execute]:: network transport error: {0}")]
    Network(#[source] reqwest::Error),

    /// Network-class failure: the server sent no response headers within the
    /// configured read timeout. Kept apart from [`Error::Network`] so the
    /// limit can be reported; [`Error::is_network`] covers both.
    #[error("clickhouse [execute]:: no response headers within {0:?}")]
    ResponseTimeout(Duration),

    #[error("clickhouse [execute]:: request cancelled")]
    Cancelled,

    #[error("clickhouse [execute]:: {status} code: {body}")]
    Server { status: u16, body: String },

    #[error("clickhouse [execute]:: failed to read the response: {0}")]
    Read(#[source] reqwest::Error),

    #[error("clickhouse [prepare]:: invalid request: {0}")]
    Request(String),

    #[error("clickhouse [write]:: {0}")]
    Encode(#[source] CodecError),

    #[error("clickhouse [read]:: {0}")]
    Decode(#[source] CodecError),

    #[error("clickhouse [{operation}]:: HTTP: not supported")]
    UnsupportedOperation { operation: &'static str },

    #[error("clickhouse [timezone]:: cannot load location {name:?}: {reason}")]
    Timezone { name: String, reason: String },

    #[error("clickhouse [scan]:: {message}{}", format_context(.context))]
    Scan {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Wrap a handshake or dial failure.
    pub fn connect(source: Error) -> Self {
        Error::Connect {
            source: Box::new(source),
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn scan_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Scan {
            message: msg.into(),
            context,
        }
    }

    /// True when the handle has no live transport and the caller should
    /// discard it and dial again.
    pub fn is_bad_connection(&self) -> bool {
        match self {
            Error::ConnectionClosed => true,
            Error::Connect { source } => source.is_bad_connection(),
            _ => false,
        }
    }

    /// True for transport-level failures, response-header timeouts included.
    pub fn is_network(&self) -> bool {
        match self {
            Error::Network(_) | Error::ResponseTimeout(_) => true,
            Error::Connect { source } => source.is_network(),
            _ => false,
        }
    }

    /// HTTP status of a server-reported failure, looking through `Connect`.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } => Some(*status),
            Error::Connect { source } => source.status_code(),
            _ => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Scan { context, .. } => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_carries_status_and_body() {
        let err = Error::Server {
            status: 500,
            body: "syntax error".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("syntax error"));
        assert_eq!(err.status_code(), Some(500));
    }

    #[test]
    fn bad_connection_is_structural() {
        assert!(Error::ConnectionClosed.is_bad_connection());
        assert!(Error::connect(Error::ConnectionClosed).is_bad_connection());
        assert!(!Error::Cancelled.is_bad_connection());
        assert!(!Error::Server {
            status: 503,
            body: "connection is closed".into()
        }
        .is_bad_connection());
    }

    #[test]
    fn response_timeout_is_a_network_failure() {
        let err = Error::ResponseTimeout(Duration::from_secs(300));
        assert!(err.is_network());
        assert!(Error::connect(Error::ResponseTimeout(Duration::from_millis(5))).is_network());
        assert!(!err.is_bad_connection());
        assert!(!Error::Cancelled.is_network());
        assert!(!Error::Server {
            status: 504,
            body: "timeout".into()
        }
        .is_network());
    }

    #[test]
    fn context_is_rendered() {
        let err = Error::configuration_with_context(
            "unsupported scheme",
            ErrorContext::new()
                .with_field_path("options.scheme")
                .with_details("ftp"),
        );
        assert_eq!(
            err.to_string(),
            "Configuration error: unsupported scheme (field: options.scheme, details: ftp)"
        );
        assert!(err.context().is_some());
    }
}
