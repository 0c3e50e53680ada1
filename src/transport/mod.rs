//! HTTP transport: the pooled reqwest client a connection talks through.

pub mod http;

pub use http::HttpTransport;
