//! # clickhouse-http
//!
//! HTTP transport for a ClickHouse wire client.
//!
//! A connection dials an HTTP endpoint, learns the server time zone with a
//! handshake query, and then issues SQL as POST requests. Results stream back
//! as `Native`-format blocks decoded straight off the response body.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clickhouse_http::{HttpConnection, Options, QueryContext, QueryOptions};
//!
//! #[tokio::main]
//! async fn main() -> clickhouse_http::Result<()> {
//!     let ctx = QueryContext::new();
//!     let mut conn = HttpConnection::open(&ctx, "localhost:8123", 0, &Options::from_env()).await?;
//!     conn.ping(&ctx).await?;
//!
//!     let ctx = ctx.with_options(QueryOptions::new().with_query_id("numbers-1"));
//!     let mut rows = conn.query(&ctx, None, "SELECT number FROM system.numbers LIMIT 3").await?;
//!     while rows.next().await? {
//!         println!("{}", rows.get_u64(0)?);
//!     }
//!     drop(rows);
//!
//!     conn.close()
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Connection lifecycle, requests, responses, rows |
//! | [`codec`] | Native block encoder/decoder |
//! | [`config`] | Dial options and server settings |
//! | [`timezone`] | Server time zone resolution |
//! | [`transport`] | Pooled reqwest client |

pub mod client;
pub mod codec;
pub mod config;
pub mod timezone;
pub mod transport;

pub use client::{HttpConnection, QueryContext, QueryOptions, ReleaseFn, Rows};
pub use codec::{Block, ColumnData, ColumnType};
pub use config::{Options, SettingValue, Settings};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream of fallible items.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
