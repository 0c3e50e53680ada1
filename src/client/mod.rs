//! HTTP connection: lifecycle, request building, response classification
//! and block streaming.

mod blocks;
mod connection;
mod context;
mod options;
mod request;
mod response;
mod rows;

pub use connection::HttpConnection;
pub use context::QueryContext;
pub use options::QueryOptions;
pub use request::PreparedRequest;
pub use response::{read_response, ResponseBody};
pub use rows::{ReleaseFn, Rows};
