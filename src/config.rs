//! Connection configuration.
//!
//! [`Options`] is what a dial needs: scheme, server-side settings baked into
//! the endpoint, transport timeouts and an optional TLS client config.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// URL parameter that selects the response format.
pub const DEFAULT_FORMAT_PARAM: &str = "default_format";
/// The only format this transport can decode.
pub const DEFAULT_FORMAT: &str = "Native";
pub const QUERY_ID_PARAM: &str = "query_id";
pub const QUOTA_KEY_PARAM: &str = "quota_key";

/// A server setting value; rendered with `Display` into URL parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(v) => write!(f, "{}", v),
            SettingValue::Int(v) => write!(f, "{}", v),
            SettingValue::UInt(v) => write!(f, "{}", v),
            SettingValue::Float(v) => write!(f, "{}", v),
            SettingValue::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        SettingValue::Int(v.into())
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<u32> for SettingValue {
    fn from(v: u32) -> Self {
        SettingValue::UInt(v.into())
    }
}

impl From<u64> for SettingValue {
    fn from(v: u64) -> Self {
        SettingValue::UInt(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Float(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::String(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::String(v)
    }
}

/// Setting name to value; names are unique.
pub type Settings = BTreeMap<String, SettingValue>;

/// Dial options for an HTTP connection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// `http` or `https`.
    pub scheme: String,
    /// Settings copied into every request's URL.
    pub settings: Settings,
    /// TCP connect timeout.
    #[serde(with = "millis", rename = "dial_timeout_ms")]
    pub dial_timeout: Duration,
    /// Keep-alive interval and pooled idle-connection lifetime.
    #[serde(with = "millis", rename = "conn_max_lifetime_ms")]
    pub conn_max_lifetime: Duration,
    /// How long to wait for response headers.
    #[serde(with = "millis", rename = "read_timeout_ms")]
    pub read_timeout: Duration,
    /// Client TLS configuration, built by the caller.
    #[serde(skip)]
    pub tls: Option<Arc<rustls::ClientConfig>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            settings: Settings::new(),
            dial_timeout: Duration::from_secs(30),
            conn_max_lifetime: Duration::from_secs(3600),
            read_timeout: Duration::from_secs(300),
            tls: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("scheme", &self.scheme)
            .field("settings", &self.settings)
            .field("dial_timeout", &self.dial_timeout)
            .field("conn_max_lifetime", &self.conn_max_lifetime)
            .field("read_timeout", &self.read_timeout)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

impl Options {
    /// Defaults overlaid with `CLICKHOUSE_HTTP_*` environment variables.
    ///
    /// - `CLICKHOUSE_HTTP_SCHEME`
    /// - `CLICKHOUSE_HTTP_DIAL_TIMEOUT_MS`
    /// - `CLICKHOUSE_HTTP_CONN_MAX_LIFETIME_SECS`
    /// - `CLICKHOUSE_HTTP_READ_TIMEOUT_SECS`
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut opts = Options::default();
        if let Ok(scheme) = env::var("CLICKHOUSE_HTTP_SCHEME") {
            let scheme = scheme.trim();
            if !scheme.is_empty() {
                opts.scheme = scheme.to_ascii_lowercase();
            }
        }
        if let Some(ms) = env_u64("CLICKHOUSE_HTTP_DIAL_TIMEOUT_MS") {
            opts.dial_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = env_u64("CLICKHOUSE_HTTP_CONN_MAX_LIFETIME_SECS") {
            opts.conn_max_lifetime = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("CLICKHOUSE_HTTP_READ_TIMEOUT_SECS") {
            opts.read_timeout = Duration::from_secs(secs);
        }
        opts
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    pub fn with_tls(mut self, tls: Arc<rustls::ClientConfig>) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheme != "http" && self.scheme != "https" {
            return Err(Error::configuration_with_context(
                "unsupported scheme",
                ErrorContext::new()
                    .with_field_path("options.scheme")
                    .with_details(self.scheme.clone()),
            ));
        }
        for (field, value) in [
            ("options.dial_timeout", self.dial_timeout),
            ("options.conn_max_lifetime", self.conn_max_lifetime),
            ("options.read_timeout", self.read_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::configuration_with_context(
                    "timeout must be positive",
                    ErrorContext::new().with_field_path(field),
                ));
            }
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
