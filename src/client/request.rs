//! Request construction: endpoint URL and per-call parameter merging.

use crate::config::{Settings, DEFAULT_FORMAT, DEFAULT_FORMAT_PARAM, QUERY_ID_PARAM, QUOTA_KEY_PARAM};
use crate::{Error, Result};
use reqwest::Method;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::connection::HttpConnection;
use super::context::QueryContext;
use super::options::QueryOptions;

/// An outbound request bound to the cancellation token of its call.
#[derive(Debug)]
pub struct PreparedRequest {
    pub(crate) request: reqwest::Request,
    pub(crate) cancel: CancellationToken,
}

impl PreparedRequest {
    pub fn url(&self) -> &Url {
        self.request.url()
    }

    /// Decoded URL parameters, keyed by name.
    pub fn params(&self) -> BTreeMap<String, String> {
        self.request.url().query_pairs().into_owned().collect()
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }
}

/// `scheme://addr/?<settings>&default_format=Native`, parameters sorted by name.
pub(crate) fn build_endpoint(scheme: &str, addr: &str, settings: &Settings) -> Result<Url> {
    let mut url = Url::parse(&format!("{}://{}", scheme, addr))
        .map_err(|e| Error::Request(format!("invalid endpoint {}://{}: {}", scheme, addr, e)))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(Error::Request(format!(
            "invalid endpoint {}://{}: missing host",
            scheme, addr
        )));
    }

    let mut params: BTreeMap<String, String> = settings
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect();
    params.insert(DEFAULT_FORMAT_PARAM.to_string(), DEFAULT_FORMAT.to_string());
    url.query_pairs_mut().clear().extend_pairs(params.iter());
    Ok(url)
}

impl HttpConnection {
    /// Build a POST to the endpoint with `body` as payload.
    ///
    /// With `options`, the endpoint's parameters are overlaid in order with
    /// `query_id`, `quota_key` (each only when non-empty) and then every
    /// setting, except `default_format`, which is skipped.
    pub fn prepare_request(
        &self,
        ctx: &QueryContext,
        body: impl Into<reqwest::Body>,
        options: Option<&QueryOptions>,
    ) -> Result<PreparedRequest> {
        let mut request = reqwest::Request::new(Method::POST, self.endpoint().clone());
        *request.body_mut() = Some(body.into());

        if let Some(options) = options {
            let mut params: BTreeMap<String, String> =
                request.url().query_pairs().into_owned().collect();
            if !options.query_id().is_empty() {
                params.insert(QUERY_ID_PARAM.to_string(), options.query_id().to_string());
            }
            if !options.quota_key().is_empty() {
                params.insert(QUOTA_KEY_PARAM.to_string(), options.quota_key().to_string());
            }
            for (key, value) in options.settings() {
                // the connection owns the response format
                if key == DEFAULT_FORMAT_PARAM {
                    continue;
                }
                params.insert(key.clone(), value.to_string());
            }
            request
                .url_mut()
                .query_pairs_mut()
                .clear()
                .extend_pairs(params.iter());
        }

        Ok(PreparedRequest {
            request,
            cancel: ctx.cancellation().clone(),
        })
    }
}
