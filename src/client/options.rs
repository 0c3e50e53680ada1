use crate::config::{SettingValue, Settings};

/// Request-scoped parameters merged into the URL of a single request.
///
/// A `default_format` entry in `settings` is ignored when the request is
/// built; the connection's format always wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    query_id: String,
    quota_key: String,
    settings: Settings,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_id(mut self, id: impl Into<String>) -> Self {
        self.query_id = id.into();
        self
    }

    pub fn with_quota_key(mut self, key: impl Into<String>) -> Self {
        self.quota_key = key.into();
        self
    }

    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings.extend(settings);
        self
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn quota_key(&self) -> &str {
        &self.quota_key
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
