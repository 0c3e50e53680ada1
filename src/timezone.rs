//! Server time zone resolution.

use crate::{Error, Result};
use chrono_tz::Tz;

/// Maps a zone name reported by the server to a location.
pub trait TimezoneResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Tz>;
}

/// Resolver backed by the IANA database compiled into `chrono-tz`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TzDatabase;

impl TimezoneResolver for TzDatabase {
    fn resolve(&self, name: &str) -> Result<Tz> {
        name.trim().parse::<Tz>().map_err(|reason| Error::Timezone {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    }
}
