use super::options::QueryOptions;
use tokio_util::sync::CancellationToken;

/// Per-call context: a cancellation token plus optional query options.
///
/// Cancelling the token aborts a pending exchange or block read on the
/// connection that is serving the call.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    cancel: CancellationToken,
    options: Option<QueryOptions>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Share cancellation with an existing token (e.g. a parent task's).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> Option<&QueryOptions> {
        self.options.as_ref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
