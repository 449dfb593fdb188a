//! Run-wide cancellation.
//!
//! A [`Cancellation`] is shared by every worker of a run. It trips at most
//! once, remembers the first cause it was given, and never resets.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    cause: Arc<OnceLock<String>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the signal.
    ///
    /// Returns `true` for the call that actually tripped it. Later causes
    /// are dropped.
    pub fn trip(&self, cause: impl Into<String>) -> bool {
        // The cause is stored before the token fires, so any observer of a
        // tripped token also sees a cause.
        let first = self.cause.set(cause.into()).is_ok();
        self.token.cancel();
        first
    }

    pub fn is_tripped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The cause given by the first `trip`.
    pub fn cause(&self) -> Option<&str> {
        self.cause.get().map(String::as_str)
    }

    /// Resolves once the signal has tripped.
    pub async fn tripped(&self) {
        self.token.cancelled().await
    }
}
