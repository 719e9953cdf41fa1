//! Cancellable progress handle threaded through every remote call.

use crate::{Error, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Cancellation handle passed to runners, synchronizers and fetch providers.
///
/// Cloning shares the same cancellation state. [`ProgressIndicator::child`]
/// creates a handle that is cancelled with its parent but can also be
/// cancelled on its own.
#[derive(Debug, Clone, Default)]
pub struct ProgressIndicator {
    token: CancellationToken,
}

impl ProgressIndicator {
    /// Create a fresh, uncancelled indicator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token.
    #[must_use]
    pub const fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Child indicator cancelled together with this one.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when the indicator is cancelled.
    pub fn check_canceled(&self) -> Result<()> {
        if self.is_canceled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run `fut`, abandoning it as soon as the indicator is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if cancelled before or while `fut` runs,
    /// otherwise the result of `fut`.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check_canceled()?;
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Error::Cancelled),
            result = fut => result,
        }
    }

    /// Underlying token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}
