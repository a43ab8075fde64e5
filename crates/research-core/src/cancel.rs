//! Suspension-point guard
//!
//! The workflow suspends in two places only: waiting on the generation
//! backend and waiting on the human. Both go through [`Interrupt::guard`],
//! which races the future against the cancellation token and an optional
//! per-suspension timeout.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{CancelReason, ResearchError};

/// Cancellation handle shared by the components of one workflow instance
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    token: CancellationToken,
    timeout: Option<Duration>,
}

impl Interrupt {
    /// Create interrupt with a fresh token and no timeout
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With caller-supplied token
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// With timeout applied to every suspension point
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Token observed by this interrupt
    #[inline]
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run a suspension point under cancellation and timeout
    ///
    /// # Errors
    /// - `ResearchError::Cancelled` on signal or timeout
    /// - The future's own error otherwise
    pub async fn guard<T, E, F>(&self, fut: F) -> Result<T, ResearchError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ResearchError>,
    {
        if self.token.is_cancelled() {
            return Err(ResearchError::Cancelled(CancelReason::Signal));
        }

        let bounded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(result) => result.map_err(Into::into),
                    Err(_) => Err(ResearchError::Cancelled(CancelReason::Timeout(limit))),
                },
                None => fut.await.map_err(Into::into),
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => {
                tracing::debug!("suspension point cancelled");
                Err(ResearchError::Cancelled(CancelReason::Signal))
            }
            result = bounded => result,
        }
    }
}
