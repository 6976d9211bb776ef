//! Session-scoped failed-login counter.
//!
//! The lockout is deliberately per-session: after the configured number of
//! consecutive failures, further login attempts are refused before any
//! credential lookup, until the explicit reset action. The counter lives in
//! the session store, lazily initialized on first use; the increment is a
//! read-modify-write within a single request, which the session layer
//! serializes.

use tower_sessions::Session;

use super::ApiError;

const ATTEMPTS_KEY: &str = "authentication_attempts";

pub struct FailedAttempts<'a> {
    session: &'a Session,
}

impl<'a> FailedAttempts<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn count(&self) -> Result<u32, ApiError> {
        let count = self
            .session
            .get::<u32>(ATTEMPTS_KEY)
            .await
            .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
            .unwrap_or(0);

        Ok(count)
    }

    /// Increment the counter and return the new value.
    pub async fn record_failure(&self) -> Result<u32, ApiError> {
        let count = self.count().await? + 1;

        self.session
            .insert(ATTEMPTS_KEY, count)
            .await
            .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

        Ok(count)
    }

    pub async fn is_locked(&self, threshold: u32) -> Result<bool, ApiError> {
        Ok(self.count().await? >= threshold)
    }

    /// Zero the counter. Reached from the explicit reset action and from a
    /// successful login.
    pub async fn reset(&self) -> Result<(), ApiError> {
        self.session
            .insert(ATTEMPTS_KEY, 0u32)
            .await
            .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

        Ok(())
    }
}
