//! Bounded refresh-and-retry loop around single Remedy operations.

use crate::config::{Diagnostics, RemedyConfig};
use crate::error::RemedyError;
use crate::session::AuthSession;

/// How a failed attempt should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retrying with the same arguments cannot change the outcome.
    Fatal,

    /// Worth refreshing the credential and trying again.
    RefreshAndRetry,
}

/// Classifies an error for the retry loop.
///
/// Deliberately coarse: transport and parse failures are treated like
/// authentication failures even when the root cause is elsewhere, since
/// the upstream often answers a stale token with an opaque error and a
/// refresh cycle is cheap. Lookups that found nothing are the exception;
/// repeating the same query cannot change the answer.
#[must_use]
pub fn classify(error: &RemedyError) -> FailureClass {
    match error {
        RemedyError::NotFound { .. }
        | RemedyError::Token(_)
        | RemedyError::Exhausted { .. } => FailureClass::Fatal,
        RemedyError::Auth { .. }
        | RemedyError::Api { .. }
        | RemedyError::Transport(_)
        | RemedyError::Parse { .. } => FailureClass::RefreshAndRetry,
    }
}

/// Drives one logical operation through a fixed attempt budget,
/// refreshing the credential after every retryable failure.
///
/// The operation re-reads the token store on each attempt, so a refresh
/// performed here (or by a sibling process holding the refresh lock) is
/// picked up on the next pass without any shared in-memory state.
pub struct RetryOrchestrator {
    session: AuthSession,
}

impl RetryOrchestrator {
    /// Creates an orchestrator that refreshes through `session`.
    #[must_use]
    pub fn new(session: AuthSession) -> Self {
        Self { session }
    }

    /// Runs `operation` until it succeeds or the attempt budget is
    /// spent.
    ///
    /// A fatal failure is surfaced immediately. Every retryable failure
    /// is followed by a refresh, including the last one; the refreshed
    /// credential then serves whichever invocation runs next.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error when it is fatal, and
    /// [`RemedyError::Exhausted`] with the accumulated attempt failures
    /// once the budget is spent.
    pub fn run<T>(
        &self,
        label: &str,
        config: &RemedyConfig,
        diagnostics: &mut Diagnostics,
        operation: impl Fn() -> Result<T, RemedyError>,
    ) -> Result<T, RemedyError> {
        let attempts = config.retry_attempts.max(1);
        let mut failures: Vec<String> = Vec::new();

        for attempt in 1..=attempts {
            match operation() {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if classify(&error) == FailureClass::Fatal {
                        return Err(error);
                    }
                    tracing::warn!(
                        label,
                        attempt,
                        error = %error,
                        "attempt failed, refreshing credential"
                    );
                    failures.push(format!("attempt {attempt}: {error}"));
                    let refreshed = self.session.refresh(config, diagnostics)?;
                    if !refreshed {
                        tracing::debug!(label, "refresh deferred to a concurrent holder");
                    }
                },
            }
        }

        let mut detail = failures.join("; ");
        if !diagnostics.is_empty() {
            detail = format!("{detail} ({})", diagnostics.summary());
        }
        Err(RemedyError::Exhausted { attempts, detail })
    }
}
