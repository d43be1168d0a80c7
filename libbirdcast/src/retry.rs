//! Bounded retry with exponential backoff
//!
//! [`with_retry`] runs an async operation up to `max_attempts` times. A
//! caller-supplied classifier decides, per error, whether to stop or which
//! backoff curve to use before the next attempt. No wait happens after the
//! final attempt.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::RetryConfig;
use crate::error::{ConfigError, PlatformError};

/// How a failed attempt should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Rate limited: aggressive backoff (`base * 3^attempt`)
    RateLimited,
    /// Platform-side failure: standard backoff (`base * 2^attempt`)
    ServerError,
    /// Anything else worth another try: standard backoff
    Transient,
    /// Do not retry
    Terminal,
}

/// Attempt count and delay bounds
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl TryFrom<&RetryConfig> for RetryPolicy {
    type Error = ConfigError;

    fn try_from(config: &RetryConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            max_attempts: config.max_attempts,
            base_delay: delay_from_secs("retry.base_delay_secs", config.base_delay_secs)?,
            max_delay: delay_from_secs("retry.max_delay_secs", config.max_delay_secs)?,
        })
    }
}

fn delay_from_secs(field: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("{} ({})", secs, e),
    })
}

impl RetryPolicy {
    /// Delay after a rate-limited attempt (zero-based)
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        self.scaled(3.0, attempt)
    }

    /// Delay after any other retryable attempt (zero-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.scaled(2.0, attempt)
    }

    /// Delay to wait after `attempt` failed with the given decision
    pub fn delay_for(&self, decision: RetryDecision, attempt: u32) -> Option<Duration> {
        match decision {
            RetryDecision::RateLimited => Some(self.rate_limit_delay(attempt)),
            RetryDecision::ServerError | RetryDecision::Transient => {
                Some(self.backoff_delay(attempt))
            }
            RetryDecision::Terminal => None,
        }
    }

    fn scaled(&self, factor: f64, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * factor.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Why [`with_retry`] gave up
#[derive(Debug, Error, PartialEq)]
pub enum RetryError<E: std::fmt::Display> {
    /// The classifier marked the error as not retryable
    #[error("{0}")]
    Terminal(E),

    /// Every attempt failed; holds the last error observed
    #[error("{last}")]
    Exhausted { attempts: u32, last: E },

    /// No attempt produced an error to report (zero attempts allowed)
    #[error("Unknown error after retries")]
    Unknown,
}

impl<E: std::fmt::Display> RetryError<E> {
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Terminal(e) | RetryError::Exhausted { last: e, .. } => Some(e),
            RetryError::Unknown => None,
        }
    }
}

/// Run `operation` under `policy`, classifying each failure with `classify`
///
/// The operation receives the zero-based attempt number.
pub async fn with_retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    classify: C,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryDecision,
{
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    info!("Succeeded on attempt {}/{}", attempt + 1, policy.max_attempts);
                }
                return Ok(value);
            }
            Err(e) => {
                let decision = classify(&e);
                let Some(delay) = policy.delay_for(decision, attempt) else {
                    return Err(RetryError::Terminal(e));
                };

                if attempt + 1 >= policy.max_attempts {
                    last_error = Some(e);
                    break;
                }

                warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    ?decision,
                    "Attempt failed: {}. Retrying in {:.1}s",
                    e,
                    delay.as_secs_f64()
                );
                last_error = Some(e);
                sleep(delay).await;
            }
        }
    }

    match last_error {
        Some(last) => {
            warn!("All {} attempts failed: {}", policy.max_attempts, last);
            Err(RetryError::Exhausted {
                attempts: policy.max_attempts,
                last,
            })
        }
        None => Err(RetryError::Unknown),
    }
}

/// Retry classification for the platform post call
pub fn classify_platform_error(error: &PlatformError) -> RetryDecision {
    match error {
        PlatformError::RateLimited(_) => RetryDecision::RateLimited,
        PlatformError::Server(_) => RetryDecision::ServerError,
        PlatformError::Other(_) => RetryDecision::Transient,
        PlatformError::Forbidden(_)
        | PlatformError::Unauthorized(_)
        | PlatformError::InvalidResponse(_) => RetryDecision::Terminal,
    }
}
