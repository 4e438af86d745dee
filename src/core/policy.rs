//! Pluggable resilience policies wrapped around a single HTTP exchange.
//!
//! A policy is middleware: it receives a [`Next`] handle and decides whether,
//! when and how often to run it. Policies never see request bodies or routes,
//! only the outcome of the exchange.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;

/// Failure of one HTTP exchange before a response was received.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("Circuit is open, calls are blocked for another {remaining:?}")]
    CircuitOpen { remaining: Duration },

    #[error("Circuit is half-open, waiting for the trial call to finish")]
    TrialInFlight,
}

pub type TransportResult = Result<reqwest::Response, TransportError>;

/// One HTTP exchange. Each call builds and sends a fresh request.
pub type Attempt<'a> = dyn Fn() -> BoxFuture<'static, TransportResult> + Send + Sync + 'a;

/// A decorator around the HTTP exchange, e.g. retry or circuit breaking.
pub trait TransportPolicy: Send + Sync {
    fn handle<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, TransportResult>;
}

/// The rest of the policy chain, ending in the actual exchange.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    policies: &'a [Arc<dyn TransportPolicy>],
    attempt: &'a Attempt<'a>,
}

impl<'a> Next<'a> {
    pub fn new(policies: &'a [Arc<dyn TransportPolicy>], attempt: &'a Attempt<'a>) -> Self {
        Self { policies, attempt }
    }

    pub fn run(self) -> BoxFuture<'a, TransportResult> {
        match self.policies.split_first() {
            Some((policy, rest)) => policy.handle(Next {
                policies: rest,
                attempt: self.attempt,
            }),
            None => (self.attempt)(),
        }
    }
}

/// Statuses worth retrying or counting against a circuit: 408, 429 and 5xx.
pub fn is_transient(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Builder errors fail the same way on every attempt and never reach the
/// wire, so only exchange failures and transient statuses count.
fn is_transient_outcome(outcome: &TransportResult) -> bool {
    match outcome {
        Ok(response) => is_transient(response.status()),
        Err(TransportError::Request(e)) => !e.is_builder(),
        Err(TransportError::CircuitOpen { .. } | TransportError::TrialInFlight) => false,
    }
}

/// Retries transport errors and transient statuses with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Base duration for exponential backoff
    pub initial_retry_delay: Duration,
    /// Cap on the backoff duration
    pub max_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_retry_delay: Duration, max_retry_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_retry_delay,
            max_retry_delay,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_retry_delay.as_millis() as f64 * 2_f64.powi(attempt as i32);

        // +/- 10% jitter (0.9 to 1.1)
        let jitter_factor = rand::random::<f64>() * 0.2 + 0.9;
        let delay_ms = (base_delay * jitter_factor) as u64;

        Duration::from_millis(delay_ms).min(self.max_retry_delay)
    }
}

impl TransportPolicy for RetryPolicy {
    fn handle<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, TransportResult> {
        Box::pin(async move {
            let mut attempt = 0;
            loop {
                let outcome = next.run().await;

                if attempt >= self.max_retries || !is_transient_outcome(&outcome) {
                    return outcome;
                }

                let delay = self.delay_for(attempt);
                match &outcome {
                    Ok(response) => {
                        debug!(attempt, status = %response.status(), ?delay, "Transient status, retrying")
                    }
                    Err(e) => debug!(attempt, error = %e, ?delay, "Transport failure, retrying"),
                }

                // Release the connection before sleeping.
                drop(outcome);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open { until: Instant },
    /// The break elapsed; one trial call decides whether to close again.
    HalfOpen { trial_in_flight: bool },
}

#[derive(Debug)]
struct Breaker {
    state: CircuitState,
    consecutive_failures: u32,
}

/// Blocks calls for a while after too many consecutive transient failures.
#[derive(Debug)]
pub struct CircuitBreakerPolicy {
    failure_threshold: u32,
    break_duration: Duration,
    breaker: Mutex<Breaker>,
}

/// Admission of one call. Dropping an unrecorded trial lets the next caller
/// run the trial instead.
struct Permit<'a> {
    policy: &'a CircuitBreakerPolicy,
    trial: bool,
}

impl Permit<'_> {
    fn record(mut self, failed: bool) {
        self.trial = false;
        self.policy.record(failed);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.trial {
            self.policy.abandon_trial();
        }
    }
}

impl CircuitBreakerPolicy {
    pub fn new(failure_threshold: u32, break_duration: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            break_duration,
            breaker: Mutex::new(Breaker {
                state: CircuitState::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    /// Whether calls are currently being blocked.
    pub fn is_open(&self) -> bool {
        let breaker = self.lock();
        matches!(breaker.state, CircuitState::Open { until } if Instant::now() < until)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Breaker> {
        self.breaker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn admit(&self) -> Result<Permit<'_>, TransportError> {
        let mut breaker = self.lock();
        let trial = match breaker.state {
            CircuitState::Closed => false,
            CircuitState::Open { until } => {
                let now = Instant::now();
                if now < until {
                    return Err(TransportError::CircuitOpen {
                        remaining: until - now,
                    });
                }
                debug!("Circuit break elapsed, allowing a trial call");
                true
            }
            CircuitState::HalfOpen {
                trial_in_flight: true,
            } => return Err(TransportError::TrialInFlight),
            CircuitState::HalfOpen {
                trial_in_flight: false,
            } => true,
        };

        if trial {
            breaker.state = CircuitState::HalfOpen {
                trial_in_flight: true,
            };
        }
        Ok(Permit {
            policy: self,
            trial,
        })
    }

    fn abandon_trial(&self) {
        let mut breaker = self.lock();
        if let CircuitState::HalfOpen { trial_in_flight } = &mut breaker.state {
            *trial_in_flight = false;
        }
    }

    fn record(&self, failed: bool) {
        let mut breaker = self.lock();
        if !failed {
            if breaker.state != CircuitState::Closed {
                debug!("Circuit closed");
            }
            breaker.consecutive_failures = 0;
            breaker.state = CircuitState::Closed;
            return;
        }

        breaker.consecutive_failures += 1;
        let trips = matches!(breaker.state, CircuitState::HalfOpen { .. })
            || breaker.consecutive_failures >= self.failure_threshold;
        if trips {
            debug!(
                failures = breaker.consecutive_failures,
                break_duration = ?self.break_duration,
                "Circuit opened"
            );
            breaker.state = CircuitState::Open {
                until: Instant::now() + self.break_duration,
            };
        }
    }
}

impl TransportPolicy for CircuitBreakerPolicy {
    fn handle<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, TransportResult> {
        Box::pin(async move {
            let permit = self.admit()?;
            let outcome = next.run().await;
            permit.record(is_transient_outcome(&outcome));
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        assert!(is_transient(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(reqwest::StatusCode::REQUEST_TIMEOUT));
        assert!(is_transient(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_transient(reqwest::StatusCode::UNAUTHORIZED));
        assert!(!is_transient(reqwest::StatusCode::NOT_FOUND));
    }

    #[test]
    fn retry_delay_grows_and_is_capped() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));

        let first = policy.delay_for(0);
        assert!(first >= Duration::from_millis(90) && first <= Duration::from_millis(110));

        let second = policy.delay_for(1);
        assert!(second >= Duration::from_millis(180) && second <= Duration::from_millis(220));

        assert_eq!(policy.delay_for(4), Duration::from_millis(350));
    }

    #[test]
    fn builder_errors_are_not_transient() {
        let error = reqwest::Client::new()
            .get("http://localhost/v1/models")
            .header("authorization", "Bearer sk-bad\nkey")
            .build()
            .unwrap_err();
        assert!(error.is_builder());

        assert!(!is_transient_outcome(&Err(TransportError::Request(error))));
        assert!(!is_transient_outcome(&Err(TransportError::TrialInFlight)));
    }

    #[test]
    fn breaker_opens_after_threshold_and_half_opens_after_break() {
        let breaker = CircuitBreakerPolicy::new(2, Duration::from_millis(20));

        breaker.record(true);
        assert!(!breaker.is_open());
        assert!(breaker.admit().is_ok());

        breaker.record(true);
        assert!(breaker.is_open());
        assert!(matches!(
            breaker.admit(),
            Err(TransportError::CircuitOpen { .. })
        ));

        std::thread::sleep(Duration::from_millis(30));
        let trial = breaker.admit().unwrap();

        // A failed trial reopens immediately.
        trial.record(true);
        assert!(breaker.is_open());
    }

    #[test]
    fn half_open_admits_a_single_trial() {
        let breaker = CircuitBreakerPolicy::new(1, Duration::from_millis(10));
        breaker.record(true);
        std::thread::sleep(Duration::from_millis(20));

        let trial = breaker.admit().unwrap();
        assert!(matches!(breaker.admit(), Err(TransportError::TrialInFlight)));

        trial.record(false);
        assert!(breaker.admit().is_ok());
        assert!(breaker.admit().is_ok());
    }

    #[test]
    fn dropped_trial_hands_over_to_the_next_caller() {
        let breaker = CircuitBreakerPolicy::new(1, Duration::from_millis(10));
        breaker.record(true);
        std::thread::sleep(Duration::from_millis(20));

        drop(breaker.admit().unwrap());

        let trial = breaker.admit().unwrap();
        assert!(trial.trial);
        assert!(matches!(breaker.admit(), Err(TransportError::TrialInFlight)));
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreakerPolicy::new(2, Duration::from_secs(60));

        breaker.record(true);
        breaker.record(false);
        breaker.record(true);

        assert!(!breaker.is_open());
    }
}
