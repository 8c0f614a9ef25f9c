//! Polling policy for asynchronous jobs.
//!
//! One type covers both ways a poll loop can give up: a wall-clock
//! deadline and an optional attempt budget. Whichever is hit first ends
//! the loop with [`CrawlError::Timeout`]. The deadline also bounds each
//! individual check, so a call that never returns cannot outlive it.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{CrawlError, CrawlResult};

/// Outcome of a single poll.
#[derive(Debug)]
pub enum PollState<T> {
    /// The job reached a terminal successful state.
    Ready(T),

    /// Still running; poll again after the interval.
    Pending,
}

/// Fixed-interval polling bounded by a deadline and/or an attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Delay between consecutive polls
    #[serde(with = "crate::types::config::duration_secs")]
    pub interval: Duration,

    /// Wall-clock budget measured from the first poll
    #[serde(with = "crate::types::config::duration_secs")]
    pub deadline: Duration,

    /// Maximum number of polls (None = limited by the deadline only)
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            deadline: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    /// Create a deadline-bounded policy.
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self {
            interval,
            deadline,
            max_attempts: None,
        }
    }

    /// Also cap the number of polls.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Poll `check` until it returns [`PollState::Ready`] or the policy is
    /// exhausted.
    ///
    /// Errors from `check` end the loop immediately. `target` only labels the
    /// timeout error and log lines.
    pub async fn run<T, F, Fut>(&self, target: &str, check: F) -> CrawlResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = CrawlResult<PollState<T>>>,
    {
        self.run_since(Instant::now(), target, check).await
    }

    /// Run `fut` under the deadline that started at `start`.
    pub async fn within<T, Fut>(&self, start: Instant, target: &str, fut: Fut) -> CrawlResult<T>
    where
        Fut: Future<Output = CrawlResult<T>>,
    {
        match tokio::time::timeout_at(start + self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(self.timeout(start, target, 0)),
        }
    }

    /// Like [`PollPolicy::run`], with the deadline measured from `start`.
    pub async fn run_since<T, F, Fut>(
        &self,
        start: Instant,
        target: &str,
        mut check: F,
    ) -> CrawlResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = CrawlResult<PollState<T>>>,
    {
        let deadline = start + self.deadline;
        let mut attempts: u32 = 0;

        loop {
            if self.max_attempts.is_some_and(|max| attempts >= max) || Instant::now() >= deadline {
                return Err(self.timeout(start, target, attempts));
            }

            attempts += 1;
            let state = match tokio::time::timeout_at(deadline, check(attempts)).await {
                Ok(state) => state?,
                Err(_) => {
                    debug!(job = %target, attempts, "Poll call outlived the deadline");
                    return Err(self.timeout(start, target, attempts));
                }
            };

            match state {
                PollState::Ready(value) => {
                    debug!(job = %target, attempts, elapsed = ?start.elapsed(), "Poll completed");
                    return Ok(value);
                }
                PollState::Pending => {
                    // Don't sleep past the deadline just to fail afterwards
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        continue;
                    }
                    tokio::time::sleep(self.interval.min(remaining)).await;
                }
            }
        }
    }

    fn timeout(&self, start: Instant, target: &str, attempts: u32) -> CrawlError {
        CrawlError::Timeout {
            target: target.to_string(),
            attempts,
            elapsed: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_pending() {
        let policy = PollPolicy::default();
        let calls = AtomicU32::new(0);

        let result = policy
            .run("job", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Ok(PollState::Pending)
                    } else {
                        Ok(PollState::Ready(attempt))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_times_out() {
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(30));
        let start = Instant::now();

        let result: CrawlResult<()> = policy
            .run("job-slow", |_| async { Ok(PollState::Pending) })
            .await;

        match result {
            Err(CrawlError::Timeout { target, attempts, .. }) => {
                assert_eq!(target, "job-slow");
                // polls at t = 0, 2, 4, ... 28
                assert_eq!(attempts, 15);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert!(start.elapsed() < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_budget_times_out_first() {
        let policy = PollPolicy::default().with_max_attempts(2);

        let result: CrawlResult<()> = policy
            .run("job", |_| async { Ok(PollState::Pending) })
            .await;

        assert!(matches!(
            result,
            Err(CrawlError::Timeout { attempts: 2, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_error_stops_polling() {
        let policy = PollPolicy::default();
        let calls = AtomicU32::new(0);

        let result: CrawlResult<()> = policy
            .run("job", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(CrawlError::JobFailed {
                        job_id: "job".to_string(),
                        reason: "boom".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(CrawlError::JobFailed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_check_is_cut_at_deadline() {
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(30));
        let start = Instant::now();

        let result: CrawlResult<()> = policy
            .run("job-hung", |_| std::future::pending())
            .await;

        assert!(matches!(
            result,
            Err(CrawlError::Timeout { attempts: 1, .. })
        ));
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert!(start.elapsed() < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_within_shares_the_deadline() {
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(30));
        let start = Instant::now();

        let submitted = policy
            .within(start, "job", async {
                tokio::time::sleep(Duration::from_secs(25)).await;
                Ok(())
            })
            .await;
        assert!(submitted.is_ok());

        let result: CrawlResult<()> = policy
            .run_since(start, "job", |_| async { Ok(PollState::Pending) })
            .await;

        // Only t = 25, 27, 29 fit in what is left
        assert!(matches!(
            result,
            Err(CrawlError::Timeout { attempts: 3, .. })
        ));
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert!(start.elapsed() < Duration::from_secs(31));

        let late: CrawlResult<()> = policy
            .within(start, "job", std::future::pending())
            .await;
        assert!(matches!(late, Err(CrawlError::Timeout { attempts: 0, .. })));
    }

    #[test]
    fn test_partial_policy_fills_defaults() {
        let policy: PollPolicy = serde_json::from_str(r#"{"interval": 1.0}"#).unwrap();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.deadline, Duration::from_secs(30));
        assert!(policy.max_attempts.is_none());
    }
}
