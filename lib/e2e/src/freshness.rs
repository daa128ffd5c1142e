//! Waiting for reads to reflect state the caller knows has changed.
//!
//! Local reads are served by whatever the node considers its latest state.
//! Instead of sleeping for a fixed time, callers poll a read with exponential
//! backoff until a freshness condition holds or the timeout elapses.
use std::{future::Future, time::Duration};

use eyre::bail;
use tokio::time::{sleep, Instant};

/// Backoff schedule for [`poll_until`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after the first unsuccessful read.
    pub initial_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
    /// Total time after which polling gives up.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

impl PollPolicy {
    fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

/// Repeatedly performs `read` until `condition` accepts its value.
///
/// The first read happens immediately. Errors returned by `read` are
/// propagated without retrying.
///
/// # Errors
///
/// May fail if `read` fails or if the condition doesn't hold within
/// [`PollPolicy::timeout`].
pub async fn poll_until<T, F, Fut>(
    policy: PollPolicy,
    what: &str,
    mut read: F,
    condition: impl Fn(&T) -> bool,
) -> eyre::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = eyre::Result<T>>,
{
    let deadline = Instant::now() + policy.timeout;
    let mut delay = policy.initial_delay;
    let mut attempts = 0_u32;

    loop {
        attempts += 1;
        let value = read().await?;
        if condition(&value) {
            if attempts > 1 {
                tracing::debug!(what, attempts, "read became fresh");
            }
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            bail!(
                "`{what}` did not become fresh within {:?} ({attempts} attempts)",
                policy.timeout
            );
        }

        sleep(delay.min(deadline - now)).await;
        delay = policy.next_delay(delay);
    }
}
