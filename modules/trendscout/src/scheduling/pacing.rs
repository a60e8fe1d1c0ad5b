//! Throttling between external calls. Delays come from an injectable policy
//! so tests can run with zero waits.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use trendscout_common::DelayRange;

use super::interrupt::Interrupt;

pub trait DelayPolicy: Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// Any `Fn() -> Duration` works as a policy.
impl<F> DelayPolicy for F
where
    F: Fn() -> Duration + Send + Sync,
{
    fn next_delay(&self) -> Duration {
        self()
    }
}

/// Uniformly random delay within an inclusive range, millisecond resolution.
#[derive(Debug, Clone, Copy)]
pub struct RandomDelay {
    range: DelayRange,
}

impl RandomDelay {
    pub fn new(range: DelayRange) -> Self {
        Self { range }
    }
}

impl DelayPolicy for RandomDelay {
    fn next_delay(&self) -> Duration {
        let min = self.range.min.as_millis() as u64;
        let max = self.range.max.as_millis() as u64;
        if min >= max {
            return self.range.min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// Same delay every time. `FixedDelay(Duration::ZERO)` disables throttling.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl DelayPolicy for FixedDelay {
    fn next_delay(&self) -> Duration {
        self.0
    }
}

/// Sleep for the policy's next delay. Returns `false` if interrupted first.
pub async fn pause(policy: &dyn DelayPolicy, interrupt: &Interrupt) -> bool {
    if interrupt.is_triggered() {
        return false;
    }
    let delay = policy.next_delay();
    if delay.is_zero() {
        return true;
    }
    debug!(secs = delay.as_secs_f64(), "Sleeping");
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = interrupt.triggered() => false,
    }
}
