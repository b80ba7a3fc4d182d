//! Owned tick handle for the engine's polling loop.
//!
//! A `TickHandle` exists only while the sequencer is running and unpaused.
//! Dropping it cancels the tick source, so releasing the handle is the whole
//! cancellation story: nothing can fire after the drop because nothing else
//! holds the interval.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Counts live handles for one engine.
#[derive(Debug, Clone, Default)]
pub struct TickerRegistry {
    live: Arc<AtomicUsize>,
}

impl TickerRegistry {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct TickHandle {
    period: Duration,
    /// Built on first wait so a handle can be acquired outside a runtime.
    interval: Option<Interval>,
    last: Option<Instant>,
    registry: TickerRegistry,
}

impl TickHandle {
    pub fn acquire(period: Duration, registry: &TickerRegistry) -> Self {
        registry.live.fetch_add(1, Ordering::SeqCst);
        Self {
            period,
            interval: None,
            last: None,
            registry: registry.clone(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next tick. Returns the time actually elapsed since the
    /// previous tick returned (or since the first wait began).
    ///
    /// Missed ticks are not replayed; a stall shows up as one long gap.
    pub async fn wait(&mut self) -> Duration {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            // The first tick lands one period out, not immediately.
            let mut iv = interval_at(Instant::now() + period, period);
            iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
            iv
        });
        let started = *self.last.get_or_insert_with(Instant::now);
        interval.tick().await;
        let now = Instant::now();
        self.last = Some(now);
        now.saturating_duration_since(started)
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.registry.live.fetch_sub(1, Ordering::SeqCst);
    }
}
