use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const MIN_TICK_PERIOD: Duration = Duration::from_millis(100);

/// Periodic task that runs until cancelled or dropped.
///
/// The first tick fires immediately.
#[derive(Debug)]
pub struct TickSubscription {
    label: &'static str,
    handle: JoinHandle<()>,
}

impl TickSubscription {
    pub fn spawn<F, Fut>(label: &'static str, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(MIN_TICK_PERIOD);
        tracing::debug!(
            tick = label,
            period_ms = period.as_millis() as u64,
            "Starting tick"
        );

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                on_tick().await;
            }
        });

        Self { label, handle }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TickSubscription {
    fn drop(&mut self) {
        self.handle.abort();
        tracing::debug!(tick = self.label, "Stopped tick");
    }
}
