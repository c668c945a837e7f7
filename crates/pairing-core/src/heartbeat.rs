//! Periodic task scheduling

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Schedules periodic tasks on the tokio runtime
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    period: Duration,
}

impl Heartbeat {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run `task` once per period, starting one period from now
    ///
    /// The task stops when the returned handle is cancelled or dropped.
    pub fn register<F, Fut>(&self, task: F) -> HeartbeatHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                task().await;
            }
        });

        debug!("Registered heartbeat task every {:?}", period);
        HeartbeatHandle {
            handle: Some(handle),
        }
    }
}

/// Registration of a periodic task
#[derive(Debug)]
pub struct HeartbeatHandle {
    handle: Option<JoinHandle<()>>,
}

impl HeartbeatHandle {
    pub fn cancel(mut self) {
        self.abort();
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_task(count: &Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<()> + Send {
        let count = count.clone();
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Heartbeat::new(Duration::from_secs(5)).register(counting_task(&count));

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(10_200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(handle.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Heartbeat::new(Duration::from_secs(1)).register(counting_task(&count));

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
