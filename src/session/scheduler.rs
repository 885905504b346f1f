use std::time::Duration;

use log::debug;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::SessionOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceDelay {
    /// Wait for the user to ask for the next card.
    Manual,
    After(Duration),
}

/// Picks how long a resolved card stays on screen before moving on.
pub fn schedule(outcome_correct: bool, options: &SessionOptions) -> AdvanceDelay {
    let short = Duration::from_millis(options.short_delay_ms);
    let long = Duration::from_millis(options.long_delay_ms);

    if outcome_correct {
        if options.fast_mode {
            AdvanceDelay::After(short)
        } else {
            AdvanceDelay::After(long)
        }
    } else if options.auto_advance_on_incorrect {
        // The correction has to stay readable, so fast mode does not apply.
        AdvanceDelay::After(long)
    } else {
        AdvanceDelay::Manual
    }
}

/// At most one pending auto-advance. Arming again or cancelling aborts the
/// previous sleep, so a stale timer can never deliver its event.
#[derive(Debug, Default)]
pub struct AdvanceTimer {
    pending: Option<JoinHandle<()>>,
}

impl AdvanceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `event` on `tx` after `delay`. Must be called inside a tokio runtime.
    pub fn arm<E>(&mut self, delay: Duration, event: E, tx: UnboundedSender<E>)
    where
        E: Send + 'static,
    {
        self.cancel();
        debug!("Auto-advance armed for {} ms", delay.as_millis());
        self.pending = Some(tokio::spawn(async move {
            sleep(delay).await;
            // The receiver is gone when the session is shutting down.
            let _ = tx.send(event);
        }));
    }

    /// Returns true when a timer was still pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                if was_pending {
                    debug!("Pending auto-advance cancelled");
                }
                was_pending
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for AdvanceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn options(fast_mode: bool, auto_advance_on_incorrect: bool) -> SessionOptions {
        SessionOptions { fast_mode, auto_advance_on_incorrect, ..SessionOptions::default() }
    }

    #[test]
    fn test_delay_classes() {
        let short = AdvanceDelay::After(Duration::from_millis(500));
        let long = AdvanceDelay::After(Duration::from_millis(2500));

        assert_eq!(schedule(true, &options(true, false)), short);
        assert_eq!(schedule(true, &options(false, false)), long);
        assert_eq!(schedule(false, &options(false, false)), AdvanceDelay::Manual);
        assert_eq!(schedule(false, &options(true, false)), AdvanceDelay::Manual);
        assert_eq!(schedule(false, &options(true, true)), long);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = AdvanceTimer::new();
        timer.arm(Duration::from_millis(500), 7u64, tx.clone());
        assert!(timer.is_armed());

        assert_eq!(rx.recv().await, Some(7));
        sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_rearm_drop_stale_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = AdvanceTimer::new();

        timer.arm(Duration::from_millis(500), 1u64, tx.clone());
        assert!(timer.cancel());
        assert!(!timer.cancel());

        timer.arm(Duration::from_millis(2500), 2u64, tx.clone());
        timer.arm(Duration::from_millis(2500), 3u64, tx.clone());

        sleep(Duration::from_secs(10)).await;
        assert_eq!(rx.try_recv().ok(), Some(3));
        assert!(rx.try_recv().is_err());
    }
}
