//! Sliding-window caps on how many posts a pass dispatches.
//!
//! The throttle only answers how long until the next dispatch fits; the pass
//! does the waiting and records a dispatch once a post is handed off.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
struct Window {
    span: Duration,
    max: usize,
}

#[derive(Debug)]
pub(crate) struct DispatchThrottle {
    windows: Vec<Window>,
    /// Dispatch instants inside the longest window, oldest first
    sent: Mutex<VecDeque<Instant>>,
}

impl DispatchThrottle {
    /// A zero or missing cap leaves that window unlimited
    pub(crate) fn new(per_minute: Option<u32>, per_hour: Option<u32>) -> Self {
        let windows = [(MINUTE, per_minute), (HOUR, per_hour)]
            .into_iter()
            .filter_map(|(span, cap)| match cap {
                Some(max) if max > 0 => Some(Window {
                    span,
                    max: max as usize,
                }),
                _ => None,
            })
            .collect();

        Self {
            windows,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn is_unlimited(&self) -> bool {
        self.windows.is_empty()
    }

    /// How long until one more dispatch fits every window (zero when it fits now)
    pub(crate) async fn delay(&self) -> Duration {
        if self.is_unlimited() {
            return Duration::ZERO;
        }

        let mut sent = self.sent.lock().await;
        let now = Instant::now();
        self.forget_expired(&mut sent, now);

        self.windows
            .iter()
            .filter_map(|window| {
                let in_window = sent
                    .iter()
                    .filter(|at| now.duration_since(**at) < window.span)
                    .count();
                if in_window < window.max {
                    return None;
                }
                // The dispatch that has to age out before another one fits
                let blocking = sent[sent.len() - window.max];
                Some(window.span.saturating_sub(now.duration_since(blocking)))
            })
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Count a dispatch made now
    pub(crate) async fn record(&self) {
        if self.is_unlimited() {
            return;
        }

        let mut sent = self.sent.lock().await;
        let now = Instant::now();
        self.forget_expired(&mut sent, now);
        sent.push_back(now);
    }

    fn forget_expired(&self, sent: &mut VecDeque<Instant>, now: Instant) {
        let longest = self
            .windows
            .iter()
            .map(|w| w.span)
            .max()
            .unwrap_or(Duration::ZERO);
        while sent
            .front()
            .is_some_and(|at| now.duration_since(*at) >= longest)
        {
            sent.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_caps_are_unlimited() {
        let throttle = DispatchThrottle::new(Some(0), None);
        assert!(throttle.is_unlimited());
        for _ in 0..100 {
            throttle.record().await;
            assert_eq!(throttle.delay().await, Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_minute_cap_delays_until_oldest_dispatch_ages_out() {
        let throttle = DispatchThrottle::new(Some(2), None);

        throttle.record().await;
        tokio::time::advance(Duration::from_secs(20)).await;
        throttle.record().await;

        assert_eq!(throttle.delay().await, Duration::from_secs(40));

        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(throttle.delay().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_longest_blocking_window_wins() {
        let throttle = DispatchThrottle::new(Some(5), Some(1));

        throttle.record().await;
        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(throttle.delay().await, Duration::from_secs(3540));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides_rather_than_resets() {
        let throttle = DispatchThrottle::new(Some(2), None);

        throttle.record().await;
        tokio::time::advance(Duration::from_secs(50)).await;
        throttle.record().await;
        tokio::time::advance(Duration::from_secs(15)).await;

        // First dispatch aged out, second still counts
        assert_eq!(throttle.delay().await, Duration::ZERO);
        throttle.record().await;
        assert_eq!(throttle.delay().await, Duration::from_secs(45));
    }
}
