//! Fixed pause between sequential calls to rate-limited services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Blocking inter-item delay.
#[derive(Debug, Default)]
pub struct Throttle {
    delay: Duration,
    pauses: AtomicUsize,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pauses: AtomicUsize::new(0),
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait once.
    pub fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }

    /// Wait after item `position` of `total`, except after the last one.
    pub fn pause_between(&self, position: usize, total: usize) -> bool {
        if position + 1 >= total {
            return false;
        }
        self.pause();
        true
    }

    /// Pauses taken so far.
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn no_pause_after_last_item() {
        let throttle = Throttle::from_secs(0);
        let taken: Vec<bool> = (0..3).map(|i| throttle.pause_between(i, 3)).collect();
        assert_eq!(taken, vec![true, true, false]);
        assert_eq!(throttle.pauses(), 2);
    }

    #[test]
    fn pause_waits_for_delay() {
        let throttle = Throttle::new(Duration::from_millis(20));
        let start = Instant::now();
        throttle.pause();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
