//! Trailing-edge debouncer.
//!
//! Filesystem watchers report bursts (an agent writing a file produces a
//! create plus several modify events). Every trigger pushes the deadline out
//! by the window; the refresh runs once the deadline passes quietly.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Schedules (or reschedules) the pending pass at `now + window`.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// When the pending pass is due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consumes the pending pass if its deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(50);

    #[test]
    fn test_burst_coalesces_into_one_pass() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);

        for offset in [0, 10, 20, 30] {
            debouncer.trigger(start + Duration::from_millis(offset));
        }
        assert_eq!(debouncer.deadline(), Some(start + Duration::from_millis(80)));

        assert!(!debouncer.fire(start + Duration::from_millis(79)));
        assert!(debouncer.fire(start + Duration::from_millis(80)));
        assert!(!debouncer.fire(start + Duration::from_millis(200)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_idle_never_fires() {
        let mut debouncer = Debouncer::new(WINDOW);
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire(Instant::now() + Duration::from_secs(10)));
    }
}
