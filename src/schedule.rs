use std::time::{Duration, Instant};

/// How far a trigger may fall behind before missed firings are dropped instead of replayed
const MAX_LAG: Duration = Duration::from_millis(100);

/// # Periodic
/// A repeating deadline that can be suspended and resumed.
///
/// It never sleeps or spawns anything itself; the owner asks it whether it is due with `poll`
/// and uses `deadline` to decide how long it may wait. That keeps every firing on whichever
/// thread owns it.
#[derive(Debug, Clone)]
pub struct Periodic {
    period: Duration,
    next: Option<Instant>,
}

impl Periodic {
    /// A suspended trigger firing `hz` times per second once resumed
    pub fn new(hz: u32) -> Self {
        Periodic {
            period: (Duration::from_secs(1) / hz.max(1)).max(Duration::from_nanos(1)),
            next: None,
        }
    }

    /// When it next fires, or `None` while suspended
    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    pub fn is_suspended(&self) -> bool {
        self.next.is_none()
    }

    pub fn suspend(&mut self) {
        self.next = None;
    }

    /// Schedules the next firing one period after `now`. Does nothing if already running.
    pub fn resume(&mut self, now: Instant) {
        if self.is_suspended() {
            self.next = Some(now + self.period);
        }
    }

    /// Consumes one firing if it is due by `now`.
    ///
    /// Call repeatedly to catch up on firings missed while the owner was busy; once the backlog
    /// exceeds `MAX_LAG` the rest is skipped.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if next <= now => {
                let following = next + self.period;
                self.next = if now.saturating_duration_since(following) > MAX_LAG {
                    Some(now + self.period)
                } else {
                    Some(following)
                };
                true
            }
            _ => false,
        }
    }
}
