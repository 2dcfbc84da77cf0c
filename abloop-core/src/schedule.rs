//! Cancellable repeating schedule driven by caller-supplied instants.

use std::time::{Duration, Instant};

/// A periodic activity owned by its caller.
///
/// Nothing runs on its own: the owner calls [`RepeatingSchedule::poll`] with the
/// current instant and performs the work when it returns `true`. Cancelling is
/// therefore synchronous and complete as soon as [`RepeatingSchedule::cancel`]
/// returns.
#[derive(Debug, Clone)]
pub struct RepeatingSchedule {
    period: Duration,
    next_due: Option<Instant>,
}

impl RepeatingSchedule {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// (Re)start the schedule; any previous schedule is dropped first.
    pub fn start(&mut self, now: Instant) {
        self.cancel();
        self.next_due = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    /// Returns `true` when a run is due and schedules the next one.
    ///
    /// Missed periods collapse into a single run.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let mut next = due + self.period;
                if next <= now {
                    next = now + self.period;
                }
                self.next_due = Some(next);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn fires_once_per_period() {
        let t0 = Instant::now();
        let mut sched = RepeatingSchedule::new(100 * MS);
        sched.start(t0);

        assert!(!sched.poll(t0 + 50 * MS));
        assert!(sched.poll(t0 + 100 * MS));
        assert!(!sched.poll(t0 + 150 * MS));
        assert!(sched.poll(t0 + 200 * MS));
    }

    #[test]
    fn missed_periods_collapse() {
        let t0 = Instant::now();
        let mut sched = RepeatingSchedule::new(100 * MS);
        sched.start(t0);

        assert!(sched.poll(t0 + 1000 * MS));
        assert!(!sched.poll(t0 + 1050 * MS));
        assert!(sched.poll(t0 + 1100 * MS));
    }

    #[test]
    fn restart_replaces_previous_schedule() {
        let t0 = Instant::now();
        let mut sched = RepeatingSchedule::new(100 * MS);
        sched.start(t0);
        sched.start(t0 + 80 * MS);

        assert!(!sched.poll(t0 + 100 * MS));
        assert!(sched.poll(t0 + 180 * MS));
    }

    #[test]
    fn cancelled_schedule_never_fires() {
        let t0 = Instant::now();
        let mut sched = RepeatingSchedule::new(100 * MS);
        sched.start(t0);
        sched.cancel();
        sched.cancel();

        assert!(!sched.is_active());
        assert!(!sched.poll(t0 + 10_000 * MS));
    }
}
