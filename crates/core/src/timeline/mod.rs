use std::cmp::Ordering;

/// Virtual event-loop time. Everything the sequencer schedules is measured
/// against this clock, which only moves when the host pumps it.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn advance(&mut self, delta: f64) {
        if delta.is_finite() {
            self.time_seconds = (self.time_seconds + delta).max(0.0);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Work deferred by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Recompute progress from the media position.
    ProgressPoll,
    /// Start the given ring after the inter-ring pause.
    Advance { next: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTimer {
    pub id: TimerId,
    pub due_seconds: f64,
    pub kind: TimerKind,
}

/// Pending timers ordered by deadline, ties broken by scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<ScheduledTimer>,
    next_id: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_seconds: f64, kind: TimerKind) {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(ScheduledTimer {
            id,
            due_seconds,
            kind,
        });
        self.timers.sort_by(|a, b| {
            a.due_seconds
                .partial_cmp(&b.due_seconds)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    /// Removes and returns the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<ScheduledTimer> {
        match self.timers.first() {
            Some(timer) if timer.due_seconds <= now => Some(self.timers.remove(0)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(0.5, TimerKind::Advance { next: 1 });
        queue.schedule(0.1, TimerKind::ProgressPoll);
        queue.schedule(0.1, TimerKind::Advance { next: 2 });

        assert_eq!(queue.pop_due(0.05), None);
        assert_eq!(queue.pop_due(0.2).map(|t| t.kind), Some(TimerKind::ProgressPoll));
        assert_eq!(
            queue.pop_due(0.2).map(|t| t.kind),
            Some(TimerKind::Advance { next: 2 })
        );
        assert_eq!(queue.pop_due(0.2), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut queue = TimerQueue::new();
        queue.schedule(0.5, TimerKind::Advance { next: 1 });
        queue.schedule(0.1, TimerKind::ProgressPoll);
        queue.cancel_all();

        assert!(queue.is_empty());
        assert_eq!(queue.pop_due(10.0), None);
    }

    #[test]
    fn clock_ignores_invalid_deltas() {
        let mut clock = PlaybackClock::default();
        clock.advance(0.25);
        clock.advance(f64::NAN);
        clock.advance(-5.0);
        assert_eq!(clock.time_seconds, 0.0);
        clock.advance(1.5);
        assert_eq!(clock.time_seconds, 1.5);
    }
}
