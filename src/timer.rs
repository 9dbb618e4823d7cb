/// Fixed-rate repeating timer driven by an external millisecond clock.
///
/// `fire` advances the deadline by exactly one period, so a caller that
/// polls late replays every missed tick in order instead of skipping them.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Interval {
    period_ms: u64,
    next_due_ms: u64,
    running: bool,
}

impl Interval {
    pub(crate) fn new(period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            next_due_ms: 0,
            running: false,
        }
    }

    pub(crate) fn start(&mut self, now_ms: u64) {
        self.next_due_ms = now_ms.saturating_add(self.period_ms);
        self.running = true;
    }

    pub(crate) fn stop(&mut self) {
        self.running = false;
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn next_due(&self) -> Option<u64> {
        self.running.then_some(self.next_due_ms)
    }

    pub(crate) fn due(&self, now_ms: u64) -> bool {
        self.running && now_ms >= self.next_due_ms
    }

    pub(crate) fn fire(&mut self) -> u64 {
        let at = self.next_due_ms;
        self.next_due_ms = self.next_due_ms.saturating_add(self.period_ms);
        at
    }
}

/// Whole-second countdown shown on an action control while it cools down.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Countdown {
    ends_at_ms: u64,
}

impl Countdown {
    pub(crate) fn new(now_ms: u64, duration_ms: u64) -> Self {
        Self {
            ends_at_ms: now_ms.saturating_add(duration_ms),
        }
    }

    pub(crate) fn remaining_secs(&self, now_ms: u64) -> u64 {
        let left = self.ends_at_ms.saturating_sub(now_ms);
        left.div_ceil(1000)
    }

    pub(crate) fn is_done(&self, now_ms: u64) -> bool {
        now_ms >= self.ends_at_ms
    }
}

/// Linear 0..1 progress between two instants; used for fades.
pub(crate) fn progress(start_ms: u64, duration_ms: u64, now_ms: u64) -> f32 {
    if duration_ms == 0 {
        return 1.0;
    }
    let elapsed = now_ms.saturating_sub(start_ms) as f32;
    (elapsed / duration_ms as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_replays_missed_ticks_in_order() {
        let mut iv = Interval::new(1000);
        iv.start(0);
        assert!(!iv.due(999));
        let mut fired = Vec::new();
        while iv.due(3500) {
            fired.push(iv.fire());
        }
        assert_eq!(fired, vec![1000, 2000, 3000]);
        assert_eq!(iv.next_due(), Some(4000));
    }

    #[test]
    fn stopped_interval_never_fires() {
        let mut iv = Interval::new(500);
        iv.start(0);
        iv.stop();
        assert!(!iv.due(10_000));
        assert_eq!(iv.next_due(), None);
    }

    #[test]
    fn countdown_rounds_up_to_whole_seconds() {
        let cd = Countdown::new(1_000, 5_000);
        assert_eq!(cd.remaining_secs(1_000), 5);
        assert_eq!(cd.remaining_secs(1_001), 5);
        assert_eq!(cd.remaining_secs(5_000), 1);
        assert_eq!(cd.remaining_secs(6_000), 0);
        assert!(!cd.is_done(5_999));
        assert!(cd.is_done(6_000));
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(progress(100, 1000, 0), 0.0);
        assert_eq!(progress(100, 1000, 600), 0.5);
        assert_eq!(progress(100, 1000, 5000), 1.0);
        assert_eq!(progress(100, 0, 0), 1.0);
    }
}
