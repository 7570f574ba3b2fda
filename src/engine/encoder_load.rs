//! Encoder-load tracking: a sliding 2-second window over encode-call outcomes,
//! used to detect an overloaded hardware encoder before frames visibly stall.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(2);
const MIN_SAMPLES: usize = 10;
const MIN_AGE: Duration = Duration::from_secs(5);
const OVERLOAD_DROP_RATE: f64 = 0.10;
const CRITICAL_DROP_RATE: f64 = 0.20;

pub struct EncoderLoadTracker {
    events: VecDeque<(Instant, bool)>,
    started_at: Instant,
    paused: bool,
}

impl EncoderLoadTracker {
    pub fn new() -> Self {
        EncoderLoadTracker {
            events: VecDeque::new(),
            started_at: Instant::now(),
            paused: false,
        }
    }

    pub fn record_encode_call(&mut self, produced_output: bool) {
        if self.paused {
            return;
        }
        let now = Instant::now();
        self.events.push_back((now, produced_output));
        self.prune(now);
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&(t, _)) = self.events.front() {
            if now.duration_since(t) > WINDOW {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn drop_rate(&self) -> f64 {
        if self.events.is_empty() {
            return 0.0;
        }
        let produced = self.events.iter().filter(|(_, ok)| *ok).count();
        (1.0 - produced as f64 / self.events.len() as f64).max(0.0)
    }

    fn warmed_up(&self) -> bool {
        self.events.len() >= MIN_SAMPLES && self.started_at.elapsed() >= MIN_AGE
    }

    pub fn is_overloaded(&self) -> bool {
        self.warmed_up() && self.drop_rate() > OVERLOAD_DROP_RATE
    }

    pub fn is_critical(&self) -> bool {
        self.warmed_up() && self.drop_rate() > CRITICAL_DROP_RATE
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn reset(&mut self) {
        self.events.clear();
        self.started_at = Instant::now();
        self.paused = false;
    }
}

impl Default for EncoderLoadTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_never_reports_overloaded() {
        let mut t = EncoderLoadTracker::new();
        for _ in 0..20 {
            t.record_encode_call(false);
        }
        assert!(!t.is_overloaded(), "suppressed before MIN_AGE elapses");
    }

    #[test]
    fn empty_window_has_zero_drop_rate() {
        let t = EncoderLoadTracker::new();
        assert_eq!(t.drop_rate(), 0.0);
    }

    #[test]
    fn reset_clears_window_and_restarts_clock() {
        let mut t = EncoderLoadTracker::new();
        t.record_encode_call(false);
        t.reset();
        assert_eq!(t.drop_rate(), 0.0);
        assert!(!t.is_overloaded());
    }
}
</content>
