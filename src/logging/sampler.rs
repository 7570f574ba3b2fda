//! Sampling-aware wrapper around a hot-path log call site.
//!
//! A dropped fragment or a `WouldBlock` capture retry happens far too often to
//! log unconditionally; each call site owns a `Sampler` that decides, per call,
//! whether this particular occurrence should actually reach the logger.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub enum SampleMode {
    Always,
    Throttle(Duration),
    PerSecond,
    OncePerSession,
}

pub struct Sampler {
    mode: SampleMode,
    last_emitted: Option<Instant>,
    emitted_once: bool,
    count_this_second: u32,
    second_start: Option<Instant>,
}

impl Sampler {
    pub fn new(mode: SampleMode) -> Self {
        Sampler {
            mode,
            last_emitted: None,
            emitted_once: false,
            count_this_second: 0,
            second_start: None,
        }
    }

    /// Returns true iff this occurrence should be logged, and records the decision.
    pub fn should_emit(&mut self) -> bool {
        let now = Instant::now();
        match self.mode {
            SampleMode::Always => true,
            SampleMode::OncePerSession => {
                if self.emitted_once {
                    false
                } else {
                    self.emitted_once = true;
                    true
                }
            }
            SampleMode::Throttle(interval) => match self.last_emitted {
                Some(last) if now.duration_since(last) < interval => false,
                _ => {
                    self.last_emitted = Some(now);
                    true
                }
            },
            SampleMode::PerSecond => {
                let start = *self.second_start.get_or_insert(now);
                if now.duration_since(start) >= Duration::from_secs(1) {
                    self.second_start = Some(now);
                    self.count_this_second = 1;
                    true
                } else if self.count_this_second == 0 {
                    self.count_this_second = 1;
                    true
                } else {
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn once_per_session_emits_exactly_once() {
        let mut s = Sampler::new(SampleMode::OncePerSession);
        assert!(s.should_emit());
        assert!(!s.should_emit());
        assert!(!s.should_emit());
    }

    #[test]
    fn throttle_suppresses_within_window() {
        let mut s = Sampler::new(SampleMode::Throttle(Duration::from_millis(50)));
        assert!(s.should_emit());
        assert!(!s.should_emit());
        std::thread::sleep(Duration::from_millis(60));
        assert!(s.should_emit());
    }

    #[test]
    fn always_never_suppresses() {
        let mut s = Sampler::new(SampleMode::Always);
        for _ in 0..5 {
            assert!(s.should_emit());
        }
    }
}
</content>
