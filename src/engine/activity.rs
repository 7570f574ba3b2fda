//! Screen-activity tracking: turns per-frame dirty-rect reports into a
//! motion EMA and a "how long has it been static" clock, grounded in the
//! teacher's tile-delta capture diffing.

use std::collections::VecDeque;
use std::time::Instant;

const WINDOW: usize = 30;
const STATIC_THRESHOLD: f64 = 0.05;
const ALPHA: f64 = 2.0 / (WINDOW as f64 + 1.0);

#[derive(Debug, Clone, Copy)]
pub struct DirtyRect {
    pub width: u32,
    pub height: u32,
}

pub struct ScreenActivityTracker {
    screen_area: f64,
    samples: VecDeque<f64>,
    ema: f64,
    static_since: Option<Instant>,
}

impl ScreenActivityTracker {
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        ScreenActivityTracker {
            screen_area: (screen_width as f64 * screen_height as f64).max(1.0),
            samples: VecDeque::with_capacity(WINDOW),
            ema: 0.0,
            static_since: Some(Instant::now()),
        }
    }

    /// Record a frame's dirty rectangles and update the motion EMA.
    pub fn record_dirty_rects(&mut self, rects: &[DirtyRect]) {
        let changed_area: f64 = rects.iter().map(|r| r.width as f64 * r.height as f64).sum();
        let ratio = (changed_area / self.screen_area).min(1.0);
        self.push(ratio);
    }

    /// Record a frame that produced no change at all (explicit zero sample).
    pub fn record_static_frame(&mut self) {
        self.push(0.0);
    }

    fn push(&mut self, ratio: f64) {
        if self.samples.len() == WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(ratio);
        self.ema = ALPHA * ratio + (1.0 - ALPHA) * self.ema;

        if self.ema >= STATIC_THRESHOLD {
            self.static_since = None;
        } else if self.static_since.is_none() {
            self.static_since = Some(Instant::now());
        }
    }

    pub fn motion_ema(&self) -> f64 {
        self.ema
    }

    pub fn static_duration_secs(&self) -> f64 {
        match self.static_since {
            Some(since) => since.elapsed().as_secs_f64(),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heavy_motion_keeps_ema_high() {
        let mut t = ScreenActivityTracker::new(1920, 1080);
        for _ in 0..WINDOW {
            t.record_dirty_rects(&[DirtyRect { width: 1920, height: 1080 }]);
        }
        assert!(t.motion_ema() > 0.30);
    }

    #[test]
    fn static_frames_drive_ema_to_zero_and_start_clock() {
        let mut t = ScreenActivityTracker::new(1920, 1080);
        t.record_dirty_rects(&[DirtyRect { width: 1920, height: 1080 }]);
        assert_eq!(t.static_duration_secs(), 0.0);
        for _ in 0..WINDOW {
            t.record_static_frame();
        }
        assert!(t.motion_ema() < STATIC_THRESHOLD);
    }

    #[test]
    fn resuming_motion_resets_static_clock() {
        let mut t = ScreenActivityTracker::new(1920, 1080);
        for _ in 0..WINDOW {
            t.record_static_frame();
        }
        assert!(t.static_duration_secs() >= 0.0);
        t.record_dirty_rects(&[DirtyRect { width: 1920, height: 1080 }]);
        assert_eq!(t.static_duration_secs(), 0.0);
    }
}
</content>
