//! Latency tracking and the `omniscient_state` telemetry packet sent to the
//! viewer so it can render what the engine is doing and why.

use serde::Serialize;

use crate::engine::types::{CodecKind, ProfileKind, QualityDecision};

const EMA_ALPHA: f64 = 0.2;

#[derive(Debug, Clone, Copy, Default)]
struct Ema {
    value: Option<f64>,
}

impl Ema {
    fn observe(&mut self, sample_ms: f64) {
        self.value = Some(match self.value {
            Some(prev) => EMA_ALPHA * sample_ms + (1.0 - EMA_ALPHA) * prev,
            None => sample_ms,
        });
    }

    fn get(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

/// Tracks the three pipeline-stage latencies the spec's telemetry packet reports.
#[derive(Default)]
pub struct LatencyTracker {
    capture_to_encode: Ema,
    encode_duration: Ema,
    packetize: Ema,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_capture_to_encode_ms(&mut self, ms: f64) {
        self.capture_to_encode.observe(ms);
    }

    pub fn observe_encode_duration_ms(&mut self, ms: f64) {
        self.encode_duration.observe(ms);
    }

    pub fn observe_packetize_ms(&mut self, ms: f64) {
        self.packetize.observe(ms);
    }

    pub fn capture_to_encode_ms(&self) -> f64 {
        self.capture_to_encode.get()
    }

    pub fn encode_duration_ms(&self) -> f64 {
        self.encode_duration.get()
    }

    pub fn packetize_ms(&self) -> f64 {
        self.packetize.get()
    }
}

/// The JSON body carried by the `0x50` omniscient-state packet type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OmniscientState {
    pub bitrate_mbps: f64,
    pub target_fps: u32,
    pub key_frame_interval: u32,
    pub quality_value: f64,
    pub codec_index: u8,
    pub profile_index: u8,
    pub capture_scale: f64,
    pub resolution_scale: f64,
    pub low_latency: bool,
    pub peak_multiplier: f64,
    pub reason: String,
    pub capture_to_encode_ms: f64,
    pub encode_duration_ms: f64,
    pub packetize_ms: f64,
}

impl OmniscientState {
    pub fn from_decision(decision: &QualityDecision, latency: &LatencyTracker) -> Self {
        OmniscientState {
            bitrate_mbps: decision.bitrate_mbps,
            target_fps: decision.target_fps,
            key_frame_interval: decision.key_frame_interval,
            quality_value: decision.quality_value,
            codec_index: codec_index(decision.codec_index),
            profile_index: profile_index(decision.profile_index),
            capture_scale: decision.capture_scale,
            resolution_scale: decision.resolution_scale,
            low_latency: decision.low_latency,
            peak_multiplier: decision.peak_multiplier,
            reason: decision.reason.clone(),
            capture_to_encode_ms: latency.capture_to_encode_ms(),
            encode_duration_ms: latency.encode_duration_ms(),
            packetize_ms: latency.packetize_ms(),
        }
    }
}

fn codec_index(codec: CodecKind) -> u8 {
    codec as u8
}

fn profile_index(profile: ProfileKind) -> u8 {
    profile as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_converges_toward_repeated_sample() {
        let mut tracker = LatencyTracker::new();
        for _ in 0..50 {
            tracker.observe_encode_duration_ms(10.0);
        }
        assert!((tracker.encode_duration_ms() - 10.0).abs() < 0.5);
    }

    #[test]
    fn first_sample_is_returned_verbatim() {
        let mut tracker = LatencyTracker::new();
        tracker.observe_packetize_ms(3.5);
        assert_eq!(tracker.packetize_ms(), 3.5);
    }
}
</content>
