//! Value types shared by the Omniscient control engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkQualityLevel {
    Excellent,
    Good,
    Moderate,
    Poor,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkMetrics {
    pub rtt_s: f64,
    pub loss_rate: f64,
    pub jitter_s: f64,
    pub bandwidth_mbps: f64,
}

/// Ordinal thermal severity; `>= Serious` and `>= Critical` comparisons in the
/// spec rely on derive(PartialOrd) matching declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ThermalLevel {
    #[default]
    Nominal,
    Fair,
    Serious,
    Critical,
}

impl ThermalLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => ThermalLevel::Nominal,
            1 => ThermalLevel::Fair,
            2 => ThermalLevel::Serious,
            _ => ThermalLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HostMetrics {
    pub cpu: f64,
    pub memory: f64,
    pub thermal: ThermalLevel,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientMetrics {
    pub battery: f64,
    pub is_charging: bool,
    pub thermal: ThermalLevel,
    pub low_power: bool,
    pub current_fps: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputPhysics {
    pub scroll_vx: f64,
    pub scroll_vy: f64,
    pub is_scrolling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    Static,
    Light,
    Heavy,
}

impl ActivityLevel {
    pub fn from_motion_ratio(ema: f64) -> Self {
        if ema < 0.05 {
            ActivityLevel::Static
        } else if ema < 0.30 {
            ActivityLevel::Light
        } else {
            ActivityLevel::Heavy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodecKind {
    H264 = 0,
    Hevc = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileKind {
    Baseline = 0,
    Main = 1,
    High = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Balanced,
    Performance,
    Quality,
    Eco,
    NetworkLimited,
}

/// The per-mode target that the network/device/content gates then clamp.
#[derive(Debug, Clone, Copy)]
pub struct ModeProfile {
    pub bitrate_mbps: f64,
    pub fps: u32,
    pub keyframe_interval: u32,
    pub quality: f64,
    pub codec: CodecKind,
    pub profile: ProfileKind,
    pub resolution_scale: f64,
    pub low_latency: bool,
    pub peak_multiplier: f64,
}

impl EngineMode {
    pub fn profile(self) -> ModeProfile {
        match self {
            EngineMode::Balanced => ModeProfile {
                bitrate_mbps: 20.0,
                fps: 60,
                keyframe_interval: 60,
                quality: 0.75,
                codec: CodecKind::H264,
                profile: ProfileKind::Main,
                resolution_scale: 1.0,
                low_latency: false,
                peak_multiplier: 1.5,
            },
            EngineMode::Performance => ModeProfile {
                bitrate_mbps: 60.0,
                fps: 60,
                keyframe_interval: 30,
                quality: 0.70,
                codec: CodecKind::H264,
                profile: ProfileKind::Main,
                resolution_scale: 1.0,
                low_latency: true,
                peak_multiplier: 2.0,
            },
            EngineMode::Quality => ModeProfile {
                bitrate_mbps: 40.0,
                fps: 60,
                keyframe_interval: 120,
                quality: 0.90,
                codec: CodecKind::Hevc,
                profile: ProfileKind::High,
                resolution_scale: 1.0,
                low_latency: false,
                peak_multiplier: 1.5,
            },
            EngineMode::Eco => ModeProfile {
                bitrate_mbps: 8.0,
                fps: 24,
                keyframe_interval: 60,
                quality: 0.65,
                codec: CodecKind::H264,
                profile: ProfileKind::Baseline,
                resolution_scale: 0.75,
                low_latency: false,
                peak_multiplier: 1.2,
            },
            EngineMode::NetworkLimited => ModeProfile {
                bitrate_mbps: 10.0,
                fps: 30,
                keyframe_interval: 15,
                quality: 0.60,
                codec: CodecKind::H264,
                profile: ProfileKind::Baseline,
                resolution_scale: 0.75,
                low_latency: true,
                peak_multiplier: 1.2,
            },
        }
    }
}

/// The engine's output: immutable once produced.
#[derive(Debug, Clone)]
pub struct QualityDecision {
    pub bitrate_mbps: f64,
    pub target_fps: u32,
    pub key_frame_interval: u32,
    pub quality_value: f64,
    pub codec_index: CodecKind,
    pub profile_index: ProfileKind,
    pub capture_scale: f64,
    pub resolution_scale: f64,
    pub low_latency: bool,
    pub peak_multiplier: f64,
    pub reason: String,
}

impl QualityDecision {
    /// "Changed" per the spec's per-dimension comparison thresholds.
    pub fn differs_from(&self, other: &QualityDecision) -> bool {
        (self.capture_scale - other.capture_scale).abs() > f64::EPSILON
            || (self.bitrate_mbps - other.bitrate_mbps).abs() > 1.0
            || self.target_fps != other.target_fps
            || self.key_frame_interval != other.key_frame_interval
            || (self.quality_value - other.quality_value).abs() > 0.05
            || self.codec_index != other.codec_index
            || self.profile_index != other.profile_index
            || (self.resolution_scale - other.resolution_scale).abs() > 0.05
            || self.low_latency != other.low_latency
            || (self.peak_multiplier - other.peak_multiplier).abs() > 0.1
    }
}
</content>
