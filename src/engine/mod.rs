//! The omniscient control engine: the cascaded decision function that turns
//! network, device, content, and input signals into a single `QualityDecision`.
//!
//! Five levels run in order, each able to veto or narrow what the levels
//! before it proposed: Emergency, Network gate, Device gate, Content
//! adaptation, Mode policy. Hysteresis and cooldowns live here, not in the
//! callers, so a flapping signal can never thrash the encoder.

pub mod activity;
pub mod encoder_load;
pub mod types;

use std::time::Instant;

use parking_lot::Mutex;

use crate::config::EngineTunables;
use types::{
    ActivityLevel, ClientMetrics, CodecKind, EngineMode, HostMetrics, InputPhysics,
    NetworkMetrics, NetworkQualityLevel, ProfileKind, QualityDecision, ThermalLevel,
};

pub use activity::{DirtyRect, ScreenActivityTracker};
pub use encoder_load::EncoderLoadTracker;

#[derive(Debug, Clone, Copy, Default)]
struct Signals {
    network_quality: Option<NetworkQualityLevel>,
    network: NetworkMetrics,
    host: HostMetrics,
    client: ClientMetrics,
    input: InputPhysics,
    zoom_scale: f64,
}

struct Cooldowns {
    last_mode_change: Option<Instant>,
    last_codec_change: Option<Instant>,
    last_retina_switch: Option<Instant>,
    last_quality_change: Option<Instant>,
    load_penalty_until: Option<Instant>,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Cooldowns {
            last_mode_change: None,
            last_codec_change: None,
            last_retina_switch: None,
            last_quality_change: None,
            load_penalty_until: None,
        }
    }
}

struct EngineState {
    mode: EngineMode,
    capture_scale: f64,
    cooldowns: Cooldowns,
    last_decision: Option<QualityDecision>,
}

impl Default for EngineState {
    fn default() -> Self {
        EngineState {
            mode: EngineMode::Balanced,
            capture_scale: 1.0,
            cooldowns: Cooldowns::default(),
            last_decision: None,
        }
    }
}

/// The cascade. One instance per peer session: signals and cooldowns are not
/// meaningfully shared across independently-adapting viewers.
pub struct OmniscientEngine {
    signals: Mutex<Signals>,
    state: Mutex<EngineState>,
    activity: Mutex<ScreenActivityTracker>,
    encoder_load: Mutex<EncoderLoadTracker>,
    tunables: EngineTunables,
    on_quality_changed: Mutex<Option<Box<dyn Fn(&QualityDecision) + Send>>>,
}

impl OmniscientEngine {
    pub fn new(screen_width: u32, screen_height: u32, tunables: EngineTunables) -> Self {
        OmniscientEngine {
            signals: Mutex::new(Signals {
                zoom_scale: 1.0,
                ..Signals::default()
            }),
            state: Mutex::new(EngineState::default()),
            activity: Mutex::new(ScreenActivityTracker::new(screen_width, screen_height)),
            encoder_load: Mutex::new(EncoderLoadTracker::new()),
            tunables,
            on_quality_changed: Mutex::new(None),
        }
    }

    /// Registers the sink `evaluate` invokes whenever the decision actually
    /// changes and the quality-change cooldown (bypassed by Emergency) has
    /// elapsed.
    pub fn set_on_quality_changed(&self, sink: impl Fn(&QualityDecision) + Send + 'static) {
        *self.on_quality_changed.lock() = Some(Box::new(sink));
    }

    /// Fires the sink iff `decision` differs from the previous one on file
    /// and (unless `bypass_cooldown`, which Emergency sets) the quality-change
    /// cooldown has elapsed. Must run before `state.last_decision` is overwritten.
    fn maybe_notify(&self, state: &mut EngineState, decision: &QualityDecision, bypass_cooldown: bool, now: Instant) {
        let changed = state.last_decision.as_ref().map(|prev| decision.differs_from(prev)).unwrap_or(true);
        let cooldown_elapsed = bypass_cooldown
            || state
                .cooldowns
                .last_quality_change
                .map(|t| now.duration_since(t).as_secs() >= self.tunables.quality_change_cooldown_secs)
                .unwrap_or(true);
        if changed && cooldown_elapsed {
            state.cooldowns.last_quality_change = Some(now);
            if let Some(sink) = self.on_quality_changed.lock().as_ref() {
                sink(decision);
            }
        }
    }

    pub fn activity_tracker(&self) -> &Mutex<ScreenActivityTracker> {
        &self.activity
    }

    pub fn encoder_load_tracker(&self) -> &Mutex<EncoderLoadTracker> {
        &self.encoder_load
    }

    pub fn set_network(&self, level: NetworkQualityLevel, metrics: NetworkMetrics) {
        let mut s = self.signals.lock();
        s.network_quality = Some(level);
        s.network = metrics;
    }

    pub fn set_host_metrics(&self, host: HostMetrics) {
        self.signals.lock().host = host;
    }

    pub fn set_client_metrics(&self, client: ClientMetrics) {
        self.signals.lock().client = client;
    }

    pub fn set_input_physics(&self, input: InputPhysics) {
        self.signals.lock().input = input;
    }

    pub fn set_zoom_scale(&self, zoom: f64) {
        self.signals.lock().zoom_scale = zoom;
    }

    /// Run the full cascade and produce the next decision. Pure given the
    /// signals currently on file; cooldowns are the only hidden state that
    /// makes two calls with identical signals potentially diverge.
    pub fn evaluate(&self) -> QualityDecision {
        let signals = *self.signals.lock();
        let motion_ema = self.activity.lock().motion_ema();
        let static_duration = self.activity.lock().static_duration_secs();
        let encoder_overloaded = self.encoder_load.lock().is_overloaded();
        let encoder_critical = self.encoder_load.lock().is_critical();
        let mut state = self.state.lock();
        let now = Instant::now();

        // Level 0: emergency overrides everything else. Three triggers, any one fires it:
        // encoder-drop critical (>20%), client thermal critical (>=3), packet loss >10%.
        let loss_critical = signals.network.loss_rate > 0.10;
        if encoder_critical || signals.client.thermal >= ThermalLevel::Critical || loss_critical {
            let reason = format!(
                "emergency: encoder_critical={encoder_critical} client_thermal={:?} loss_rate={:.3}",
                signals.client.thermal, signals.network.loss_rate
            );
            let (codec_index, profile_index) = state
                .last_decision
                .as_ref()
                .map(|prev| (prev.codec_index, prev.profile_index))
                .unwrap_or((CodecKind::H264, ProfileKind::Baseline));
            let decision = QualityDecision {
                bitrate_mbps: 5.0,
                target_fps: 15,
                key_frame_interval: 15,
                quality_value: 0.5,
                codec_index,
                profile_index,
                capture_scale: 1.0,
                resolution_scale: 0.5,
                low_latency: true,
                peak_multiplier: 1.0,
                reason,
            };
            state.cooldowns.load_penalty_until =
                Some(now + std::time::Duration::from_secs(self.tunables.load_penalty_secs));
            self.maybe_notify(&mut state, &decision, true, now);
            state.last_decision = Some(decision.clone());
            return decision;
        }

        // Level 1: network gate.
        let network_quality = signals.network_quality.unwrap_or(NetworkQualityLevel::Moderate);
        let bw = signals.network.bandwidth_mbps.max(0.0);
        let (bitrate_ceiling, fps_ceiling, retina_allowed) = match network_quality {
            NetworkQualityLevel::Excellent => ((0.9 * bw).min(100.0), 120u32, true),
            NetworkQualityLevel::Good => ((0.8 * bw).min(60.0), 60u32, true),
            NetworkQualityLevel::Moderate => ((0.7 * bw).min(25.0), 30u32, false),
            NetworkQualityLevel::Poor => ((0.5 * bw).min(15.0), 30u32, false),
        };
        let loss_override_kf = signals.network.loss_rate > 0.03;

        // Level 2: device gate. Every applicable cap narrows via min().
        let mut fps_cap = f64::INFINITY;
        let mut res_cap = 1.0f64;
        if signals.host.cpu > 0.8 {
            fps_cap = fps_cap.min(30.0);
            res_cap = res_cap.min(0.75);
        } else if signals.host.cpu > 0.6 {
            fps_cap = fps_cap.min(60.0);
        }
        if signals.host.thermal >= ThermalLevel::Serious {
            fps_cap = fps_cap.min(30.0);
            res_cap = res_cap.min(0.5);
        }
        if signals.client.battery < 0.15 && !signals.client.is_charging {
            fps_cap = fps_cap.min(24.0);
        }
        if signals.client.thermal >= ThermalLevel::Serious {
            fps_cap = fps_cap.min(30.0);
        }
        let load_penalty_active = state
            .cooldowns
            .load_penalty_until
            .map(|until| now < until)
            .unwrap_or(false);
        if encoder_overloaded {
            state.cooldowns.load_penalty_until =
                Some(now + std::time::Duration::from_secs(self.tunables.load_penalty_secs));
        }
        if encoder_overloaded || load_penalty_active {
            res_cap = res_cap.min(0.75);
        }

        // Level 3: content adaptation.
        let activity_level = ActivityLevel::from_motion_ratio(motion_ema);
        let deep_static = activity_level == ActivityLevel::Static
            && static_duration >= self.tunables.static_duration_for_retina_secs;
        let (content_quality, content_bitrate_adjust, content_fps_target, content_kf) = if deep_static {
            (0.95, 0.5, 30u32, 120u32)
        } else if activity_level != ActivityLevel::Heavy {
            (0.80, 1.0, 60u32, 60u32)
        } else {
            (0.70, 1.3, 60u32, 30u32)
        };

        let retina_cooldown_elapsed = state
            .cooldowns
            .last_retina_switch
            .map(|t| now.duration_since(t).as_secs() >= self.tunables.retina_switch_cooldown_secs)
            .unwrap_or(true);
        let wants_retina = retina_allowed
            && (signals.zoom_scale >= 1.5
                || (deep_static && retina_cooldown_elapsed && !encoder_overloaded));
        let capture_scale = if wants_retina { 2.0 } else { 1.0 };
        if (capture_scale - state.capture_scale).abs() > f64::EPSILON {
            state.cooldowns.last_retina_switch = Some(now);
            state.capture_scale = capture_scale;
        }

        // Level 4: mode policy. MECE, most-specific-first.
        let low_battery = signals.client.battery < 0.20 && !signals.client.is_charging;
        let proposed_mode = if low_battery
            || signals.host.thermal >= ThermalLevel::Serious
            || signals.client.thermal >= ThermalLevel::Serious
        {
            EngineMode::Eco
        } else if signals.network.loss_rate > 0.05
            || bw < 5.0
            || network_quality == NetworkQualityLevel::Poor
        {
            EngineMode::NetworkLimited
        } else if static_duration > 3.0
            && matches!(network_quality, NetworkQualityLevel::Excellent | NetworkQualityLevel::Good)
        {
            EngineMode::Quality
        } else if activity_level == ActivityLevel::Heavy
            && matches!(network_quality, NetworkQualityLevel::Excellent | NetworkQualityLevel::Good)
        {
            EngineMode::Performance
        } else {
            EngineMode::Balanced
        };

        let mode_cooldown_elapsed = state
            .cooldowns
            .last_mode_change
            .map(|t| now.duration_since(t).as_secs() >= self.tunables.mode_cooldown_secs)
            .unwrap_or(true);
        let mode = if proposed_mode != state.mode && !mode_cooldown_elapsed {
            state.mode
        } else {
            if proposed_mode != state.mode {
                state.cooldowns.last_mode_change = Some(now);
            }
            state.mode = proposed_mode;
            proposed_mode
        };

        let profile = mode.profile();

        let codec_cooldown_elapsed = state
            .cooldowns
            .last_codec_change
            .map(|t| now.duration_since(t).as_secs() >= self.tunables.codec_cooldown_secs)
            .unwrap_or(true);
        let (codec_index, profile_index) = match &state.last_decision {
            Some(prev) if prev.codec_index != profile.codec && !codec_cooldown_elapsed => {
                (prev.codec_index, prev.profile_index)
            }
            _ => {
                if state
                    .last_decision
                    .as_ref()
                    .map(|p| p.codec_index != profile.codec)
                    .unwrap_or(false)
                {
                    state.cooldowns.last_codec_change = Some(now);
                }
                (profile.codec, profile.profile)
            }
        };

        let bitrate_mbps = profile
            .bitrate_mbps
            .min(bitrate_ceiling)
            * content_bitrate_adjust;
        let bitrate_mbps = bitrate_mbps.min(bitrate_ceiling).max(0.5);

        let target_fps = (profile.fps as f64)
            .min(fps_ceiling as f64)
            .min(fps_cap)
            .min(content_fps_target as f64)
            .max(1.0) as u32;

        let mut key_frame_interval = profile.keyframe_interval.min(content_kf);
        if loss_override_kf {
            key_frame_interval = key_frame_interval.min(15);
        }
        let key_frame_interval = key_frame_interval.max(1);

        let quality_value = profile.quality.max(content_quality).clamp(0.0, 1.0);
        let resolution_scale = profile.resolution_scale.min(res_cap);

        let reason = format!(
            "mode={mode:?} network={network_quality:?} activity={activity_level:?} overloaded={encoder_overloaded}"
        );

        let decision = QualityDecision {
            bitrate_mbps,
            target_fps,
            key_frame_interval,
            quality_value,
            codec_index,
            profile_index,
            capture_scale,
            resolution_scale,
            low_latency: profile.low_latency,
            peak_multiplier: profile.peak_multiplier,
            reason,
        };
        self.maybe_notify(&mut state, &decision, false, now);
        state.last_decision = Some(decision.clone());
        decision
    }

    /// Whether `next` should actually be pushed to the peer, versus suppressed
    /// as a no-op given the last decision that was actually sent.
    pub fn should_apply(previous: Option<&QualityDecision>, next: &QualityDecision) -> bool {
        match previous {
            None => true,
            Some(prev) => next.differs_from(prev),
        }
    }
}

/// Classifies raw network metrics into the four discrete quality levels used
/// by the cascade. Producers (the transport's RTT/loss monitor) call this;
/// the engine itself only ever reads the level it's told.
pub fn classify_network_quality(metrics: &NetworkMetrics) -> NetworkQualityLevel {
    if metrics.rtt_s < 0.03 && metrics.loss_rate < 0.01 && metrics.bandwidth_mbps >= 20.0 {
        NetworkQualityLevel::Excellent
    } else if metrics.rtt_s < 0.08 && metrics.loss_rate < 0.02 && metrics.bandwidth_mbps >= 8.0 {
        NetworkQualityLevel::Good
    } else if metrics.rtt_s < 0.2 && metrics.loss_rate < 0.05 && metrics.bandwidth_mbps >= 3.0 {
        NetworkQualityLevel::Moderate
    } else {
        NetworkQualityLevel::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ClientMetrics, HostMetrics};

    fn engine() -> OmniscientEngine {
        OmniscientEngine::new(1920, 1080, EngineTunables::default())
    }

    #[test]
    fn excellent_network_light_load_yields_balanced_or_better() {
        let e = engine();
        e.set_network(
            NetworkQualityLevel::Excellent,
            NetworkMetrics { rtt_s: 0.003, loss_rate: 0.0, jitter_s: 0.001, bandwidth_mbps: 80.0 },
        );
        e.set_host_metrics(HostMetrics { cpu: 0.2, memory: 0.3, thermal: ThermalLevel::Nominal });
        e.set_client_metrics(ClientMetrics {
            battery: 0.9,
            is_charging: true,
            thermal: ThermalLevel::Nominal,
            low_power: false,
            current_fps: 60.0,
        });
        for _ in 0..30 {
            e.activity.lock().record_dirty_rects(&[DirtyRect { width: 1920, height: 1080 }]);
        }
        let d = e.evaluate();
        assert!(d.target_fps >= 30);
        assert!(d.bitrate_mbps > 0.0);
    }

    #[test]
    fn critical_client_thermal_forces_emergency_profile() {
        let e = engine();
        e.set_client_metrics(ClientMetrics {
            battery: 0.5,
            is_charging: false,
            thermal: ThermalLevel::Critical,
            low_power: false,
            current_fps: 30.0,
        });
        let d = e.evaluate();
        assert_eq!(d.bitrate_mbps, 5.0);
        assert_eq!(d.target_fps, 15);
        assert_eq!(d.key_frame_interval, 15);
        assert_eq!(d.resolution_scale, 0.5);
        assert!(d.low_latency);
        assert!(d.reason.contains("emergency"));
    }

    #[test]
    fn severe_packet_loss_triggers_emergency() {
        let e = engine();
        e.set_network(
            NetworkQualityLevel::Good,
            NetworkMetrics { rtt_s: 0.02, loss_rate: 0.15, jitter_s: 0.0, bandwidth_mbps: 50.0 },
        );
        let d = e.evaluate();
        assert_eq!(d.bitrate_mbps, 5.0);
        assert_eq!(d.target_fps, 15);
        assert!(d.reason.contains("emergency"));
    }

    #[test]
    fn emergency_holds_previous_codec_and_profile() {
        let e = engine();
        // First, a normal decision picks a codec/profile via the mode cascade.
        e.set_network(
            NetworkQualityLevel::Excellent,
            NetworkMetrics { rtt_s: 0.003, loss_rate: 0.0, jitter_s: 0.0, bandwidth_mbps: 50.0 },
        );
        for _ in 0..30 {
            e.activity.lock().record_static_frame();
        }
        let before = e.evaluate();

        // Then the client's thermal goes critical: Emergency must not reconfigure the encoder.
        e.set_client_metrics(ClientMetrics {
            battery: 0.5,
            is_charging: false,
            thermal: ThermalLevel::Critical,
            low_power: false,
            current_fps: 30.0,
        });
        let during = e.evaluate();
        assert_eq!(during.codec_index, before.codec_index);
        assert_eq!(during.profile_index, before.profile_index);
    }

    #[test]
    fn emergency_starts_the_load_penalty_window() {
        let e = engine();
        e.set_client_metrics(ClientMetrics {
            battery: 0.5,
            is_charging: false,
            thermal: ThermalLevel::Critical,
            low_power: false,
            current_fps: 30.0,
        });
        e.evaluate();
        let until = e.state.lock().cooldowns.load_penalty_until;
        assert!(until.is_some_and(|t| t > Instant::now()));
    }

    #[test]
    fn quality_value_takes_the_max_not_the_average() {
        let e = engine();
        // Moderate network keeps the mode cascade on Balanced (quality 0.75)
        // even though heavy motion alone would drag content_quality to 0.70.
        // max(0.75, 0.70) = 0.75; an average would wrongly yield 0.725.
        e.set_network(
            NetworkQualityLevel::Moderate,
            NetworkMetrics { rtt_s: 0.05, loss_rate: 0.0, jitter_s: 0.0, bandwidth_mbps: 20.0 },
        );
        for _ in 0..30 {
            e.activity.lock().record_dirty_rects(&[DirtyRect { width: 1920, height: 1080 }]);
        }
        let d = e.evaluate();
        assert_eq!(d.quality_value, 0.75);
    }

    #[test]
    fn quality_change_notifications_are_cooldown_throttled() {
        let e = engine();
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let calls_clone = calls.clone();
        e.set_on_quality_changed(move |_| {
            calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        e.set_network(
            NetworkQualityLevel::Excellent,
            NetworkMetrics { rtt_s: 0.003, loss_rate: 0.0, jitter_s: 0.0, bandwidth_mbps: 80.0 },
        );
        e.evaluate();
        e.set_network(
            NetworkQualityLevel::Poor,
            NetworkMetrics { rtt_s: 0.3, loss_rate: 0.0, jitter_s: 0.0, bandwidth_mbps: 2.0 },
        );
        e.evaluate();
        // Both decisions differ, but the second arrives inside the
        // quality-change cooldown window, so it must be suppressed.
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn emergency_bypasses_the_quality_change_cooldown() {
        let e = engine();
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let calls_clone = calls.clone();
        e.set_on_quality_changed(move |_| {
            calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        e.evaluate();
        e.set_client_metrics(ClientMetrics {
            battery: 0.5,
            is_charging: false,
            thermal: ThermalLevel::Critical,
            low_power: false,
            current_fps: 30.0,
        });
        e.evaluate();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn low_battery_not_charging_selects_eco_mode() {
        let e = engine();
        e.set_network(
            NetworkQualityLevel::Excellent,
            NetworkMetrics { rtt_s: 0.003, loss_rate: 0.0, jitter_s: 0.0, bandwidth_mbps: 50.0 },
        );
        e.set_client_metrics(ClientMetrics {
            battery: 0.1,
            is_charging: false,
            thermal: ThermalLevel::Nominal,
            low_power: true,
            current_fps: 30.0,
        });
        let d = e.evaluate();
        assert!(d.target_fps <= 24);
    }

    #[test]
    fn poor_network_selects_network_limited_profile() {
        let e = engine();
        e.set_network(
            NetworkQualityLevel::Poor,
            NetworkMetrics { rtt_s: 0.3, loss_rate: 0.1, jitter_s: 0.05, bandwidth_mbps: 2.0 },
        );
        let d = e.evaluate();
        assert!(d.bitrate_mbps <= 15.0);
        assert!(d.key_frame_interval <= 15);
    }

    #[test]
    fn deep_static_content_raises_quality_target() {
        let e = engine();
        e.set_network(
            NetworkQualityLevel::Excellent,
            NetworkMetrics { rtt_s: 0.003, loss_rate: 0.0, jitter_s: 0.0, bandwidth_mbps: 50.0 },
        );
        for _ in 0..30 {
            e.activity.lock().record_static_frame();
        }
        let d = e.evaluate();
        assert!(d.quality_value > 0.6);
    }

    #[test]
    fn classify_network_quality_buckets_thresholds() {
        let excellent = NetworkMetrics { rtt_s: 0.01, loss_rate: 0.0, jitter_s: 0.0, bandwidth_mbps: 50.0 };
        assert_eq!(classify_network_quality(&excellent), NetworkQualityLevel::Excellent);
        let poor = NetworkMetrics { rtt_s: 0.5, loss_rate: 0.2, jitter_s: 0.1, bandwidth_mbps: 1.0 };
        assert_eq!(classify_network_quality(&poor), NetworkQualityLevel::Poor);
    }
}
</content>
