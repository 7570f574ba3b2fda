//! Hardware-encoder session contract, grounded in the teacher's `codec.rs`
//! but generalized from a single fixed VP8 path to the session lifecycle the
//! omniscient engine drives: setup, steady-state encode, forced keyframes,
//! runtime parameter updates, and prewarmed hot-swaps.

use crate::engine::types::{CodecKind, ProfileKind, QualityDecision};
use crate::error::CodecError;

#[derive(Debug, Clone, Copy)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub bitrate_mbps: f64,
    pub fps: u32,
    pub key_frame_interval: u32,
    pub codec: CodecKind,
    pub profile: ProfileKind,
}

impl EncoderConfig {
    pub fn from_decision(width: u32, height: u32, decision: &QualityDecision) -> Self {
        EncoderConfig {
            width,
            height,
            bitrate_mbps: decision.bitrate_mbps,
            fps: decision.target_fps,
            key_frame_interval: decision.key_frame_interval,
            codec: decision.codec_index,
            profile: decision.profile_index,
        }
    }
}

/// One encoded access unit plus the parameter sets that must precede it on a
/// codec or resolution switch (VPS/SPS/PPS for HEVC, SPS/PPS for H.264).
pub struct EncodedFrame {
    pub is_key_frame: bool,
    pub parameter_sets: Vec<Vec<u8>>,
    pub payload: Vec<u8>,
}

/// The lifecycle a concrete hardware (or software-fallback) encoder session
/// must implement. A real backend wraps a platform encoder (VideoToolbox,
/// NVENC, VAAPI, ...); this trait is the seam the engine's decisions cross.
pub trait CodecSession: Send {
    fn setup(&mut self, config: EncoderConfig) -> Result<(), CodecError>;
    fn encode(&mut self, frame_rgba: &[u8]) -> Result<EncodedFrame, CodecError>;
    fn force_keyframe(&mut self);
    fn update_runtime_parameters(&mut self, config: EncoderConfig) -> Result<(), CodecError>;
    /// Build a second session on the side so a later switch costs one frame,
    /// not a multi-frame encoder restart stall.
    fn prewarm(&mut self, config: EncoderConfig) -> Result<(), CodecError>;
    fn swap_to_prewarmed(&mut self) -> Result<(), CodecError>;
    fn teardown(&mut self);
}

/// A software reference implementation: produces structurally valid encoded
/// frames (parameter sets on keyframes, a payload derived from the input) so
/// the rest of the pipeline can be exercised without a platform encoder.
pub struct SoftwareCodecSession {
    config: Option<EncoderConfig>,
    prewarmed: Option<EncoderConfig>,
    frames_since_keyframe: u32,
    force_next_keyframe: bool,
}

impl SoftwareCodecSession {
    pub fn new() -> Self {
        SoftwareCodecSession {
            config: None,
            prewarmed: None,
            frames_since_keyframe: 0,
            force_next_keyframe: true,
        }
    }

    fn parameter_sets(config: &EncoderConfig) -> Vec<Vec<u8>> {
        match config.codec {
            CodecKind::H264 => vec![b"SPS".to_vec(), b"PPS".to_vec()],
            CodecKind::Hevc => vec![b"VPS".to_vec(), b"SPS".to_vec(), b"PPS".to_vec()],
        }
    }
}

impl Default for SoftwareCodecSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecSession for SoftwareCodecSession {
    fn setup(&mut self, config: EncoderConfig) -> Result<(), CodecError> {
        if config.width == 0 || config.height == 0 {
            return Err(CodecError::Setup("zero-sized frame".to_string()));
        }
        self.config = Some(config);
        self.frames_since_keyframe = 0;
        self.force_next_keyframe = true;
        Ok(())
    }

    fn encode(&mut self, frame_rgba: &[u8]) -> Result<EncodedFrame, CodecError> {
        let config = self.config.ok_or_else(|| CodecError::Encode("session not set up".to_string()))?;
        let is_key_frame = self.force_next_keyframe || self.frames_since_keyframe >= config.key_frame_interval;
        self.force_next_keyframe = false;
        self.frames_since_keyframe = if is_key_frame { 0 } else { self.frames_since_keyframe + 1 };

        let parameter_sets = if is_key_frame { Self::parameter_sets(&config) } else { Vec::new() };
        Ok(EncodedFrame { is_key_frame, parameter_sets, payload: frame_rgba.to_vec() })
    }

    fn force_keyframe(&mut self) {
        self.force_next_keyframe = true;
    }

    fn update_runtime_parameters(&mut self, config: EncoderConfig) -> Result<(), CodecError> {
        let current = self.config.ok_or(CodecError::PrewarmNotReady)?;
        if current.codec != config.codec || current.width != config.width || current.height != config.height {
            return Err(CodecError::Setup(
                "codec or frame-size change requires prewarm/swap, not an in-place update".to_string(),
            ));
        }
        self.config = Some(config);
        Ok(())
    }

    fn prewarm(&mut self, config: EncoderConfig) -> Result<(), CodecError> {
        self.prewarmed = Some(config);
        Ok(())
    }

    fn swap_to_prewarmed(&mut self) -> Result<(), CodecError> {
        let config = self.prewarmed.take().ok_or(CodecError::PrewarmNotReady)?;
        self.config = Some(config);
        self.frames_since_keyframe = 0;
        self.force_next_keyframe = true;
        Ok(())
    }

    fn teardown(&mut self) {
        self.config = None;
        self.prewarmed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EncoderConfig {
        EncoderConfig {
            width: 1920,
            height: 1080,
            bitrate_mbps: 20.0,
            fps: 60,
            key_frame_interval: 3,
            codec: CodecKind::H264,
            profile: ProfileKind::Main,
        }
    }

    #[test]
    fn first_frame_after_setup_is_always_a_keyframe() {
        let mut session = SoftwareCodecSession::new();
        session.setup(config()).unwrap();
        let frame = session.encode(&[0u8; 16]).unwrap();
        assert!(frame.is_key_frame);
        assert!(!frame.parameter_sets.is_empty());
    }

    #[test]
    fn keyframe_interval_is_honored() {
        let mut session = SoftwareCodecSession::new();
        session.setup(config()).unwrap();
        let kinds: Vec<bool> = (0..6).map(|_| session.encode(&[0u8; 4]).unwrap().is_key_frame).collect();
        assert_eq!(kinds, vec![true, false, false, true, false, false]);
    }

    #[test]
    fn force_keyframe_overrides_the_interval() {
        let mut session = SoftwareCodecSession::new();
        session.setup(config()).unwrap();
        session.encode(&[0u8; 4]).unwrap();
        session.force_keyframe();
        let frame = session.encode(&[0u8; 4]).unwrap();
        assert!(frame.is_key_frame);
    }

    #[test]
    fn swap_to_prewarmed_without_prewarm_fails() {
        let mut session = SoftwareCodecSession::new();
        session.setup(config()).unwrap();
        assert!(session.swap_to_prewarmed().is_err());
    }

    #[test]
    fn prewarm_then_swap_switches_codec() {
        let mut session = SoftwareCodecSession::new();
        session.setup(config()).unwrap();
        let mut hevc_config = config();
        hevc_config.codec = CodecKind::Hevc;
        session.prewarm(hevc_config).unwrap();
        session.swap_to_prewarmed().unwrap();
        let frame = session.encode(&[0u8; 4]).unwrap();
        assert!(frame.is_key_frame);
        assert_eq!(frame.parameter_sets.len(), 3);
    }
}
</content>
