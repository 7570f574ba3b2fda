//! Per-subsystem error taxonomy.
//!
//! Each subsystem gets its own `thiserror` enum so call sites can match on
//! specific failure modes; [`HostError`] only exists for the handful of
//! call sites (process startup) that need to report a single fatal error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("codec setup failed: {0}")]
    Setup(String),
    #[error("codec encode failed: {0}")]
    Encode(String),
    #[error("prewarm session not ready")]
    PrewarmNotReady,
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no displays available")]
    NoDisplay,
    #[error("capture backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum WireError {
    #[error("payload too large to fragment: {0} bytes")]
    PayloadTooLarge(usize),
    #[error("fragment out of order or missing: expected {expected}, got {got}")]
    FragmentGap { expected: u32, got: u32 },
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("encryption error: {0}")]
    Crypto(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("no session key established for peer")]
    NoSessionKey,
    #[error("peer unknown: {0}")]
    UnknownPeer(String),
}

#[derive(Error, Debug)]
pub enum TurnError {
    #[error("allocation failed: {0}")]
    Allocate(String),
    #[error("permission creation failed: {0}")]
    Permission(String),
    #[error("channel bind failed: {0}")]
    ChannelBind(String),
    #[error("send-indication failed: {0}")]
    SendIndication(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("authentication locked out for {remaining_secs}s")]
    LockedOut { remaining_secs: u64 },
    #[error("authentication denied")]
    Denied,
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
    #[error("capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("repeated failure to create an encoder session; host idle")]
    EncoderUnavailable,
}
</content>
