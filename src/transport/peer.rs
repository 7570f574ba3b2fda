//! Per-peer session state: handshake lifecycle, session key, and whether
//! traffic to this peer goes direct or through a TURN relay.

use std::net::SocketAddr;
use std::time::Instant;

use crate::wire::crypto::SessionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerLifecycle {
    PendingHandshake,
    Ready,
    Cancelled,
}

pub enum RelayBinding {
    Direct,
    Relay { channel_number: u16 },
}

pub struct PeerSession {
    pub addr: SocketAddr,
    pub lifecycle: PeerLifecycle,
    pub session_key: Option<SessionKey>,
    pub relay: RelayBinding,
    pub last_heartbeat: Instant,
}

impl PeerSession {
    pub fn new_pending(addr: SocketAddr) -> Self {
        PeerSession {
            addr,
            lifecycle: PeerLifecycle::PendingHandshake,
            session_key: None,
            relay: RelayBinding::Direct,
            last_heartbeat: Instant::now(),
        }
    }

    pub fn mark_ready(&mut self, session_key: SessionKey) {
        // A peer cancelled mid-handshake must never flip back to Ready; the
        // race is: cancel arrives on the control path while the crypto
        // handshake is still completing on the data path.
        if self.lifecycle == PeerLifecycle::Cancelled {
            return;
        }
        self.session_key = Some(session_key);
        self.lifecycle = PeerLifecycle::Ready;
    }

    pub fn cancel(&mut self) {
        self.lifecycle = PeerLifecycle::Cancelled;
        self.session_key = None;
    }

    pub fn touch_heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:6000".parse().unwrap()
    }

    #[test]
    fn new_peer_starts_pending() {
        let peer = PeerSession::new_pending(addr());
        assert_eq!(peer.lifecycle, PeerLifecycle::PendingHandshake);
    }

    #[test]
    fn cancel_during_handshake_blocks_later_ready() {
        let mut peer = PeerSession::new_pending(addr());
        peer.cancel();
        // late-arriving handshake completion must not resurrect the peer
        let fake_key = crate::wire::crypto::EphemeralKeypair::generate();
        let other = crate::wire::crypto::EphemeralKeypair::generate();
        let other_public = other.public;
        let key = fake_key.derive_session_key(&other_public);
        peer.mark_ready(key);
        assert_eq!(peer.lifecycle, PeerLifecycle::Cancelled);
    }
}
</content>
