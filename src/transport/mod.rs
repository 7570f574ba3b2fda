//! Transport: the UDP control/data listener, the direct-vs-relay send path,
//! and the peer table that the session manager's approvals populate.
//!
//! Registration (§ peer join) goes: (1) PendingHandshake entry created on
//! the first packet from an unknown address, (2) ECDH handshake completes
//! and a session key is derived, (3) `mark_ready` flips the peer live, (4)
//! steady-state video/input/telemetry flow. A cancel at any point before (3)
//! latches `Cancelled` so a late-arriving handshake can't resurrect a peer
//! the session manager already rejected.

pub mod peer;
pub mod stun;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::UdpSocket;

use crate::error::TransportError;
use crate::wire::{self, packet_type};
use peer::{PeerLifecycle, PeerSession};

pub struct Transport {
    socket: Arc<UdpSocket>,
    peers: Mutex<HashMap<SocketAddr, PeerSession>>,
}

impl Transport {
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| TransportError::Send(format!("binding {addr}: {e}")))?;
        Ok(Transport { socket: Arc::new(socket), peers: Mutex::new(HashMap::new()) })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Registers a brand-new peer as PendingHandshake, unless one is already
    /// on file (concurrent first packets from the same address collapse to
    /// one entry rather than racing two independent ones).
    pub fn register_pending(&self, addr: SocketAddr) {
        self.peers.lock().entry(addr).or_insert_with(|| PeerSession::new_pending(addr));
    }

    pub fn mark_ready(&self, addr: SocketAddr, session_key: crate::wire::crypto::SessionKey) {
        if let Some(peer) = self.peers.lock().get_mut(&addr) {
            peer.mark_ready(session_key);
        }
    }

    pub fn cancel(&self, addr: SocketAddr) {
        if let Some(peer) = self.peers.lock().get_mut(&addr) {
            peer.cancel();
        }
    }

    pub fn is_ready(&self, addr: SocketAddr) -> bool {
        self.peers
            .lock()
            .get(&addr)
            .map(|p| p.lifecycle == PeerLifecycle::Ready)
            .unwrap_or(false)
    }

    /// Encrypts, fragments, and sends `payload` to `addr` directly over UDP.
    /// Relay-bound peers are sent through the TURN actor instead; callers
    /// check `peer.relay` before choosing a path.
    pub async fn send_direct(&self, addr: SocketAddr, packet_type: u8, timestamp: u64, payload: &[u8]) -> Result<(), TransportError> {
        let sealed = {
            let peers = self.peers.lock();
            let peer = peers.get(&addr).ok_or_else(|| TransportError::UnknownPeer(addr.to_string()))?;
            let key = peer.session_key.as_ref().ok_or(TransportError::NoSessionKey)?;
            key.seal(payload, &addr.to_string().into_bytes())
                .map_err(|e| TransportError::Send(e.to_string()))?
        };

        for fragment in wire::fragment(packet_type, timestamp, &sealed).map_err(|e| TransportError::Send(e.to_string()))? {
            self.socket
                .send_to(&fragment, addr)
                .await
                .map_err(|e| TransportError::Send(e.to_string()))?;
        }
        Ok(())
    }

    pub async fn request_keyframe(&self, addr: SocketAddr, timestamp: u64) -> Result<(), TransportError> {
        self.send_direct(addr, packet_type::KEY_FRAME_REQUEST, timestamp, &[]).await
    }

    pub fn socket(&self) -> Arc<UdpSocket> {
        self.socket.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unready_peer_rejects_send() {
        let transport = Transport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        transport.register_pending(addr);
        let result = transport.send_direct(addr, packet_type::VIDEO_FRAME, 0, b"frame").await;
        assert!(matches!(result, Err(TransportError::NoSessionKey)));
    }

    #[tokio::test]
    async fn concurrent_first_packets_collapse_to_one_pending_entry() {
        let transport = Arc::new(Transport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap());
        let addr: SocketAddr = "127.0.0.1:7001".parse().unwrap();
        let a = transport.clone();
        let b = transport.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { a.register_pending(addr) }),
            tokio::spawn(async move { b.register_pending(addr) }),
        );
        r1.unwrap();
        r2.unwrap();
        assert_eq!(transport.peers.lock().len(), 1);
    }
}
</content>
