//! Connection approval and peer bookkeeping: identity-based auto-approve,
//! a 3-failed-prompt lockout, and heartbeat-timeout eviction.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::error::SessionError;

const MAX_FAILED_PROMPTS: u32 = 3;
const LOCKOUT_SECS: u64 = 30;
const HEARTBEAT_TIMEOUT_SECS: u64 = 30;

struct LockoutState {
    failed_prompts: u32,
    locked_until: Option<Instant>,
}

impl Default for LockoutState {
    fn default() -> Self {
        LockoutState { failed_prompts: 0, locked_until: None }
    }
}

struct PeerRecord {
    last_heartbeat: Instant,
}

/// Approves or denies incoming connection attempts and tracks which peers
/// are currently live, independent of the transport's own PeerSession table.
pub struct SessionManager {
    approved_identities: Vec<String>,
    lockouts: HashMap<SocketAddr, LockoutState>,
    peers: HashMap<SocketAddr, PeerRecord>,
}

impl SessionManager {
    pub fn new(approved_identities: Vec<String>) -> Self {
        SessionManager {
            approved_identities,
            lockouts: HashMap::new(),
            peers: HashMap::new(),
        }
    }

    /// Evaluates an incoming handshake attempt from `addr` claiming `identity`.
    pub fn evaluate(&mut self, addr: SocketAddr, identity: &str) -> Result<(), SessionError> {
        if let Some(lockout) = self.lockouts.get(&addr) {
            if let Some(until) = lockout.locked_until {
                let now = Instant::now();
                if now < until {
                    return Err(SessionError::LockedOut { remaining_secs: (until - now).as_secs() });
                }
            }
        }

        if self.approved_identities.is_empty() || self.approved_identities.iter().any(|i| i == identity) {
            self.lockouts.remove(&addr);
            self.peers.insert(addr, PeerRecord { last_heartbeat: Instant::now() });
            return Ok(());
        }

        let lockout = self.lockouts.entry(addr).or_default();
        lockout.failed_prompts += 1;
        if lockout.failed_prompts >= MAX_FAILED_PROMPTS {
            lockout.locked_until = Some(Instant::now() + Duration::from_secs(LOCKOUT_SECS));
        }
        Err(SessionError::Denied)
    }

    pub fn record_heartbeat(&mut self, addr: SocketAddr) {
        if let Some(peer) = self.peers.get_mut(&addr) {
            peer.last_heartbeat = Instant::now();
        }
    }

    /// Peers whose heartbeat has gone silent for longer than the timeout.
    pub fn timed_out_peers(&self) -> Vec<SocketAddr> {
        let now = Instant::now();
        self.peers
            .iter()
            .filter(|(_, rec)| now.duration_since(rec.last_heartbeat).as_secs() > HEARTBEAT_TIMEOUT_SECS)
            .map(|(addr, _)| *addr)
            .collect()
    }

    pub fn remove_peer(&mut self, addr: SocketAddr) {
        self.peers.remove(&addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[test]
    fn known_identity_is_auto_approved() {
        let mut mgr = SessionManager::new(vec!["alice".to_string()]);
        assert!(mgr.evaluate(addr(), "alice").is_ok());
    }

    #[test]
    fn three_failures_trigger_lockout() {
        let mut mgr = SessionManager::new(vec!["alice".to_string()]);
        for _ in 0..3 {
            assert!(mgr.evaluate(addr(), "mallory").is_err());
        }
        match mgr.evaluate(addr(), "alice") {
            Err(SessionError::LockedOut { .. }) => {}
            other => panic!("expected lockout, got {other:?}"),
        }
    }

    #[test]
    fn empty_allowlist_auto_approves_everyone() {
        let mut mgr = SessionManager::new(vec![]);
        assert!(mgr.evaluate(addr(), "anyone").is_ok());
    }

    #[test]
    fn fresh_peer_is_not_timed_out() {
        let mut mgr = SessionManager::new(vec![]);
        mgr.evaluate(addr(), "anyone").unwrap();
        assert!(mgr.timed_out_peers().is_empty());
    }
}
</content>
