//! The out-of-band signalling contract hosts use to publish their reachable
//! endpoints and discover peers. Deliberately trait-only: no concrete
//! transport (HTTPS directory, pub/sub channel, ...) is implemented here.

use async_trait::async_trait;

use crate::ice::IceCandidate;

#[derive(Debug, Clone)]
pub struct HostRecord {
    pub identity: String,
    pub public_endpoint: Option<String>,
    pub candidates: Vec<IceCandidate>,
}

#[async_trait]
pub trait SignallingChannel: Send + Sync {
    async fn register_host(&self, identity: &str) -> Result<(), String>;
    async fn update_public_endpoint(&self, identity: &str, endpoint: &str) -> Result<(), String>;
    async fn save_ice_candidates(&self, identity: &str, candidates: &[IceCandidate]) -> Result<(), String>;
    async fn unregister_host(&self, identity: &str) -> Result<(), String>;
    async fn discover_my_hosts(&self, identity: &str) -> Result<Vec<HostRecord>, String>;
}

/// Interval at which a registered host should refresh its presence.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;
</content>
