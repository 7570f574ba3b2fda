//! ICE candidate type shared between the STUN/TURN discovery paths and the
//! (unimplemented) signalling contract.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Host,
    Srflx,
    Relay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceCandidate {
    #[serde(rename = "type")]
    pub kind: CandidateKind,
    pub ip: IpAddr,
    pub port: u16,
    pub priority: u32,
}
</content>
