//! One-shot STUN binding request: discovers this host's server-reflexive
//! (public) address for direct-mode candidates, without a full ICE agent.

use std::net::SocketAddr;
use std::time::Duration;

use stun::agent::TransactionId;
use stun::message::{Message, BINDING_REQUEST};
use stun::xoraddr::XorMappedAddress;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::TransportError;

const STUN_TIMEOUT: Duration = Duration::from_secs(3);

/// Sends a single STUN binding request over `socket` to `stun_server` and
/// returns the reflexive address the server observed.
pub async fn discover_reflexive_addr(
    socket: &UdpSocket,
    stun_server: &str,
) -> Result<SocketAddr, TransportError> {
    let server_addr = tokio::net::lookup_host(stun_server)
        .await
        .map_err(|e| TransportError::Send(format!("resolving stun server: {e}")))?
        .next()
        .ok_or_else(|| TransportError::Send("stun server did not resolve".to_string()))?;

    let mut request = Message::new();
    request.build(&[Box::new(TransactionId::new()), Box::new(BindingRequestType)])
        .map_err(|e| TransportError::Send(format!("building stun request: {e}")))?;
    request.typ = BINDING_REQUEST;

    socket
        .send_to(&request.raw, server_addr)
        .await
        .map_err(|e| TransportError::Send(e.to_string()))?;

    let mut buf = [0u8; 512];
    let (len, _) = timeout(STUN_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .map_err(|_| TransportError::Receive("stun request timed out".to_string()))?
        .map_err(|e| TransportError::Receive(e.to_string()))?;

    let mut response = Message::new();
    response.raw = buf[..len].to_vec();
    response
        .decode()
        .map_err(|e| TransportError::Receive(format!("decoding stun response: {e}")))?;

    let mut xor_addr = XorMappedAddress::default();
    xor_addr
        .get_from(&response)
        .map_err(|e| TransportError::Receive(format!("no XOR-MAPPED-ADDRESS: {e}")))?;

    Ok(SocketAddr::new(xor_addr.ip, xor_addr.port))
}

struct BindingRequestType;

impl stun::message::Setter for BindingRequestType {
    fn add_to(&self, m: &mut Message) -> Result<(), stun::Error> {
        m.typ = BINDING_REQUEST;
        Ok(())
    }
}
</content>
