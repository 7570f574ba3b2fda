//! TURN relay actor: a single tokio task owns the `turn` client so the
//! allocate/permission/channel-bind/send sequence never races itself, driven
//! by a simple command channel from the rest of the host.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use turn::client::{Client, ClientConfig};
use webrtc_util::conn::Conn;

use crate::error::TurnError;

pub enum TurnCommand {
    Allocate { reply: oneshot::Sender<Result<SocketAddr, TurnError>> },
    CreatePermission { peer: SocketAddr, reply: oneshot::Sender<Result<(), TurnError>> },
    ChannelBind { peer: SocketAddr, reply: oneshot::Sender<Result<u16, TurnError>> },
    SendData { peer: SocketAddr, data: Vec<u8>, reply: oneshot::Sender<Result<(), TurnError>> },
    Deallocate,
}

#[derive(Clone)]
pub struct TurnHandle {
    tx: mpsc::Sender<TurnCommand>,
}

impl TurnHandle {
    pub async fn allocate(&self) -> Result<SocketAddr, TurnError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(TurnCommand::Allocate { reply })
            .await
            .map_err(|_| TurnError::Allocate("actor closed".to_string()))?;
        rx.await.map_err(|_| TurnError::Allocate("actor dropped reply".to_string()))?
    }

    pub async fn create_permission(&self, peer: SocketAddr) -> Result<(), TurnError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(TurnCommand::CreatePermission { peer, reply })
            .await
            .map_err(|_| TurnError::Permission("actor closed".to_string()))?;
        rx.await.map_err(|_| TurnError::Permission("actor dropped reply".to_string()))?
    }

    pub async fn channel_bind(&self, peer: SocketAddr) -> Result<u16, TurnError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(TurnCommand::ChannelBind { peer, reply })
            .await
            .map_err(|_| TurnError::ChannelBind("actor closed".to_string()))?;
        rx.await.map_err(|_| TurnError::ChannelBind("actor dropped reply".to_string()))?
    }

    pub async fn send_data(&self, peer: SocketAddr, data: Vec<u8>) -> Result<(), TurnError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(TurnCommand::SendData { peer, data, reply })
            .await
            .map_err(|_| TurnError::SendIndication("actor closed".to_string()))?;
        rx.await.map_err(|_| TurnError::SendIndication("actor dropped reply".to_string()))?
    }

    pub async fn deallocate(&self) {
        let _ = self.tx.send(TurnCommand::Deallocate).await;
    }
}

/// Spawns the actor task and returns a cheaply-cloneable handle to it.
/// `conn` is the already-bound UDP connection the TURN client negotiates over.
pub fn spawn(conn: Arc<dyn Conn + Send + Sync>, turn_server: String, username: String, password: String) -> TurnHandle {
    let (tx, mut rx) = mpsc::channel::<TurnCommand>(64);

    tokio::spawn(async move {
        let config = ClientConfig {
            stun_serv_addr: turn_server.clone(),
            turn_serv_addr: turn_server,
            username,
            password,
            realm: String::new(),
            software: String::new(),
            rto_in_ms: 0,
            conn,
            vnet: None,
        };
        let client = match Client::new(config).await {
            Ok(c) => c,
            Err(e) => {
                log::error!("turn client construction failed: {e}");
                return;
            }
        };
        let mut allocation = None;

        while let Some(cmd) = rx.recv().await {
            match cmd {
                TurnCommand::Allocate { reply } => {
                    let result = client
                        .listen()
                        .await
                        .map_err(|e| TurnError::Allocate(e.to_string()))
                        .and_then(|_| client.allocate().map_err(|e| TurnError::Allocate(e.to_string())));
                    match result {
                        Ok(relay_conn) => {
                            let addr = relay_conn.local_addr().ok();
                            allocation = Some(relay_conn);
                            let _ = reply.send(addr.ok_or_else(|| TurnError::Allocate("no local addr".to_string())));
                        }
                        Err(e) => {
                            let _ = reply.send(Err(e));
                        }
                    }
                }
                TurnCommand::CreatePermission { peer, reply } => {
                    let result = match &allocation {
                        Some(relay_conn) => relay_conn
                            .create_permission(peer)
                            .await
                            .map_err(|e| TurnError::Permission(e.to_string())),
                        None => Err(TurnError::Permission("no allocation".to_string())),
                    };
                    let _ = reply.send(result);
                }
                TurnCommand::ChannelBind { peer, reply } => {
                    let result = match &allocation {
                        Some(relay_conn) => relay_conn
                            .bind_channel(peer)
                            .await
                            .map(|_| 0u16)
                            .map_err(|e| TurnError::ChannelBind(e.to_string())),
                        None => Err(TurnError::ChannelBind("no allocation".to_string())),
                    };
                    let _ = reply.send(result);
                }
                TurnCommand::SendData { peer, data, reply } => {
                    let result = match &allocation {
                        Some(relay_conn) => relay_conn
                            .send_to(&data, peer)
                            .await
                            .map(|_| ())
                            .map_err(|e| TurnError::SendIndication(e.to_string())),
                        None => Err(TurnError::SendIndication("no allocation".to_string())),
                    };
                    let _ = reply.send(result);
                }
                TurnCommand::Deallocate => {
                    allocation = None;
                    client.close().await.ok();
                    break;
                }
            }
        }
    });

    TurnHandle { tx }
}
</content>
