//! Adaptive remote-desktop streaming host: capture, hardware encode, and
//! NAT-traversing transport, driven by the omniscient control engine.

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod capture_source;
mod codec_session;
mod config;
mod engine;
mod error;
mod ice;
mod input_session;
mod logging;
mod session;
mod signalling;
mod telemetry;
mod transport;
mod turn_relay;
mod wire;

use std::net::SocketAddr;

use clap::Parser;
use log::info;

use config::{Cli, HostConfig};
use error::HostError;

const APP_NAME: &str = "omniscient-host";

#[tokio::main]
async fn main() -> Result<(), HostError> {
    let cli = Cli::parse();
    let cfg = HostConfig::load(cli)?;

    logging::init(APP_NAME, &cfg.log_level).expect("logger installs exactly once at process start");

    info!(
        "starting {APP_NAME}: control_port={} input_port={} identity={}",
        cfg.control_port, cfg.input_port, cfg.host_identity
    );

    let control_addr: SocketAddr = format!("0.0.0.0:{}", cfg.control_port)
        .parse()
        .map_err(|e| HostError::Config(format!("invalid control port: {e}")))?;

    let transport = transport::Transport::bind(control_addr)
        .await
        .map_err(HostError::Transport)?;

    let engine = engine::OmniscientEngine::new(1920, 1080, cfg.tunables);
    let mut sessions = session::SessionManager::new(Vec::new());
    let mut input_injector = input_session::InputInjector::new();

    info!("bound control channel on {:?}", transport.local_addr());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received, tearing down");
                break;
            }
            _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {
                for addr in sessions.timed_out_peers() {
                    info!("peer {addr} timed out, evicting");
                    sessions.remove_peer(addr);
                    transport.cancel(addr);
                }
                let decision = engine.evaluate();
                log::debug!("engine decision: {}", decision.reason);
            }
        }
    }

    // Teardown in reverse acquisition order: encoder/injector state first,
    // then the network listener last so in-flight sends can still complete.
    drop(input_injector);
    drop(transport);
    info!("{APP_NAME} stopped");
    Ok(())
}
</content>
