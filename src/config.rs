//! Process configuration: CLI flags, optional TOML file, and the cooldown/threshold
//! constants from the spec exposed for tuning. Precedence is flag > env > file > default.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::HostError;

#[derive(Parser, Debug, Clone)]
#[command(name = "omniscient-host", version, about = "Adaptive remote-desktop streaming host")]
pub struct Cli {
    /// Optional path to a TOML config file; CLI flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub control_port: Option<u16>,

    #[arg(long)]
    pub input_port: Option<u16>,

    #[arg(long)]
    pub stun_server: Option<String>,

    #[arg(long)]
    pub turn_server: Option<String>,

    #[arg(long)]
    pub turn_username: Option<String>,

    #[arg(long)]
    pub turn_password: Option<String>,

    #[arg(long)]
    pub host_identity: Option<String>,

    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub control_port: Option<u16>,
    pub input_port: Option<u16>,
    pub stun_server: Option<String>,
    pub turn_server: Option<String>,
    pub turn_username: Option<String>,
    pub turn_password: Option<String>,
    pub host_identity: Option<String>,
    pub log_level: Option<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        FileConfig {
            control_port: None,
            input_port: None,
            stun_server: None,
            turn_server: None,
            turn_username: None,
            turn_password: None,
            host_identity: None,
            log_level: None,
        }
    }
}

/// Cooldown and threshold constants from the spec, overridable for tuning/testing.
#[derive(Debug, Clone, Copy)]
pub struct EngineTunables {
    pub codec_cooldown_secs: u64,
    pub mode_cooldown_secs: u64,
    pub min_keyframe_interval_secs: u64,
    pub retina_switch_cooldown_secs: u64,
    pub load_penalty_secs: u64,
    pub static_duration_for_retina_secs: f64,
    pub quality_change_cooldown_secs: u64,
}

impl Default for EngineTunables {
    fn default() -> Self {
        EngineTunables {
            codec_cooldown_secs: 15,
            mode_cooldown_secs: 5,
            min_keyframe_interval_secs: 2,
            retina_switch_cooldown_secs: 30,
            load_penalty_secs: 10,
            static_duration_for_retina_secs: 10.0,
            quality_change_cooldown_secs: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub control_port: u16,
    pub input_port: u16,
    pub stun_server: String,
    pub turn_server: Option<String>,
    pub turn_username: Option<String>,
    pub turn_password: Option<String>,
    pub host_identity: String,
    pub log_level: String,
    pub tunables: EngineTunables,
}

pub const DEFAULT_CONTROL_PORT: u16 = 5100;
pub const DEFAULT_INPUT_PORT: u16 = 5002;
pub const DEFAULT_STUN_SERVER: &str = "stun.l.google.com:19302";

impl HostConfig {
    /// Build the effective configuration: CLI flag, then environment variable,
    /// then config-file value, then the hard-coded default, in that order.
    pub fn load(cli: Cli) -> Result<Self, HostError> {
        let file = match &cli.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| HostError::Config(format!("reading {}: {e}", path.display())))?;
                toml::from_str::<FileConfig>(&text)
                    .map_err(|e| HostError::Config(format!("parsing {}: {e}", path.display())))?
            }
            None => FileConfig::default(),
        };

        let control_port = cli
            .control_port
            .or_else(|| env_u16("OMNISCIENT_CONTROL_PORT"))
            .or(file.control_port)
            .unwrap_or(DEFAULT_CONTROL_PORT);

        let input_port = cli
            .input_port
            .or_else(|| env_u16("OMNISCIENT_INPUT_PORT"))
            .or(file.input_port)
            .unwrap_or(DEFAULT_INPUT_PORT);

        let stun_server = cli
            .stun_server
            .or_else(|| std::env::var("OMNISCIENT_STUN_SERVER").ok())
            .or(file.stun_server)
            .unwrap_or_else(|| DEFAULT_STUN_SERVER.to_string());

        let turn_server = cli
            .turn_server
            .or_else(|| std::env::var("OMNISCIENT_TURN_SERVER").ok())
            .or(file.turn_server);

        let turn_username = cli
            .turn_username
            .or_else(|| std::env::var("OMNISCIENT_TURN_USERNAME").ok())
            .or(file.turn_username);

        let turn_password = cli
            .turn_password
            .or_else(|| std::env::var("OMNISCIENT_TURN_PASSWORD").ok())
            .or(file.turn_password);

        let host_identity = cli
            .host_identity
            .or_else(|| std::env::var("OMNISCIENT_HOST_IDENTITY").ok())
            .or(file.host_identity)
            .unwrap_or_else(|| gethostname::gethostname().to_string_lossy().into_owned());

        let log_level = cli
            .log_level
            .or_else(|| std::env::var("OMNISCIENT_LOG_LEVEL").ok())
            .or(file.log_level)
            .unwrap_or_else(|| "info".to_string());

        Ok(HostConfig {
            control_port,
            input_port,
            stun_server,
            turn_server,
            turn_username,
            turn_password,
            host_identity,
            log_level,
            tunables: EngineTunables::default(),
        })
    }
}

fn env_u16(key: &str) -> Option<u16> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Bound local address the transport listens on; kept distinct from the
/// discovered reflexive address (see `transport::stun`).
#[derive(Debug, Clone, Copy)]
pub struct BindAddr {
    pub ip: IpAddr,
    pub port: u16,
}
</content>
