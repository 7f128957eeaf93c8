//! Configuration for both domains

use crate::types::Commitment;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use xdomain_bus::{message::MAX_SLIPPAGE_BPS, Address, DomainId};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Emit JSON logs
    #[serde(default)]
    pub json_logs: bool,

    /// Source domain
    pub source: SourceConfig,

    /// Mirror domain
    pub mirror: MirrorConfig,

    /// Relay parameters
    pub relay: RelayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "subscriber-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            json_logs: false,
            source: SourceConfig::default(),
            mirror: MirrorConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

/// Source domain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// This component's address; receiver of every stream
    pub address: Address,

    /// Domain the source runs on
    pub origin_domain: DomainId,

    /// Transferable asset relayed across
    pub accepted_asset: Address,

    /// Streaming asset whose callbacks are accepted
    pub streaming_asset: Address,

    /// Slippage tolerance for relays (basis points)
    pub slippage_bps: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            address: Address::ZERO,
            origin_domain: DomainId(1),
            accepted_asset: Address::ZERO,
            streaming_asset: Address::ZERO,
            slippage_bps: 30, // 0.3%
        }
    }
}

/// Mirror domain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Mirror component's address (relay target)
    pub address: Address,

    /// Domain the mirror runs on
    pub domain: DomainId,

    /// Asset inbound messages must carry
    pub accepted_asset: Address,

    /// Relayed commitment before any message arrives
    pub genesis_commitment: Commitment,

    /// Keep an audit set of every committed leaf hash
    #[serde(default)]
    pub track_leaf_set: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            address: Address::ZERO,
            domain: DomainId(2),
            accepted_asset: Address::ZERO,
            genesis_commitment: Commitment::ZERO,
            track_leaf_set: false,
        }
    }
}

/// Relay parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Fee paid to bridge relayers per send
    pub relayer_fee: u64,
}

fn env_parse<T>(name: &str) -> crate::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e| crate::Error::Config(format!("{}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Some(v) = env_parse("SUBLEDGER_SOURCE_ADDRESS")? {
            config.source.address = v;
        }
        if let Some(v) = env_parse("SUBLEDGER_ORIGIN_DOMAIN")? {
            config.source.origin_domain = DomainId(v);
        }
        if let Some(v) = env_parse("SUBLEDGER_ACCEPTED_ASSET")? {
            config.source.accepted_asset = v;
        }
        if let Some(v) = env_parse("SUBLEDGER_STREAMING_ASSET")? {
            config.source.streaming_asset = v;
        }
        if let Some(v) = env_parse("SUBLEDGER_SLIPPAGE_BPS")? {
            config.source.slippage_bps = v;
        }
        if let Some(v) = env_parse("SUBLEDGER_MIRROR_ADDRESS")? {
            config.mirror.address = v;
        }
        if let Some(v) = env_parse("SUBLEDGER_MIRROR_DOMAIN")? {
            config.mirror.domain = DomainId(v);
        }
        if let Some(v) = env_parse("SUBLEDGER_MIRROR_ASSET")? {
            config.mirror.accepted_asset = v;
        }
        if let Some(v) = env_parse("SUBLEDGER_GENESIS_COMMITMENT")? {
            config.mirror.genesis_commitment = v;
        }
        if let Some(v) = env_parse("SUBLEDGER_RELAYER_FEE")? {
            config.relay.relayer_fee = v;
        }
        if let Some(v) = env_parse("SUBLEDGER_TRACK_LEAF_SET")? {
            config.mirror.track_leaf_set = v;
        }
        if let Some(v) = env_parse("SUBLEDGER_JSON_LOGS")? {
            config.json_logs = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> crate::Result<()> {
        if self.source.slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(crate::Error::Config(format!(
                "slippage_bps {} exceeds {}",
                self.source.slippage_bps, MAX_SLIPPAGE_BPS
            )));
        }

        if self.source.origin_domain == self.mirror.domain {
            return Err(crate::Error::Config(format!(
                "source and mirror share domain {}",
                self.mirror.domain
            )));
        }

        Ok(())
    }
}
