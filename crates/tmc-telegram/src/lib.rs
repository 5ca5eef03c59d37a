//! Telegram transport adapters.
//!
//! This crate implements the `tmc-core` TransportPort over an MTProto HTTP bridge, plus an
//! offline snapshot transport for replays and demos.

use std::sync::Arc;

use tmc_core::{
    config::{Config, TransportConfig},
    ports::TransportPort,
    Result,
};

pub mod bridge;
pub mod snapshot;
pub mod wire;

pub use bridge::{BridgeSettings, BridgeTransport};
pub use snapshot::SnapshotTransport;

/// Build the transport selected by the configuration.
pub fn from_config(cfg: &Config) -> Result<Arc<dyn TransportPort>> {
    match &cfg.transport {
        TransportConfig::Bridge {
            base_url,
            api_id,
            api_hash,
            session_name,
            request_timeout,
        } => {
            let transport = BridgeTransport::new(BridgeSettings {
                base_url: base_url.clone(),
                api_id: *api_id,
                api_hash: api_hash.clone(),
                session_name: session_name.clone(),
                profile: cfg.client_profile.clone(),
                request_timeout: *request_timeout,
            })?;
            Ok(Arc::new(transport))
        }
        TransportConfig::Snapshot { path } => Ok(Arc::new(SnapshotTransport::load(path)?)),
    }
}
