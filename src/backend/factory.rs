//! Gateway factory for creating gateway instances from configuration.

use anyhow::{anyhow, Result};
use std::sync::Arc;

use super::memory::MemoryGateway;
use crate::config::GatewayConfig;
use crate::constants::GATEWAY_MEMORY;

/// Gateway instance built from configuration.
///
/// The concrete type is kept so front ends can reach implementation-specific
/// controls such as connectivity toggles.
pub enum ConfiguredGateway {
    Memory(Arc<MemoryGateway>),
}

impl ConfiguredGateway {
    /// The gateway as a trait object for the task service.
    pub fn as_gateway(&self) -> Arc<dyn super::TaskGateway> {
        match self {
            ConfiguredGateway::Memory(gateway) => gateway.clone(),
        }
    }

    pub fn set_online(&self, online: bool) {
        match self {
            ConfiguredGateway::Memory(gateway) => gateway.set_online(online),
        }
    }

    pub fn is_online(&self) -> bool {
        match self {
            ConfiguredGateway::Memory(gateway) => gateway.is_online(),
        }
    }

    /// Whether `connect` has succeeded at least once.
    pub fn is_connected(&self) -> bool {
        match self {
            ConfiguredGateway::Memory(gateway) => gateway.is_connected(),
        }
    }
}

/// Create a gateway instance from its configuration.
///
/// # Errors
/// Returns error if the gateway type is unknown
pub fn create_gateway(config: &GatewayConfig) -> Result<ConfiguredGateway> {
    match config.backend_type.as_str() {
        GATEWAY_MEMORY => {
            let gateway = MemoryGateway::new(config.offline_persistence);
            gateway.set_online(config.start_online);
            Ok(ConfiguredGateway::Memory(Arc::new(gateway)))
        }
        _ => Err(anyhow!("Unknown gateway type: {}", config.backend_type)),
    }
}
