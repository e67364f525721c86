use anyhow::Context;
use config::{Config, Environment, File};
use domain::service::ServiceIdentity;
use serde::{Deserialize, Serialize};

/// Service name the current platform generation registers
pub const VENDOR_SERVICE: &str = "com.aurora.printservice";

/// Service name used by devices still on the previous generation
pub const LEGACY_SERVICE: &str = "com.horizon.printservice";

/// Which platform generation this device runs. Decides which service
/// endpoint is tried first; the other stays as fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceGeneration {
    Current,
    Legacy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_vendor_socket")]
    pub vendor_socket: String,
    #[serde(default = "default_legacy_socket")]
    pub legacy_socket: String,
    #[serde(default = "default_generation")]
    pub generation: ServiceGeneration,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

fn default_vendor_socket() -> String {
    "/run/aurora-print/service.sock".to_string()
}
fn default_legacy_socket() -> String {
    "/run/horizon-print/service.sock".to_string()
}
fn default_generation() -> ServiceGeneration {
    ServiceGeneration::Current
}
fn default_call_timeout_secs() -> u64 {
    10
}
fn default_reconnect_base_ms() -> u64 {
    1000
}
fn default_max_reconnect_attempts() -> u32 {
    5
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            vendor_socket: default_vendor_socket(),
            legacy_socket: default_legacy_socket(),
            generation: default_generation(),
            call_timeout_secs: default_call_timeout_secs(),
            reconnect_base_ms: default_reconnect_base_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl ServiceConfig {
    pub fn load(config_dir: &str) -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Base config file - optional, defaults cover everything
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            // Per-environment overrides
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. PRINTER__GENERATION=legacy)
            .add_source(Environment::with_prefix("PRINTER").separator("__"))
            .build()
            .context("Failed to assemble printer configuration")?;

        s.try_deserialize()
            .context("Failed to deserialize printer configuration")
    }

    /// Service endpoints in bind order for this generation.
    pub fn bind_candidates(&self) -> Vec<ServiceIdentity> {
        let vendor = ServiceIdentity::new(VENDOR_SERVICE, self.vendor_socket.as_str());
        let legacy = ServiceIdentity::new(LEGACY_SERVICE, self.legacy_socket.as_str());
        match self.generation {
            ServiceGeneration::Current => vec![vendor, legacy],
            ServiceGeneration::Legacy => vec![legacy, vendor],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.generation, ServiceGeneration::Current);
        assert_eq!(config.call_timeout_secs, 10);
        assert_eq!(config.reconnect_base_ms, 1000);
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_candidate_order_follows_generation() {
        let mut config = ServiceConfig::default();
        let candidates = config.bind_candidates();
        assert_eq!(candidates[0].name, VENDOR_SERVICE);
        assert_eq!(candidates[1].name, LEGACY_SERVICE);

        config.generation = ServiceGeneration::Legacy;
        let candidates = config.bind_candidates();
        assert_eq!(candidates[0].name, LEGACY_SERVICE);
        assert_eq!(candidates[1].name, VENDOR_SERVICE);
    }
}
