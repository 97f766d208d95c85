// src/config.rs
//! Process configuration.
//!
//! Loaded once at start-up and passed by reference into every constructor.
//! Sources, later ones overriding earlier ones:
//! 1. `environment.json` (or the file named by `TLSDID_CONFIG`), optional
//! 2. Environment variables prefixed with `TLSDID_`, e.g.
//!    `TLSDID_REGISTRY_ADDRESS`, `TLSDID_RPC_URL`, `TLSDID_SSL__PRIVATE_KEY`,
//!    `TLSDID_BENCHMARK__KEYS` (comma separated)
//!
//! The binaries call `dotenv()` first so a `.env` file can feed step 2.

use crate::error::{Result, TlsDidError};
use crate::models::identity::KeyRef;
use config::{Config, Environment, File};
use ethers_core::types::Address;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

const DEFAULT_CONFIG_FILE: &str = "environment.json";
const CONFIG_FILE_VAR: &str = "TLSDID_CONFIG";

/// Immutable settings for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address of the TLS-DID registry contract
    #[serde(default, alias = "registryaddress")]
    pub registry_address: String,

    /// JSON-RPC endpoint of the chain holding the registry
    #[serde(default, alias = "rpcurl")]
    pub rpc_url: String,

    /// Ethereum key used by the single-identity flow
    #[serde(default, alias = "privatekey")]
    pub private_key: Option<KeyRef>,

    #[serde(default = "default_domain")]
    pub domain: String,

    #[serde(default)]
    pub ssl: SslSettings,

    #[serde(default)]
    pub benchmark: BenchmarkSettings,
}

/// Locations of the TLS key material.
#[derive(Debug, Clone, Deserialize)]
pub struct SslSettings {
    /// Certificate files, leaf first
    #[serde(default = "default_cert_chain")]
    pub cert_chain: Vec<PathBuf>,

    #[serde(default = "default_private_key")]
    pub private_key: PathBuf,
}

impl Default for SslSettings {
    fn default() -> Self {
        Self {
            cert_chain: default_cert_chain(),
            private_key: default_private_key(),
        }
    }
}

/// Claimant keys for the resolution benchmark, one identity per key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BenchmarkSettings {
    #[serde(default)]
    pub keys: Vec<KeyRef>,
}

fn default_domain() -> String {
    "tls-did.de".to_string()
}

fn default_cert_chain() -> Vec<PathBuf> {
    vec![
        PathBuf::from("ssl/certs/cert.pem"),
        PathBuf::from("ssl/certs/intermediateCert.pem"),
    ]
}

fn default_private_key() -> PathBuf {
    PathBuf::from("ssl/private/privKey.pem")
}

impl Settings {
    /// Loads settings from the config file and `TLSDID_*` variables.
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&file)
    }

    pub fn load_from(file: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("TLSDID")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("benchmark.keys")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize::<Settings>())
            .map_err(|e| TlsDidError::Config(e.to_string()))?;

        log::debug!("Loaded settings from {} and environment", file);
        Ok(settings)
    }

    /// Settings for a registry at `registry_address` reached through `rpc_url`,
    /// everything else defaulted.
    pub fn new(registry_address: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            registry_address: registry_address.into(),
            rpc_url: rpc_url.into(),
            private_key: None,
            domain: default_domain(),
            ssl: SslSettings::default(),
            benchmark: BenchmarkSettings::default(),
        }
    }

    /// Checks that the registry address and RPC endpoint are present and
    /// well-formed. Nothing is contacted.
    pub fn validate(&self) -> Result<()> {
        self.registry()?;
        self.rpc_endpoint()?;
        Ok(())
    }

    pub fn registry(&self) -> Result<Address> {
        if self.registry_address.trim().is_empty() {
            return Err(TlsDidError::Config("registry address is not set".into()));
        }
        Address::from_str(self.registry_address.trim()).map_err(|e| {
            TlsDidError::Config(format!(
                "registry address `{}` is invalid: {}",
                self.registry_address, e
            ))
        })
    }

    pub fn rpc_endpoint(&self) -> Result<Url> {
        if self.rpc_url.trim().is_empty() {
            return Err(TlsDidError::Config("RPC url is not set".into()));
        }
        let url = Url::parse(self.rpc_url.trim())
            .map_err(|e| TlsDidError::Config(format!("RPC url `{}` is invalid: {}", self.rpc_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(TlsDidError::Config(format!(
                "RPC url `{}` uses unsupported scheme `{}`",
                self.rpc_url, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const REGISTRY: &str = "0xe28131a74c9Fb412f0e57AD4614dB1A8D6a01793";
    const CLAIMANT: &str = "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d";

    /// Serializes tests that read or write `TLSDID_*` variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn testdata(name: &str) -> String {
        format!("{}/testdata/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    #[test]
    fn valid_settings_pass() {
        let settings = Settings::new(REGISTRY, "http://localhost:8545");
        assert!(settings.validate().is_ok());
        assert_eq!(settings.domain, "tls-did.de");
        assert_eq!(settings.ssl.cert_chain.len(), 2);
    }

    #[test]
    fn missing_values_are_config_errors() {
        let err = Settings::new("", "http://localhost:8545").validate().unwrap_err();
        assert!(matches!(err, TlsDidError::Config(_)));

        let err = Settings::new(REGISTRY, "  ").validate().unwrap_err();
        assert!(matches!(err, TlsDidError::Config(_)));
    }

    #[test]
    fn malformed_values_are_config_errors() {
        for (registry, rpc) in [
            ("0x1234", "http://localhost:8545"),
            ("not-an-address", "http://localhost:8545"),
            (REGISTRY, "localhost:8545"),
            (REGISTRY, "ftp://localhost:8545"),
            (REGISTRY, "http//localhost"),
        ] {
            let err = Settings::new(registry, rpc).validate().unwrap_err();
            assert!(matches!(err, TlsDidError::Config(_)), "{registry} {rpc}");
        }
    }

    #[test]
    fn websocket_endpoints_are_rejected() {
        for rpc in ["ws://localhost:8545", "wss://node.example.org"] {
            let err = Settings::new(REGISTRY, rpc).rpc_endpoint().unwrap_err();
            match err {
                TlsDidError::Config(message) => assert!(message.contains("unsupported scheme")),
                other => panic!("expected config error, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let settings = Settings::load_from("does-not-exist.json").unwrap();
        assert_eq!(settings.domain, "tls-did.de");
        assert_eq!(settings.ssl.private_key, PathBuf::from("ssl/private/privKey.pem"));
    }

    #[test]
    fn loads_camel_case_environment_file() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let settings = Settings::load_from(&testdata("environment.json")).unwrap();

        assert_eq!(settings.registry_address, REGISTRY);
        assert_eq!(settings.rpc_url, "http://localhost:8545");
        assert_eq!(settings.private_key, Some(KeyRef::from(CLAIMANT)));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn environment_variables_are_loaded() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let vars = [
            ("TLSDID_REGISTRY_ADDRESS", REGISTRY.to_string()),
            ("TLSDID_RPC_URL", "http://localhost:8545".to_string()),
            ("TLSDID_BENCHMARK__KEYS", format!("{},0x02", CLAIMANT)),
            ("TLSDID_SSL__PRIVATE_KEY", "keys/tls.pem".to_string()),
        ];
        for (name, value) in &vars {
            std::env::set_var(name, value);
        }

        let loaded = Settings::load_from("does-not-exist.json");
        for (name, _) in &vars {
            std::env::remove_var(name);
        }

        let settings = loaded.unwrap();
        assert_eq!(settings.registry_address, REGISTRY);
        assert_eq!(settings.rpc_url, "http://localhost:8545");
        assert_eq!(
            settings.benchmark.keys,
            vec![KeyRef::from(CLAIMANT), KeyRef::from("0x02")]
        );
        assert_eq!(settings.ssl.private_key, PathBuf::from("keys/tls.pem"));
        assert!(settings.validate().is_ok());
    }
}
