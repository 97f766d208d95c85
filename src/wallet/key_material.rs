// src/wallet/key_material.rs
//! Access to the domain's TLS certificate chain and private key.

use crate::config::SslSettings;
use crate::error::Result;
use std::fs;
use std::path::PathBuf;

/// Supplies PEM-encoded TLS material.
pub trait KeyMaterialSource: Send + Sync {
    /// Certificates, leaf first.
    fn cert_chain(&self) -> Result<Vec<String>>;

    fn private_key(&self) -> Result<String>;
}

/// Reads key material from files on every call.
#[derive(Debug, Clone)]
pub struct FileKeyMaterial {
    cert_paths: Vec<PathBuf>,
    key_path: PathBuf,
}

impl FileKeyMaterial {
    pub fn new(cert_paths: Vec<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_paths,
            key_path: key_path.into(),
        }
    }

    pub fn from_settings(ssl: &SslSettings) -> Self {
        Self::new(ssl.cert_chain.clone(), ssl.private_key.clone())
    }
}

impl KeyMaterialSource for FileKeyMaterial {
    fn cert_chain(&self) -> Result<Vec<String>> {
        self.cert_paths
            .iter()
            .map(|path| {
                log::debug!("Reading certificate {}", path.display());
                fs::read_to_string(path).map_err(Into::into)
            })
            .collect()
    }

    fn private_key(&self) -> Result<String> {
        log::debug!("Reading TLS key {}", self.key_path.display());
        Ok(fs::read_to_string(&self.key_path)?)
    }
}

/// Key material already held in memory.
#[derive(Debug, Clone)]
pub struct StaticKeyMaterial {
    pub cert_chain: Vec<String>,
    pub private_key: String,
}

impl KeyMaterialSource for StaticKeyMaterial {
    fn cert_chain(&self) -> Result<Vec<String>> {
        Ok(self.cert_chain.clone())
    }

    fn private_key(&self) -> Result<String> {
        Ok(self.private_key.clone())
    }
}
