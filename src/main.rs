// src/main.rs

//! # TLS-DID Flow - Demo Entry Point
//!
//! Runs one identity through its whole lifecycle against a deployed registry:
//! register, add the certificate chain, write example attributes, set the
//! expiry, sign, resolve and delete.
//!
//! ## Configuration
//! `environment.json` (or `TLSDID_CONFIG`) and `TLSDID_*` variables, e.g.
//! - `TLSDID_REGISTRY_ADDRESS`: deployed TLS-DID registry contract
//! - `TLSDID_RPC_URL`: JSON-RPC endpoint
//! - `TLSDID_PRIVATE_KEY`: Ethereum key of the claimant

use anyhow::{Context, Result};
use dotenv::dotenv;
use tls_did_flow::services::tls_did::{demo_expiry, example_attributes};
use tls_did_flow::utils::certificate::abbreviate;
use tls_did_flow::{Settings, TlsDidService};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Example TLS-DID flow");
    let settings = Settings::load().context("Failed to load settings")?;
    let key_ref = settings
        .private_key
        .clone()
        .context("private_key must be set (TLSDID_PRIVATE_KEY)")?;
    let domain = settings.domain.clone();

    log::info!("REGISTRY: {}", settings.registry_address);
    log::info!("Ethereum private key: {:?}", key_ref);
    log::info!("Json Rpc Url: {}", settings.rpc_url);

    let service = TlsDidService::connect(settings)
        .await
        .context("Failed to connect to the TLS-DID registry")?;

    let pem_key = service.key_material().private_key()?;
    log::info!("TLS pem key: {}", abbreviate(&pem_key));
    let chain = service.key_material().cert_chain()?;

    let mut identity = service
        .create_and_publish_identity(
            &domain,
            key_ref,
            &chain,
            &example_attributes(&domain),
            demo_expiry()?,
            true,
        )
        .await
        .context("Failed to publish TLS-DID")?;
    log::info!("Is registered: {}", identity.record().is_registered());

    match service.resolve_identity(&domain).await {
        Ok(document) => log::info!(
            "DID Document: {}",
            serde_json::to_string_pretty(&document)?
        ),
        Err(err) => log::error!("Error while resolving did: {}", err),
    }

    log::info!("Deleting TLS-DID");
    service.delete_identity(&mut identity).await?;
    Ok(())
}
