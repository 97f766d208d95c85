// src/bin/benchmark.rs

//! Resolution benchmark: one signed claim plus one unsigned competing claim
//! per extra key in `benchmark.keys` (`TLSDID_BENCHMARK__KEYS`, comma
//! separated).

use anyhow::{Context, Result};
use dotenv::dotenv;
use tls_did_flow::{Settings, TlsDidService};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Running Setup...");
    let settings = Settings::load().context("Failed to load settings")?;
    let keys = settings.benchmark.keys.clone();
    let domain = settings.domain.clone();
    log::info!("REGISTRY: {}", settings.registry_address);
    log::info!("Json Rpc Url: {}", settings.rpc_url);

    let service = TlsDidService::connect(settings)
        .await
        .context("Failed to connect to the TLS-DID registry")?;

    let samples = service
        .run_benchmark(&domain, &keys)
        .await
        .context("Benchmark aborted")?;

    for (i, sample) in samples.iter().enumerate() {
        log::info!(
            "{} claims: {:.3} ms{}",
            i + 1,
            sample.millis(),
            if sample.succeeded { "" } else { " (failed)" }
        );
    }
    log::info!(
        "{:?}",
        samples.iter().map(|sample| sample.millis()).collect::<Vec<_>>()
    );
    Ok(())
}
