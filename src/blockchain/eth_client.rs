// src/blockchain/eth_client.rs
//! Ethereum JSON-RPC client for the TLS-DID registry.
//!
//! Holds one HTTP provider for the whole process. Every transaction is signed
//! by the claimant whose key is passed in, because a single domain may carry
//! claims from several accounts.

use crate::contracts::tls_did_registry::{RegistryError, TxResult};
use crate::models::identity::KeyRef;
use ethers::contract::{Contract, ContractError};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{Signer, Wallet};
use ethers_contract::BaseContract;
use ethers_core::{
    abi::{self, Abi, Detokenize, ParamType, Token, Tokenize},
    types::{Address, H256, U256, U64},
    utils::hex,
};
use k256::ecdsa::SigningKey;
use std::sync::Arc;

/// Gas limit attached to every registry transaction.
const GAS_LIMIT: u64 = 3_000_000;

/// Selector of Solidity's `Error(string)` revert payload.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Provider middleware signing with one claimant's key.
pub type ClaimantMiddleware = SignerMiddleware<Provider<Http>, Wallet<SigningKey>>;

/// JSON-RPC client with per-claimant signing.
#[derive(Clone)]
pub struct EthClient {
    /// RPC provider shared by reads and signed writes
    provider: Provider<Http>,
    /// Chain id every signed transaction is bound to
    chain_id: u64,
}

impl EthClient {
    /// Connects to `rpc_url` and fetches the chain id.
    ///
    /// # Errors
    /// `RegistryError::Transport` if the URL is unusable or the node does not
    /// answer.
    pub async fn new(rpc_url: &str) -> Result<Self, RegistryError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| RegistryError::Transport(format!("invalid RPC url: {}", e)))?;
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?
            .as_u64();

        log::debug!("Connected to {} (chain id {})", rpc_url, chain_id);
        Ok(Self { provider, chain_id })
    }

    /// Builds a signing wallet from a hex private key (with or without `0x`).
    pub fn wallet(&self, key: &KeyRef) -> Result<Wallet<SigningKey>, RegistryError> {
        let bytes = hex::decode(key.expose().trim_start_matches("0x"))
            .map_err(|e| RegistryError::InvalidKey(e.to_string()))?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|e| RegistryError::InvalidKey(e.to_string()))?;
        Ok(Wallet::from(signing_key).with_chain_id(self.chain_id))
    }

    /// Address of the account behind `key`.
    pub fn address_of(&self, key: &KeyRef) -> Result<Address, RegistryError> {
        Ok(self.wallet(key)?.address())
    }

    fn signer(&self, key: &KeyRef) -> Result<Arc<ClaimantMiddleware>, RegistryError> {
        Ok(Arc::new(SignerMiddleware::new(
            self.provider.clone(),
            self.wallet(key)?,
        )))
    }

    /// Sends a state-changing contract call signed by `key` and waits for the
    /// receipt.
    ///
    /// # Errors
    /// - `Rejected` if the call reverts (with the revert reason when the
    ///   contract gives one) or the receipt reports failure
    /// - `Transport` if the node cannot be reached or drops the transaction
    pub async fn send_transaction<T: Tokenize + Send>(
        &self,
        key: &KeyRef,
        contract_address: Address,
        abi: &Abi,
        method: &str,
        params: T,
    ) -> Result<TxResult, RegistryError> {
        let contract = Contract::new(
            contract_address,
            BaseContract::from(abi.clone()),
            self.signer(key)?,
        );

        let call = contract
            .method::<_, H256>(method, params)
            .map_err(|e| RegistryError::Abi(e.to_string()))?
            .gas(U256::from(GAS_LIMIT));

        let pending = call.send().await.map_err(contract_error)?;
        let tx_hash = pending.tx_hash();
        log::debug!("{} submitted as {:?}", method, tx_hash);

        let receipt = pending
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?
            .ok_or_else(|| {
                RegistryError::Transport(format!("transaction {:?} was dropped", tx_hash))
            })?;

        if receipt.status == Some(U64::zero()) {
            return Err(RegistryError::Rejected(format!(
                "{} reverted in transaction {:?}",
                method, tx_hash
            )));
        }

        Ok(TxResult {
            tx_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
        })
    }

    /// Read-only contract call.
    pub async fn query_contract<T: Tokenize + Send, R: Detokenize + Send>(
        &self,
        contract_address: Address,
        abi: &Abi,
        method: &str,
        params: T,
    ) -> Result<R, RegistryError> {
        let contract = Contract::new(
            contract_address,
            BaseContract::from(abi.clone()),
            Arc::new(self.provider.clone()),
        );

        contract
            .method::<_, R>(method, params)
            .map_err(|e| RegistryError::Abi(e.to_string()))?
            .call()
            .await
            .map_err(contract_error)
    }
}

/// Maps a contract error, keeping the revert reason when there is one.
fn contract_error<M: Middleware>(err: ContractError<M>) -> RegistryError {
    match err.as_revert() {
        Some(data) => RegistryError::Rejected(
            revert_reason(data).unwrap_or_else(|| "execution reverted".to_string()),
        ),
        None => RegistryError::Transport(err.to_string()),
    }
}

/// Decodes Solidity's `Error(string)` revert payload.
pub(crate) fn revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    match abi::decode(&[ParamType::String], payload).ok()?.pop()? {
        Token::String(reason) => Some(reason),
        _ => None,
    }
}
