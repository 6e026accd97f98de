use std::time::Duration;

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionRequest, H256, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::router::TxPayload;

/// `balanceOf(address)` function selector
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(2);
const CONFIRMATION_POLL_ATTEMPTS: u32 = 90;

/// Wallet info that can be serialized safely
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    /// The wallet address
    pub address: String,
    /// The chain the wallet signs for
    pub chain_id: u64,
}

/// Connected-wallet collaborator: accepts a `{to, data, value}` payload,
/// returns a transaction hash on broadcast, and later confirms or rejects.
///
/// May reject at any point before broadcast; a rejection surfaces as
/// [`Error::UserRejected`] and is distinguished from an on-chain revert.
#[async_trait]
pub trait Wallet: Send + Sync {
    fn address(&self) -> String;

    /// Submit the payload for signature and broadcast, returning the hash
    async fn send_transaction(&self, tx: &TxPayload) -> Result<String, Error>;

    /// Suspend until the transaction is mined; `Err(Execution)` on revert
    async fn wait_for_confirmation(&self, tx_hash: &str) -> Result<(), Error>;

    /// Native token balance in base units
    async fn native_balance(&self) -> Result<String, Error>;

    /// ERC-20 balance of `token` in base units
    async fn erc20_balance(&self, token: &str) -> Result<String, Error>;
}

/// Classify a submission failure: a dismissed signing prompt is not a
/// systemic failure and must not surface as one.
pub(crate) fn classify_submit_error(detail: String) -> Error {
    if detail.to_lowercase().contains("rejected") {
        Error::UserRejected(detail)
    } else {
        Error::Execution(detail)
    }
}

/// Wallet backed by a JSON-RPC provider and an in-process signing key
pub struct EthersWallet {
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
    chain_id: u64,
}

impl EthersWallet {
    pub fn new(rpc_url: &str, private_key: &str, chain_id: u64) -> Result<Self, Error> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| Error::Config(format!("invalid RPC URL '{}': {}", rpc_url, e)))?;

        let key = private_key.strip_prefix("0x").unwrap_or(private_key);
        let signer: LocalWallet = key
            .parse()
            .map_err(|e| Error::Config(format!("invalid private key: {}", e)))?;
        let signer = signer.with_chain_id(chain_id);

        Ok(Self {
            client: SignerMiddleware::new(provider, signer),
            chain_id,
        })
    }

    pub fn info(&self) -> WalletInfo {
        WalletInfo {
            address: self.address(),
            chain_id: self.chain_id,
        }
    }

    fn build_request(&self, tx: &TxPayload) -> Result<TransactionRequest, Error> {
        let to: Address = tx
            .to
            .parse()
            .map_err(|e| Error::Execution(format!("invalid target address '{}': {}", tx.to, e)))?;

        let data = tx.data.strip_prefix("0x").unwrap_or(&tx.data);
        let data = hex::decode(data)
            .map_err(|e| Error::Execution(format!("invalid transaction data: {}", e)))?;

        let value = if tx.value.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(&tx.value)
                .map_err(|e| Error::Execution(format!("invalid value '{}': {}", tx.value, e)))?
        };

        Ok(TransactionRequest::new().to(to).data(data).value(value))
    }
}

#[async_trait]
impl Wallet for EthersWallet {
    fn address(&self) -> String {
        format!("0x{}", hex::encode(self.client.address().as_bytes()))
    }

    async fn send_transaction(&self, tx: &TxPayload) -> Result<String, Error> {
        let request = self.build_request(tx)?;
        debug!(to = %tx.to, value = %tx.value, "submitting transaction");

        let pending = self
            .client
            .send_transaction(request, None)
            .await
            .map_err(|e| classify_submit_error(e.to_string()))?;

        let hash = *pending;
        Ok(format!("0x{}", hex::encode(hash.as_bytes())))
    }

    async fn wait_for_confirmation(&self, tx_hash: &str) -> Result<(), Error> {
        let hash: H256 = tx_hash
            .parse()
            .map_err(|e| Error::Execution(format!("invalid transaction hash '{}': {}", tx_hash, e)))?;

        for _ in 0..CONFIRMATION_POLL_ATTEMPTS {
            let receipt = self
                .client
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| Error::Execution(format!("receipt lookup failed: {}", e)))?;

            if let Some(receipt) = receipt {
                return match receipt.status {
                    Some(status) if status.as_u64() == 1 => Ok(()),
                    _ => Err(Error::Execution(format!(
                        "transaction {} reverted on-chain",
                        tx_hash
                    ))),
                };
            }

            tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
        }

        Err(Error::Execution(format!(
            "timed out waiting for confirmation of {}",
            tx_hash
        )))
    }

    async fn native_balance(&self) -> Result<String, Error> {
        let balance = self
            .client
            .get_balance(self.client.address(), None)
            .await
            .map_err(|e| Error::Execution(format!("balance query failed: {}", e)))?;
        Ok(balance.to_string())
    }

    async fn erc20_balance(&self, token: &str) -> Result<String, Error> {
        let token_address: Address = token
            .parse()
            .map_err(|e| Error::Execution(format!("invalid token address '{}': {}", token, e)))?;

        let mut data = Vec::with_capacity(36);
        data.extend_from_slice(&BALANCE_OF_SELECTOR);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(self.client.address().as_bytes());

        let call: TypedTransaction = TransactionRequest::new()
            .to(token_address)
            .data(data)
            .into();
        let output = self
            .client
            .call(&call, None)
            .await
            .map_err(|e| Error::Execution(format!("balanceOf call failed: {}", e)))?;

        Ok(U256::from_big_endian(&output).to_string())
    }
}
