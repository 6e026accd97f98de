use std::sync::Arc;

use tracing::{debug, info};

use crate::config::NetworkConstants;
use crate::error::Error;
use crate::router::{BundleAction, RouteProvider};
use crate::swap::PreparedSwap;
use crate::wallet::Wallet;

/// Submits prepared swaps to the connected wallet and waits for on-chain
/// confirmation before reporting success.
pub struct Executor {
    wallet: Arc<dyn Wallet>,
    provider: Arc<dyn RouteProvider>,
    network: NetworkConstants,
}

impl Executor {
    pub fn new(
        wallet: Arc<dyn Wallet>,
        provider: Arc<dyn RouteProvider>,
        network: NetworkConstants,
    ) -> Self {
        Self {
            wallet,
            provider,
            network,
        }
    }

    /// Submit a single prepared swap and wait for it to be mined.
    ///
    /// A dismissed signing prompt surfaces as [`Error::UserRejected`]; a
    /// revert or confirmation failure as [`Error::Execution`].
    pub async fn execute(&self, prepared: &PreparedSwap) -> Result<String, Error> {
        debug!(token_out = %prepared.token_out.symbol, "executing swap");

        let tx_hash = self.wallet.send_transaction(&prepared.route_tx).await?;
        info!(%tx_hash, "transaction broadcast, awaiting confirmation");

        self.wallet.wait_for_confirmation(&tx_hash).await?;
        Ok(tx_hash)
    }

    /// Encode all prepared swaps into a single on-chain call via the routing
    /// provider's bundle endpoint, then submit and confirm it.
    ///
    /// This is an atomicity boundary: either every bundled swap executes or
    /// the whole transaction reverts.
    pub async fn execute_bundled(&self, prepared: &[&PreparedSwap]) -> Result<String, Error> {
        if prepared.is_empty() {
            return Err(Error::Other("no transactions to bundle".to_string()));
        }

        let actions: Vec<BundleAction> = prepared
            .iter()
            .map(|swap| {
                BundleAction::route(
                    &self.network.native_address,
                    &swap.token_out.address,
                    &swap.amount_in,
                    self.network.default_slippage_bps,
                )
            })
            .collect();

        let bundle_tx = self
            .provider
            .bundle(self.network.chain_id, &self.wallet.address(), &actions)
            .await?;

        debug!(steps = actions.len(), "executing bundled transaction");
        let tx_hash = self.wallet.send_transaction(&bundle_tx).await?;
        info!(%tx_hash, "bundle broadcast, awaiting confirmation");

        self.wallet.wait_for_confirmation(&tx_hash).await?;
        Ok(tx_hash)
    }
}
