use std::sync::Arc;

use futures::try_join;
use tracing::debug;

use crate::amount;
use crate::config::NetworkConstants;
use crate::error::Error;
use crate::router::{Quote, RouteProvider, SwapRequest, TxPayload};
use crate::token::{Token, TokenResolver, TokenSource};

/// The result of resolving and quoting one swap intent.
///
/// Created only by [`SwapService::prepare_swap`] and read-only thereafter.
#[derive(Debug, Clone)]
pub struct PreparedSwap {
    /// Resolved destination token
    pub token_out: Token,
    /// Input amount in native base units
    pub amount_in: String,
    /// Human-readable input quantity
    pub formatted_amount_in: String,
    /// Human-readable expected output quantity
    pub formatted_amount_out: String,
    /// Percentage cost to the user
    pub price_impact: f64,
    /// The raw transaction to submit on-chain
    pub route_tx: TxPayload,
    /// Informational pricing detail, not required for execution
    pub quote: Quote,
}

/// Orchestrates token resolution and route/quote fetching into a
/// [`PreparedSwap`].
pub struct SwapService {
    provider: Arc<dyn RouteProvider>,
    resolver: TokenResolver,
    network: NetworkConstants,
    from_address: String,
}

impl SwapService {
    pub fn new(
        provider: Arc<dyn RouteProvider>,
        tokens: Arc<dyn TokenSource>,
        network: NetworkConstants,
        from_address: String,
    ) -> Self {
        let resolver = TokenResolver::new(tokens, network.chain_id);
        Self {
            provider,
            resolver,
            network,
            from_address,
        }
    }

    pub fn network(&self) -> &NetworkConstants {
        &self.network
    }

    pub fn resolver(&self) -> &TokenResolver {
        &self.resolver
    }

    /// Current USD price of a token, per the routing provider
    pub async fn token_price(&self, address: &str) -> Result<f64, Error> {
        self.provider
            .token_price(self.network.chain_id, address)
            .await
    }

    /// Prepare a swap of `amount_in` native tokens (base units) into the token
    /// matching `symbol_out`.
    ///
    /// The route and quote are fetched concurrently; both must resolve before
    /// a `PreparedSwap` is returned. Either failure fails preparation as a
    /// unit, so no partial result ever reaches a caller.
    pub async fn prepare_swap(
        &self,
        amount_in: &str,
        symbol_out: &str,
    ) -> Result<PreparedSwap, Error> {
        let token_out = self
            .resolver
            .resolve(symbol_out)
            .await?
            .ok_or_else(|| Error::TokenNotFound(symbol_out.to_string()))?;

        debug!(
            symbol = %token_out.symbol,
            address = %token_out.address,
            amount_in,
            "preparing swap"
        );

        let request = SwapRequest {
            chain_id: self.network.chain_id,
            from_address: self.from_address.clone(),
            token_in: self.network.native_address.clone(),
            token_out: token_out.address.clone(),
            amount_in: amount_in.to_string(),
        };

        let (route, quote) = try_join!(self.provider.route(&request), self.provider.quote(&request))?;

        let formatted_amount_in = amount::normalize(amount_in, self.network.native_decimals)?;
        let formatted_amount_out = amount::normalize(&quote.amount_out, token_out.decimals)?;
        // The provider encodes price impact in basis-like units
        let price_impact = quote.price_impact / 100.0;

        Ok(PreparedSwap {
            token_out,
            amount_in: amount_in.to_string(),
            formatted_amount_in,
            formatted_amount_out,
            price_impact,
            route_tx: route.tx,
            quote,
        })
    }
}
