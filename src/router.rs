use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::Error;
use crate::token::{Token, TokenSource};

/// Protocol tag the routing provider expects on bundled route actions
const ROUTER_PROTOCOL: &str = "enso";

/// An executable transaction payload as returned by the routing provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxPayload {
    /// Target contract address
    pub to: String,
    /// Hex-encoded calldata
    pub data: String,
    /// Native value to attach, base-unit integer string
    #[serde(default)]
    pub value: String,
}

/// Parameters identifying one swap against the routing provider
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub chain_id: u64,
    pub from_address: String,
    pub token_in: String,
    pub token_out: String,
    /// Base-unit integer string
    pub amount_in: String,
}

/// Off-chain price quote for a swap
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Expected output amount, base-unit integer string
    pub amount_out: String,
    /// Price impact as reported by the provider (basis-like units)
    #[serde(default)]
    pub price_impact: f64,
    /// Gas estimate
    #[serde(default)]
    pub gas: Option<String>,
    /// Route breakdown, informational only
    #[serde(default)]
    pub route: Vec<serde_json::Value>,
}

/// Executable route for a swap
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    /// The transaction to submit on-chain
    pub tx: TxPayload,
    #[serde(default)]
    pub amount_out: Option<String>,
    #[serde(default)]
    pub gas: Option<String>,
    #[serde(default)]
    pub route: Vec<serde_json::Value>,
}

/// One step of a bundled transaction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleAction {
    pub protocol: String,
    pub action: String,
    pub args: serde_json::Value,
}

impl BundleAction {
    /// A single-swap route step for the bundle endpoint
    pub fn route(token_in: &str, token_out: &str, amount_in: &str, slippage_bps: u32) -> Self {
        Self {
            protocol: ROUTER_PROTOCOL.to_string(),
            action: "route".to_string(),
            args: json!({
                "tokenIn": token_in,
                "tokenOut": token_out,
                "amountIn": amount_in,
                "slippage": slippage_bps.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenListResponse {
    #[serde(default)]
    data: Vec<TokenEntry>,
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
    address: String,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    decimals: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: f64,
}

/// Routing provider collaborator: quotes, executable routes, bundles, token
/// metadata, and token prices.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn quote(&self, request: &SwapRequest) -> Result<Quote, Error>;
    async fn route(&self, request: &SwapRequest) -> Result<RouteResponse, Error>;
    async fn bundle(
        &self,
        chain_id: u64,
        from_address: &str,
        actions: &[BundleAction],
    ) -> Result<TxPayload, Error>;
    async fn token_price(&self, chain_id: u64, address: &str) -> Result<f64, Error>;
}

/// HTTP client for the routing provider API
pub struct RouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RouterClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let detail = response
            .json::<ApiError>()
            .await
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| "no detail".to_string());
        format!("{}: {}", status, detail)
    }

    async fn get(&self, path_and_query: &str) -> Result<reqwest::Response, Error> {
        debug!(path = path_and_query, "router GET");
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path_and_query))
            .bearer_auth(&self.api_key)
            .header("accept", "application/json")
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl RouteProvider for RouterClient {
    async fn quote(&self, request: &SwapRequest) -> Result<Quote, Error> {
        let path = format!(
            "/shortcuts/quote?chainId={}&fromAddress={}&tokenIn={}&tokenOut={}&amountIn={}",
            request.chain_id,
            request.from_address,
            request.token_in,
            request.token_out,
            request.amount_in,
        );
        let response = self.get(&path).await?;
        if !response.status().is_success() {
            return Err(Error::QuoteFetch(Self::error_message(response).await));
        }
        response
            .json::<Quote>()
            .await
            .map_err(|e| Error::QuoteFetch(format!("invalid quote response: {}", e)))
    }

    async fn route(&self, request: &SwapRequest) -> Result<RouteResponse, Error> {
        let path = format!(
            "/shortcuts/route?chainId={}&fromAddress={}&tokenIn={}&tokenOut={}&amountIn={}&receiver={}&spender={}",
            request.chain_id,
            request.from_address,
            request.token_in,
            request.token_out,
            request.amount_in,
            request.from_address,
            request.from_address,
        );
        let response = self.get(&path).await?;
        if !response.status().is_success() {
            return Err(Error::RouteFetch(Self::error_message(response).await));
        }
        response
            .json::<RouteResponse>()
            .await
            .map_err(|e| Error::RouteFetch(format!("invalid route response: {}", e)))
    }

    async fn bundle(
        &self,
        chain_id: u64,
        from_address: &str,
        actions: &[BundleAction],
    ) -> Result<TxPayload, Error> {
        debug!(steps = actions.len(), "router bundle");
        let response = self
            .http
            .post(format!(
                "{}/shortcuts/bundle?chainId={}&fromAddress={}",
                self.base_url, chain_id, from_address
            ))
            .bearer_auth(&self.api_key)
            .header("accept", "application/json")
            .json(actions)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::RouteFetch(Self::error_message(response).await));
        }
        response
            .json::<TxPayload>()
            .await
            .map_err(|e| Error::RouteFetch(format!("invalid bundle response: {}", e)))
    }

    async fn token_price(&self, chain_id: u64, address: &str) -> Result<f64, Error> {
        let response = self.get(&format!("/prices/{}/{}", chain_id, address)).await?;
        if !response.status().is_success() {
            return Err(Error::QuoteFetch(Self::error_message(response).await));
        }
        let price = response
            .json::<PriceResponse>()
            .await
            .map_err(|e| Error::QuoteFetch(format!("invalid price response: {}", e)))?;
        Ok(price.price)
    }
}

#[async_trait]
impl TokenSource for RouterClient {
    async fn token_list(&self, chain_id: u64) -> Result<Vec<Token>, Error> {
        let response = self
            .get(&format!("/tokens?chainId={}&includeMetadata=true", chain_id))
            .await?;
        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "token list fetch failed: {}",
                Self::error_message(response).await
            )));
        }
        let list = response
            .json::<TokenListResponse>()
            .await
            .map_err(|e| Error::Other(format!("invalid token list response: {}", e)))?;

        // Entries without a symbol or decimals cannot be matched or formatted
        Ok(list
            .data
            .into_iter()
            .filter_map(|entry| {
                let symbol = entry.symbol?;
                let decimals = entry.decimals?;
                Some(Token {
                    address: entry.address,
                    symbol,
                    name: entry.name,
                    decimals,
                })
            })
            .collect())
    }
}
