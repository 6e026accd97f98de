use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use chatswap_sdk::{
    BundleAction, ChatBackend, ChatMessage, ChatSession, Error, LlmReply, NetworkConstants, Quote,
    RouteProvider, RouteResponse, Settings, SettingsStore, SwapRequest, Token, TokenSource,
    ToolDefinition, TxPayload, Wallet,
};

#[cfg(test)]
pub mod test_utils {
    use super::*;

    pub fn init_test_env() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    pub fn polygon_network() -> NetworkConstants {
        NetworkConstants::default()
    }

    pub fn usdc_token() -> Token {
        Token {
            address: "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174".to_string(),
            symbol: "USDC".to_string(),
            name: Some("USD Coin".to_string()),
            decimals: 6,
        }
    }

    pub fn weth_token() -> Token {
        Token {
            address: "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619".to_string(),
            symbol: "WETH".to_string(),
            name: Some("Wrapped Ether".to_string()),
            decimals: 18,
        }
    }

    /// Token source backed by a fixed list
    pub struct StaticTokens(pub Vec<Token>);

    #[async_trait]
    impl TokenSource for StaticTokens {
        async fn token_list(&self, _chain_id: u64) -> Result<Vec<Token>, Error> {
            Ok(self.0.clone())
        }
    }

    /// Deterministic routing provider with configurable failure modes
    pub struct MockProvider {
        /// Base-unit output amount returned in quotes
        pub amount_out: String,
        /// Raw provider price impact (basis-like units)
        pub price_impact: f64,
        fail_route: AtomicBool,
        fail_quote: AtomicBool,
        fail_bundle: AtomicBool,
        pub bundle_requests: Mutex<Vec<Vec<BundleAction>>>,
    }

    impl MockProvider {
        pub fn returning(amount_out: &str, price_impact: f64) -> Self {
            Self {
                amount_out: amount_out.to_string(),
                price_impact,
                fail_route: AtomicBool::new(false),
                fail_quote: AtomicBool::new(false),
                fail_bundle: AtomicBool::new(false),
                bundle_requests: Mutex::new(Vec::new()),
            }
        }

        pub fn set_fail_route(&self, fail: bool) {
            self.fail_route.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_quote(&self, fail: bool) {
            self.fail_quote.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_bundle(&self, fail: bool) {
            self.fail_bundle.store(fail, Ordering::SeqCst);
        }

        pub fn tx_payload() -> TxPayload {
            TxPayload {
                to: "0x80EbA3855878739F4710233A8a19d89Bdd2ffB8E".to_string(),
                data: "0xdeadbeef".to_string(),
                value: "0".to_string(),
            }
        }
    }

    #[async_trait]
    impl RouteProvider for MockProvider {
        async fn quote(&self, _request: &SwapRequest) -> Result<Quote, Error> {
            if self.fail_quote.load(Ordering::SeqCst) {
                return Err(Error::QuoteFetch("provider unavailable".to_string()));
            }
            Ok(Quote {
                amount_out: self.amount_out.clone(),
                price_impact: self.price_impact,
                gas: Some("210000".to_string()),
                route: vec![],
            })
        }

        async fn route(&self, _request: &SwapRequest) -> Result<RouteResponse, Error> {
            if self.fail_route.load(Ordering::SeqCst) {
                return Err(Error::RouteFetch("provider unavailable".to_string()));
            }
            Ok(RouteResponse {
                tx: Self::tx_payload(),
                amount_out: Some(self.amount_out.clone()),
                gas: Some("210000".to_string()),
                route: vec![],
            })
        }

        async fn bundle(
            &self,
            _chain_id: u64,
            _from_address: &str,
            actions: &[BundleAction],
        ) -> Result<TxPayload, Error> {
            self.bundle_requests
                .lock()
                .unwrap()
                .push(actions.to_vec());
            if self.fail_bundle.load(Ordering::SeqCst) {
                return Err(Error::RouteFetch("bundle rejected".to_string()));
            }
            Ok(Self::tx_payload())
        }

        async fn token_price(&self, _chain_id: u64, _address: &str) -> Result<f64, Error> {
            Ok(0.9998)
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    pub enum WalletMode {
        Succeed,
        Reject,
        Revert,
    }

    /// Wallet double that records submissions and simulates the three
    /// terminal outcomes of a signing prompt
    pub struct MockWallet {
        pub mode: WalletMode,
        pub sent: AtomicUsize,
    }

    impl MockWallet {
        pub fn new(mode: WalletMode) -> Self {
            Self {
                mode,
                sent: AtomicUsize::new(0),
            }
        }

        pub fn sent_count(&self) -> usize {
            self.sent.load(Ordering::SeqCst)
        }
    }

    pub const TEST_TX_HASH: &str =
        "0x9f2f599f4ba0e1cf1d3b2a949f34f8a9205a1c3f9e9f599f4ba0e1cf1d3b2a94";

    #[async_trait]
    impl Wallet for MockWallet {
        fn address(&self) -> String {
            "0x8ba1f109551bD432803012645Ac136ddd64DBA72".to_string()
        }

        async fn send_transaction(&self, _tx: &TxPayload) -> Result<String, Error> {
            if self.mode == WalletMode::Reject {
                return Err(Error::UserRejected("User rejected the request".to_string()));
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(TEST_TX_HASH.to_string())
        }

        async fn wait_for_confirmation(&self, tx_hash: &str) -> Result<(), Error> {
            match self.mode {
                WalletMode::Revert => Err(Error::Execution(format!(
                    "transaction {} reverted on-chain",
                    tx_hash
                ))),
                _ => Ok(()),
            }
        }

        async fn native_balance(&self) -> Result<String, Error> {
            Ok("2500000000000000000".to_string())
        }

        async fn erc20_balance(&self, _token: &str) -> Result<String, Error> {
            Ok("1800000".to_string())
        }
    }

    /// Chat backend that replays a scripted sequence of replies
    pub struct ScriptedBackend {
        replies: Mutex<VecDeque<LlmReply>>,
    }

    impl ScriptedBackend {
        pub fn new(replies: Vec<LlmReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<LlmReply, Error> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::Llm("scripted backend exhausted".to_string()))
        }
    }

    /// In-memory settings store
    #[derive(Default)]
    pub struct MemoryStore(pub Mutex<Settings>);

    impl SettingsStore for MemoryStore {
        fn load(&self) -> Result<Settings, Error> {
            Ok(self.0.lock().unwrap().clone())
        }

        fn save(&self, settings: &Settings) -> Result<(), Error> {
            *self.0.lock().unwrap() = settings.clone();
            Ok(())
        }
    }

    pub struct SessionParts {
        pub provider: Arc<MockProvider>,
        pub wallet: Arc<MockWallet>,
        pub store: Arc<MemoryStore>,
    }

    /// Build a session over deterministic collaborators
    #[allow(dead_code)]
    pub fn build_session(
        replies: Vec<LlmReply>,
        wallet_mode: WalletMode,
        send_without_confirm: bool,
    ) -> (ChatSession, SessionParts) {
        let provider = Arc::new(MockProvider::returning("1800000", 30.0));
        let wallet = Arc::new(MockWallet::new(wallet_mode));
        let store = Arc::new(MemoryStore::default());
        let tokens = Arc::new(StaticTokens(vec![usdc_token(), weth_token()]));

        let settings = Settings {
            api_key: Some("sk-test".to_string()),
            send_without_confirm,
        };

        let session = ChatSession::new(
            Arc::new(ScriptedBackend::new(replies)),
            provider.clone(),
            tokens,
            wallet.clone(),
            store.clone(),
            polygon_network(),
            settings,
        );

        (
            session,
            SessionParts {
                provider,
                wallet,
                store,
            },
        )
    }

    /// A scripted `create_swap_transaction` tool-call reply
    #[allow(dead_code)]
    pub fn swap_tool_reply(amount_in: &str, symbol: &str) -> LlmReply {
        LlmReply::ToolCalls(vec![chatswap_sdk::ToolCall {
            name: "create_swap_transaction".to_string(),
            arguments: serde_json::json!({
                "pol_outgoing_amount": amount_in,
                "token_received_symbol": symbol,
            }),
        }])
    }
}
