pub mod amount;
pub mod config;
pub mod error;
pub mod executor;
pub mod llm;
pub mod queue;
pub mod router;
pub mod session;
pub mod swap;
pub mod token;
pub mod tools;
pub mod wallet;

pub use config::{JsonSettingsStore, NetworkConstants, Settings, SettingsStore};
pub use error::Error;
pub use executor::Executor;
pub use llm::{ChatBackend, ChatMessage, LlmReply, OpenAiChat, Role, SYSTEM_PROMPT};
pub use queue::{QueuedTransaction, TransactionQueue, TxStatus};
pub use router::{
    BundleAction, Quote, RouteProvider, RouteResponse, RouterClient, SwapRequest, TxPayload,
};
pub use session::ChatSession;
pub use swap::{PreparedSwap, SwapService};
pub use token::{Token, TokenResolver, TokenSource};
pub use tools::{tool_definitions, Command, ToolCall, ToolDefinition};
pub use wallet::{EthersWallet, Wallet, WalletInfo};
