use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Token metadata as reported by the routing provider's token list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Token contract address
    pub address: String,
    /// Token symbol
    pub symbol: String,
    /// Token name
    pub name: Option<String>,
    /// Token decimals
    pub decimals: u8,
}

/// Source of the full token list for a chain
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token_list(&self, chain_id: u64) -> Result<Vec<Token>, Error>;
}

/// Resolves a human-entered token symbol to a token on the target chain.
///
/// Matching policy: a case-insensitive exact symbol match wins; otherwise the
/// first case-insensitive substring match in provider order is accepted.
/// Repeated calls against a stable token list are idempotent.
pub struct TokenResolver {
    source: Arc<dyn TokenSource>,
    chain_id: u64,
}

impl TokenResolver {
    pub fn new(source: Arc<dyn TokenSource>, chain_id: u64) -> Self {
        Self { source, chain_id }
    }

    /// Resolve a symbol, returning `None` when nothing matches. Callers must
    /// surface a token-not-found error rather than silently proceeding.
    pub async fn resolve(&self, symbol: &str) -> Result<Option<Token>, Error> {
        let tokens = self.source.token_list(self.chain_id).await?;
        Ok(match_symbol(&tokens, symbol).cloned())
    }

    /// Look up token metadata by contract address
    pub async fn by_address(&self, address: &str) -> Result<Option<Token>, Error> {
        let tokens = self.source.token_list(self.chain_id).await?;
        Ok(tokens
            .iter()
            .find(|t| t.address.eq_ignore_ascii_case(address))
            .cloned())
    }
}

pub(crate) fn match_symbol<'a>(tokens: &'a [Token], symbol: &str) -> Option<&'a Token> {
    let wanted = symbol.to_lowercase();

    if let Some(exact) = tokens.iter().find(|t| t.symbol.to_lowercase() == wanted) {
        return Some(exact);
    }

    tokens
        .iter()
        .find(|t| t.symbol.to_lowercase().contains(&wanted))
}
