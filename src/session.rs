//! The shared chat/swap state machine.
//!
//! One implementation of the preparation/confirmation/execution flow,
//! consumed by thin presentation layers. Holds the conversation history, the
//! transaction queue, the pending-confirmation slot, and the user settings.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{NetworkConstants, Settings, SettingsStore};
use crate::error::Error;
use crate::executor::Executor;
use crate::llm::{ChatBackend, ChatMessage, LlmReply, SYSTEM_PROMPT};
use crate::queue::TransactionQueue;
use crate::router::RouteProvider;
use crate::swap::SwapService;
use crate::token::TokenSource;
use crate::tools::{tool_definitions, Command, ToolCall};
use crate::wallet::Wallet;

pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    service: SwapService,
    executor: Executor,
    wallet: Arc<dyn Wallet>,
    store: Arc<dyn SettingsStore>,
    settings: Settings,
    network: NetworkConstants,
    queue: TransactionQueue,
    /// Queue entry armed behind the confirmation gate, if any
    pending: Option<Uuid>,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        provider: Arc<dyn RouteProvider>,
        tokens: Arc<dyn TokenSource>,
        wallet: Arc<dyn Wallet>,
        store: Arc<dyn SettingsStore>,
        network: NetworkConstants,
        settings: Settings,
    ) -> Self {
        let service = SwapService::new(
            provider.clone(),
            tokens,
            network.clone(),
            wallet.address(),
        );
        let executor = Executor::new(wallet.clone(), provider, network.clone());

        Self {
            backend,
            service,
            executor,
            wallet,
            store,
            settings,
            network,
            queue: TransactionQueue::new(),
            pending: None,
            history: vec![ChatMessage::system(SYSTEM_PROMPT)],
        }
    }

    pub fn queue(&self) -> &TransactionQueue {
        &self.queue
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Id of the swap awaiting confirmation, if one is armed
    pub fn pending_swap(&self) -> Option<Uuid> {
        self.pending
    }

    /// Flip the confirmation policy, persisting synchronously
    pub fn toggle_send_without_confirm(&mut self) -> Result<bool, Error> {
        self.settings.send_without_confirm = !self.settings.send_without_confirm;
        self.store.save(&self.settings)?;
        Ok(self.settings.send_without_confirm)
    }

    /// Reorder a queue entry; permitted only while it is pending
    pub fn reorder(&mut self, id: Uuid, new_index: usize) -> bool {
        self.queue.reorder(id, new_index)
    }

    /// Delete a queue entry; permitted only while it is pending
    pub fn delete(&mut self, id: Uuid) -> bool {
        let deleted = self.queue.delete(id);
        if deleted && self.pending == Some(id) {
            self.pending = None;
        }
        deleted
    }

    /// Process one user input: either release a swap armed behind the
    /// confirmation gate, or forward the input to the language model and
    /// dispatch whatever it returns.
    ///
    /// Returns the assistant messages produced by this turn.
    pub async fn handle_user_input(&mut self, input: &str) -> Result<Vec<String>, Error> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Vec::new());
        }

        self.history.push(ChatMessage::user(input));

        if self.pending.is_some() && !self.settings.send_without_confirm && is_affirmation(input) {
            return self.execute_pending().await;
        }

        let reply = match self
            .backend
            .complete(&self.history, &tool_definitions())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                // Drop the user turn so a retry does not duplicate it
                self.history.pop();
                return Err(e);
            }
        };

        match reply {
            LlmReply::Text(text) => Ok(vec![self.say(text)]),
            LlmReply::ToolCalls(calls) => {
                let mut messages = Vec::new();
                for call in calls {
                    messages.extend(self.handle_tool_call(&call).await?);
                }
                Ok(messages)
            }
        }
    }

    /// Dispatch one structured tool call. Errors at this boundary become
    /// user-visible messages rather than propagating; a failed preparation
    /// never leaves a ghost entry and a failed execution always resolves to
    /// `Failed` status.
    pub async fn handle_tool_call(&mut self, call: &ToolCall) -> Result<Vec<String>, Error> {
        let command = match Command::parse(call) {
            Ok(command) => command,
            Err(e) => {
                warn!(tool = %call.name, "rejected tool call: {}", e);
                return Ok(vec![
                    self.say(format!("I couldn't process that instruction: {}", e))
                ]);
            }
        };

        match command {
            Command::CreateSwap {
                amount_in,
                symbol_out,
            } => self.create_swap(call, &amount_in, &symbol_out).await,
            Command::ConfirmSwap { confirm } => {
                if confirm {
                    self.execute_pending().await
                } else {
                    self.cancel_pending()
                }
            }
            Command::TokenBalance { token_address } => self.token_balance(&token_address).await,
            Command::TokenPrice { token_address } => self.token_price(&token_address).await,
        }
    }

    async fn create_swap(
        &mut self,
        call: &ToolCall,
        amount_in: &str,
        symbol_out: &str,
    ) -> Result<Vec<String>, Error> {
        let prepared = match self.service.prepare_swap(amount_in, symbol_out).await {
            Ok(prepared) => prepared,
            Err(Error::TokenNotFound(symbol)) => {
                return Ok(vec![
                    self.say(format!("Token {} not found on Polygon.", symbol))
                ]);
            }
            Err(e) => {
                return Ok(vec![self.say(format!("Failed to prepare swap: {}", e))]);
            }
        };

        // A newly prepared swap supersedes any swap still armed behind the
        // gate; the superseded entry is removed while still pending.
        if let Some(previous) = self.pending.take() {
            self.queue.delete(previous);
        }

        let summary = format!(
            "{} {} for {} {} with price impact: {:.2}%",
            prepared.formatted_amount_in,
            self.network.native_symbol,
            prepared.formatted_amount_out,
            prepared.token_out.symbol,
            prepared.price_impact,
        );

        let id = self
            .queue
            .enqueue(&call.name, call.arguments.clone(), prepared);
        debug!(%id, "swap prepared and queued");

        if self.settings.send_without_confirm {
            let mut messages = vec![self.say(format!("Executing swap of {}", summary))];
            messages.extend(self.run_execution(id).await?);
            Ok(messages)
        } else {
            self.pending = Some(id);
            Ok(vec![self.say(format!(
                "I'll help you swap {}.\nPlease confirm by replying with \"ok\" or \"yes\" to proceed with the transaction.",
                summary
            ))])
        }
    }

    async fn execute_pending(&mut self) -> Result<Vec<String>, Error> {
        match self.pending.take() {
            Some(id) => self.run_execution(id).await,
            None => Ok(vec![
                self.say("There is no prepared swap awaiting confirmation.".to_string())
            ]),
        }
    }

    fn cancel_pending(&mut self) -> Result<Vec<String>, Error> {
        match self.pending.take() {
            Some(id) => {
                self.queue.delete(id);
                Ok(vec![self.say("Swap cancelled.".to_string())])
            }
            None => Ok(vec![
                self.say("There is no prepared swap awaiting confirmation.".to_string())
            ]),
        }
    }

    async fn run_execution(&mut self, id: Uuid) -> Result<Vec<String>, Error> {
        if !self.queue.begin_execution(id) {
            return Ok(vec![
                self.say("That transaction is no longer pending.".to_string())
            ]);
        }

        let Some(prepared) = self.queue.get(id).and_then(|entry| entry.result.clone()) else {
            self.queue.fail(id, "prepared transaction data missing");
            return Ok(vec![
                self.say("Transaction data not ready.".to_string())
            ]);
        };

        match self.executor.execute(&prepared).await {
            Ok(tx_hash) => {
                self.queue.complete(id, &tx_hash);
                Ok(vec![self.say(format!(
                    "Transaction executed successfully! [View on {}]({}/tx/{})",
                    self.network.explorer_name, self.network.explorer_url, tx_hash
                ))])
            }
            Err(Error::UserRejected(detail)) => {
                self.queue.fail(id, &detail);
                Ok(vec![
                    self.say("Transaction was rejected in your wallet".to_string())
                ])
            }
            Err(e) => {
                self.queue.fail(id, &e.to_string());
                Ok(vec![self.say(format!("Transaction failed: {}", e))])
            }
        }
    }

    /// Bundle every currently-pending entry into a single atomic transaction.
    /// The whole batch completes or the whole batch fails; a bundled on-chain
    /// call cannot partially succeed.
    pub async fn execute_all(&mut self) -> Result<Vec<String>, Error> {
        let batch = self.queue.begin_batch();
        if batch.is_empty() {
            return Ok(vec![
                self.say("There are no pending transactions to execute.".to_string())
            ]);
        }
        self.pending = None;

        let prepared: Vec<_> = batch
            .iter()
            .filter_map(|id| self.queue.get(*id).and_then(|entry| entry.result.clone()))
            .collect();
        let refs: Vec<_> = prepared.iter().collect();

        match self.executor.execute_bundled(&refs).await {
            Ok(tx_hash) => {
                for id in &batch {
                    self.queue.complete(*id, &tx_hash);
                }
                Ok(vec![self.say(format!(
                    "Bundle executed successfully! [View on {}]({}/tx/{})",
                    self.network.explorer_name, self.network.explorer_url, tx_hash
                ))])
            }
            Err(Error::UserRejected(detail)) => {
                for id in &batch {
                    self.queue.fail(*id, &detail);
                }
                Ok(vec![
                    self.say("Transaction was rejected in your wallet".to_string())
                ])
            }
            Err(e) => {
                for id in &batch {
                    self.queue.fail(*id, &e.to_string());
                }
                Ok(vec![self.say(format!("Bundle execution failed: {}", e))])
            }
        }
    }

    async fn token_balance(&mut self, token_address: &str) -> Result<Vec<String>, Error> {
        let native = token_address.eq_ignore_ascii_case(&self.network.native_address);

        let balance = if native {
            self.wallet.native_balance().await
        } else {
            self.wallet.erc20_balance(token_address).await
        };
        let base_units = match balance {
            Ok(base_units) => base_units,
            Err(e) => {
                return Ok(vec![self.say(format!("Failed to fetch balance: {}", e))]);
            }
        };

        let metadata = if native {
            Some((
                self.network.native_symbol.clone(),
                self.network.native_decimals,
            ))
        } else {
            self.service
                .resolver()
                .by_address(token_address)
                .await
                .ok()
                .flatten()
                .map(|token| (token.symbol, token.decimals))
        };

        let message = match metadata {
            Some((symbol, decimals)) => {
                let formatted = crate::amount::normalize(&base_units, decimals)?;
                format!("Your {} balance is {}.", symbol, formatted)
            }
            None => format!(
                "Your balance of {} is {} base units.",
                token_address, base_units
            ),
        };
        Ok(vec![self.say(message)])
    }

    async fn token_price(&mut self, token_address: &str) -> Result<Vec<String>, Error> {
        let price = match self.service.token_price(token_address).await {
            Ok(price) => price,
            Err(e) => {
                return Ok(vec![self.say(format!("Failed to fetch price: {}", e))]);
            }
        };

        let label = self
            .service
            .resolver()
            .by_address(token_address)
            .await
            .ok()
            .flatten()
            .map(|token| token.symbol)
            .unwrap_or_else(|| token_address.to_string());

        Ok(vec![
            self.say(format!("{} is currently trading at ${:.4}.", label, price))
        ])
    }

    fn say(&mut self, text: String) -> String {
        self.history.push(ChatMessage::assistant(&text));
        text
    }
}

fn is_affirmation(input: &str) -> bool {
    input.eq_ignore_ascii_case("ok") || input.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmations_are_case_insensitive() {
        assert!(is_affirmation("ok"));
        assert!(is_affirmation("OK"));
        assert!(is_affirmation("Yes"));
        assert!(!is_affirmation("yes please"));
        assert!(!is_affirmation("sure"));
    }
}
