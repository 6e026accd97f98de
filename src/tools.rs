//! The tool-calling boundary.
//!
//! Tool definitions are advertised to the language model; the calls it emits
//! come back as untyped JSON and are validated into a closed set of typed
//! commands before they reach the queue or executor.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Error;

pub const CREATE_SWAP_TRANSACTION: &str = "create_swap_transaction";
pub const CONFIRM_SWAP: &str = "confirm_swap";
pub const GET_TOKEN_BALANCE: &str = "get_token_balance";
pub const GET_TOKEN_PRICE: &str = "get_token_price";

/// A callable tool declared to the language model
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolFunction,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            kind: "function".to_string(),
            function: ToolFunction {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// The set of tools the assistant can call
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            GET_TOKEN_BALANCE,
            "Get the balance of a specific token for the connected wallet",
            json!({
                "type": "object",
                "properties": {
                    "token_address": {
                        "type": "string",
                        "description": "The contract address of the token"
                    }
                },
                "required": ["token_address"]
            }),
        ),
        ToolDefinition::function(
            GET_TOKEN_PRICE,
            "Get the current price of a token in USD",
            json!({
                "type": "object",
                "properties": {
                    "token_address": {
                        "type": "string",
                        "description": "The contract address of the token"
                    }
                },
                "required": ["token_address"]
            }),
        ),
        ToolDefinition::function(
            CREATE_SWAP_TRANSACTION,
            "Create a transaction to swap native POL tokens to another token",
            json!({
                "type": "object",
                "properties": {
                    "token_received_symbol": {
                        "type": "string",
                        "description": "The symbol of the token to swap to (e.g. \"USDC\", \"WETH\", \"MATIC\")"
                    },
                    "pol_outgoing_amount": {
                        "type": "string",
                        "description": "The amount of POL tokens to swap (in wei)"
                    }
                },
                "required": ["token_received_symbol", "pol_outgoing_amount"]
            }),
        ),
        ToolDefinition::function(
            CONFIRM_SWAP,
            "Confirm and execute a previously prepared swap transaction",
            json!({
                "type": "object",
                "properties": {
                    "confirm": {
                        "type": "boolean",
                        "description": "Whether to confirm and execute the swap (true) or cancel it (false)"
                    }
                },
                "required": ["confirm"]
            }),
        ),
    ]
}

/// A structured function invocation emitted by the language model
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

/// A validated tool call. Raw JSON arguments are coerced here, at the
/// boundary, so nothing untyped reaches the queue or executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateSwap {
        /// Base-unit integer string
        amount_in: String,
        symbol_out: String,
    },
    ConfirmSwap {
        confirm: bool,
    },
    TokenBalance {
        token_address: String,
    },
    TokenPrice {
        token_address: String,
    },
}

impl Command {
    pub fn parse(call: &ToolCall) -> Result<Self, Error> {
        match call.name.as_str() {
            CREATE_SWAP_TRANSACTION => {
                let amount_in = string_arg(&call.arguments, "pol_outgoing_amount")?;
                if amount_in.is_empty() || !amount_in.chars().all(|c| c.is_ascii_digit()) {
                    return Err(Error::ToolCall(format!(
                        "pol_outgoing_amount must be a base-unit integer, got '{}'",
                        amount_in
                    )));
                }

                let symbol_out = string_arg(&call.arguments, "token_received_symbol")?;
                if symbol_out.is_empty() {
                    return Err(Error::ToolCall(
                        "token_received_symbol must not be empty".to_string(),
                    ));
                }

                Ok(Command::CreateSwap {
                    amount_in,
                    symbol_out,
                })
            }
            CONFIRM_SWAP => {
                let confirm = call
                    .arguments
                    .get("confirm")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| {
                        Error::ToolCall("confirm_swap requires a boolean 'confirm'".to_string())
                    })?;
                Ok(Command::ConfirmSwap { confirm })
            }
            GET_TOKEN_BALANCE => Ok(Command::TokenBalance {
                token_address: address_arg(&call.arguments)?,
            }),
            GET_TOKEN_PRICE => Ok(Command::TokenPrice {
                token_address: address_arg(&call.arguments)?,
            }),
            other => Err(Error::ToolCall(format!("unknown tool '{}'", other))),
        }
    }
}

fn string_arg(arguments: &Value, key: &str) -> Result<String, Error> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| Error::ToolCall(format!("missing string argument '{}'", key)))
}

fn address_arg(arguments: &Value) -> Result<String, Error> {
    let address = string_arg(arguments, "token_address")?;
    if !is_address(&address) {
        return Err(Error::ToolCall(format!(
            "'{}' is not a valid contract address",
            address
        )));
    }
    Ok(address)
}

fn is_address(s: &str) -> bool {
    s.len() == 42 && s.starts_with("0x") && hex::decode(&s[2..]).is_ok()
}
