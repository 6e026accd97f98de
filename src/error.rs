use thiserror::Error;

/// SDK Error type
#[derive(Error, Debug)]
pub enum Error {
    /// No token on the target chain matched the requested symbol
    #[error("token {0} not found on Polygon")]
    TokenNotFound(String),

    /// The routing provider failed to return a price quote
    #[error("quote fetch failed: {0}")]
    QuoteFetch(String),

    /// The routing provider failed to return an executable route
    #[error("route fetch failed: {0}")]
    RouteFetch(String),

    /// The wallet signing prompt was dismissed by the user
    #[error("transaction was rejected in wallet: {0}")]
    UserRejected(String),

    /// Transaction submission or on-chain confirmation failed
    #[error("execution error: {0}")]
    Execution(String),

    /// Configuration error (missing or invalid API key, bad network config)
    #[error("configuration error: {0}")]
    Config(String),

    /// A tool call from the language model did not validate
    #[error("invalid tool call: {0}")]
    ToolCall(String),

    /// Language model provider error
    #[error("chat completion error: {0}")]
    Llm(String),

    /// Amount parsing or formatting error
    #[error("amount error: {0}")]
    Amount(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/Deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
