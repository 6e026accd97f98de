use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatswap_sdk::{
    ChatSession, EthersWallet, JsonSettingsStore, NetworkConstants, OpenAiChat, RouterClient,
    SettingsStore, TxStatus, Wallet,
};

/// Chat-driven token swaps on Polygon
#[derive(Parser, Debug)]
#[command(name = "chatswap", version, about)]
struct Cli {
    /// Network section to load from config/network.toml
    #[arg(long, default_value = "polygon")]
    network: String,

    /// Chat model to use
    #[arg(long)]
    model: Option<String>,

    /// Execute prepared swaps without asking for confirmation
    #[arg(long)]
    no_confirm: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let network = NetworkConstants::load_or_default(&cli.network);

    let store = Arc::new(JsonSettingsStore::new(JsonSettingsStore::default_path()));
    let mut settings = store.load()?;
    if cli.no_confirm {
        settings.send_without_confirm = true;
    }

    let api_key = settings
        .api_key
        .clone()
        .or_else(|| env::var("OPENAI_API_KEY").ok())
        .ok_or_else(|| {
            anyhow!("no API key configured; set OPENAI_API_KEY or add it to the settings file")
        })?;

    let router_api_key = env::var("ROUTER_API_KEY")
        .context("ROUTER_API_KEY must be set to reach the routing provider")?;
    let private_key = env::var("WALLET_PRIVATE_KEY")
        .context("WALLET_PRIVATE_KEY must be set to sign transactions")?;

    let mut backend = OpenAiChat::new(&api_key)?;
    if let Some(model) = &cli.model {
        backend = backend.with_model(model);
    }

    let router = Arc::new(RouterClient::new(&network.router_api_url, &router_api_key));
    let wallet = Arc::new(EthersWallet::new(
        &network.rpc_url,
        &private_key,
        network.chain_id,
    )?);

    println!("Connected as {} on {}", wallet.address(), network.network_name);
    println!("Type an instruction, or /help for commands.\n");

    let mut session = ChatSession::new(
        Arc::new(backend),
        router.clone(),
        router,
        wallet,
        store,
        network,
        settings,
    );

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/queue" => print_queue(&session),
            "/toggle-confirm" => {
                let enabled = session.toggle_send_without_confirm()?;
                println!(
                    "Send without confirmation is now {}.",
                    if enabled { "on" } else { "off" }
                );
            }
            "/execute-all" => match session.execute_all().await {
                Ok(messages) => print_messages(&messages),
                Err(e) => eprintln!("error: {}", e),
            },
            _ if line.starts_with("/delete ") => match entry_id(&session, &line[8..]) {
                Some(id) => {
                    if session.delete(id) {
                        println!("Deleted.");
                    } else {
                        println!("Only pending entries can be deleted.");
                    }
                }
                None => println!("No such queue entry."),
            },
            _ if line.starts_with("/move ") => {
                let mut parts = line[6..].split_whitespace();
                let entry = parts.next().and_then(|p| entry_id(&session, p));
                let target = parts.next().and_then(|p| p.parse::<usize>().ok());
                match (entry, target) {
                    (Some(id), Some(position)) if position >= 1 => {
                        if session.reorder(id, position - 1) {
                            println!("Moved.");
                        } else {
                            println!("Only pending entries can be moved.");
                        }
                    }
                    _ => println!("Usage: /move <entry> <position>"),
                }
            }
            _ => match session.handle_user_input(line).await {
                Ok(messages) => print_messages(&messages),
                Err(e) => eprintln!("error: {}", e),
            },
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /queue            show the transaction queue");
    println!("  /execute-all      execute every pending entry as one bundle");
    println!("  /move <n> <pos>   move pending entry n to position pos");
    println!("  /delete <n>       delete pending entry n");
    println!("  /toggle-confirm   flip the send-without-confirmation setting");
    println!("  /quit             exit");
}

fn print_messages(messages: &[String]) {
    for message in messages {
        println!("{}\n", message);
    }
}

fn print_queue(session: &ChatSession) {
    let entries = session.queue().entries();
    if entries.is_empty() {
        println!("The queue is empty.");
        return;
    }
    for (index, entry) in entries.iter().enumerate() {
        let status = match entry.status {
            TxStatus::Pending => "pending",
            TxStatus::Executing => "executing",
            TxStatus::Completed => "completed",
            TxStatus::Failed => "failed",
        };
        let detail = entry
            .result
            .as_ref()
            .map(|r| {
                format!(
                    "{} -> {} {}",
                    r.formatted_amount_in, r.formatted_amount_out, r.token_out.symbol
                )
            })
            .unwrap_or_else(|| entry.name.clone());
        let hash = entry
            .tx_hash
            .as_deref()
            .map(|h| format!("  {}", h))
            .unwrap_or_default();
        println!("{:>3}. [{}] {}{}", index + 1, status, detail, hash);
    }
}

/// Resolve a 1-based queue position to an entry id
fn entry_id(session: &ChatSession, input: &str) -> Option<uuid::Uuid> {
    let position: usize = input.trim().parse().ok()?;
    session
        .queue()
        .entries()
        .get(position.checked_sub(1)?)
        .map(|entry| entry.id)
}
