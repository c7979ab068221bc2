use anyhow::Result;
use blockchain::SolanaRpcClient;
use clap::{Parser, Subcommand};
use shared::config::Config;
use shared::format::{format_sol, format_usd, truncate_address};
use shared::models::{Wallet, WalletUpdate};
use std::sync::Arc;
use storage::{FileStore, WalletStore};
use tracker::logging::{init_logging, init_logging_pretty, LogFormat};
use tracker::{price_source_from_config, TokenMetadataService, WalletService};

#[derive(Parser)]
#[command(name = "wallet-tracker", about = "Track balances, tokens and activity of Solana wallets")]
struct Cli {
    /// Emit JSON log lines instead of human readable ones
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show all tracked wallets
    List,
    /// Start tracking a wallet
    Add {
        address: String,
        #[arg(long)]
        nickname: Option<String>,
    },
    /// Stop tracking a wallet
    Remove { address: String },
    /// Change a wallet's nickname
    Rename { address: String, nickname: String },
    /// Re-fetch one wallet, or all of them
    Refresh { address: Option<String> },
    /// Search the token directory by symbol or name
    Tokens { query: String },
    /// Delete all persisted data
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        init_logging(LogFormat::Json);
    } else {
        init_logging_pretty();
    }

    let config = Config::from_env()?;
    tracing::debug!("Configuration loaded");

    let kv = Arc::new(FileStore::open(config.storage.data_dir.clone()).await?);
    let store = WalletStore::new(kv.clone());
    let rpc = Arc::new(SolanaRpcClient::from_config(&config.solana));
    let wallet_service = WalletService::new(rpc, store.clone(), config.solana.transaction_limit);
    let token_service = TokenMetadataService::new(config.token_list.clone(), kv);
    let prices = price_source_from_config(&config.price);

    match cli.command {
        Command::List => {
            token_service.load_token_list().await;
            let sol_price = prices.get_sol_price().await;
            let wallets = wallet_service.wallets().await?;
            if wallets.is_empty() {
                println!("No wallets tracked yet");
            }
            for wallet in &wallets {
                print_wallet(wallet, &token_service, sol_price);
            }
        }
        Command::Add { address, nickname } => {
            let wallet = wallet_service.add_wallet(address.trim(), nickname).await?;
            token_service.load_token_list().await;
            print_wallet(&wallet, &token_service, prices.get_sol_price().await);
        }
        Command::Remove { address } => {
            wallet_service.remove_wallet(address.trim()).await?;
            println!("Removed {}", truncate_address(address.trim(), 4));
        }
        Command::Rename { address, nickname } => {
            let wallet = wallet_service
                .update_wallet(address.trim(), WalletUpdate::nickname(nickname))
                .await?;
            println!("{} is now '{}'", truncate_address(&wallet.address, 4), wallet.label());
        }
        Command::Refresh { address: Some(address) } => {
            let wallet = wallet_service.refresh_one(address.trim()).await?;
            token_service.load_token_list().await;
            print_wallet(&wallet, &token_service, prices.get_sol_price().await);
        }
        Command::Refresh { address: None } => {
            let report = wallet_service.refresh_all().await?;
            println!(
                "Refreshed {}/{} wallets",
                report.refreshed_count(),
                report.wallets.len()
            );
            for address in &report.failed {
                println!("  stale: {}", truncate_address(address, 4));
            }
        }
        Command::Tokens { query } => {
            token_service.load_token_list().await;
            let matches = token_service.search_tokens(&query);
            for token in matches.iter().take(20) {
                println!("{:<10} {:<32} {}", token.symbol, token.name, token.address);
            }
            println!("{} matches", matches.len());
        }
        Command::Clear => {
            store.clear_all().await?;
            println!("Cleared all tracker data");
        }
    }

    Ok(())
}

fn print_wallet(wallet: &Wallet, tokens: &TokenMetadataService, sol_price: f64) {
    let snapshot = &wallet.snapshot;

    println!(
        "{} [{}] {}",
        wallet.label(),
        truncate_address(&wallet.address, 4),
        wallet.color
    );
    print!("  {} SOL", format_sol(snapshot.balance.lamports, 4));
    if sol_price > 0.0 {
        print!(" ({})", format_usd(snapshot.balance.sol * sol_price));
    }
    println!();

    for holding in &snapshot.tokens {
        let symbol = tokens
            .get_token_metadata(&holding.mint)
            .map(|m| m.symbol)
            .unwrap_or_else(|| truncate_address(&holding.mint, 4));
        println!("  {} {}", holding.ui_amount, symbol);
    }

    println!(
        "  {} recent transactions, updated {}",
        snapshot.transactions.len(),
        snapshot.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    );
}
