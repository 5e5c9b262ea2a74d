//! Keyforge CLI
//!
//! Command-line front end for deriving Solana and Ethereum wallets from one
//! mnemonic, syncing their balances and issuing SPL tokens on a test network.

mod app;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyforge_wallet::account::{SyncStatus, Wallet};
use keyforge_wallet::crypto::keys::Chain;
use keyforge_wallet::crypto::mnemonic::MnemonicStrength;
use keyforge_wallet::sync::SyncOutcome;
use keyforge_wallet::token::CreateTokenParams;
use keyforge_wallet::Config;

use crate::app::App;

#[derive(Parser)]
#[command(name = "keyforge")]
#[command(about = "Deterministic Solana and Ethereum wallets from one mnemonic")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Mnemonic management
    Mnemonic {
        #[command(subcommand)]
        action: MnemonicCommands,
    },
    /// Derived wallets
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },
    /// Request test SOL from the faucet
    Airdrop {
        #[arg(long)]
        wallet: String,
        /// Amount in SOL
        #[arg(long, default_value_t = 1.0)]
        amount: f64,
    },
    /// SPL token issuance and holdings
    Token {
        #[command(subcommand)]
        action: TokenCommands,
    },
}

#[derive(Subcommand)]
enum MnemonicCommands {
    /// Generate a new mnemonic, clearing all wallets
    New {
        #[arg(long, default_value = "12", value_parser = ["12", "24"])]
        words: String,
    },
    /// Import an existing mnemonic, clearing all wallets
    Import { phrase: String },
    /// Print the current mnemonic
    Show,
    /// Forget the mnemonic and every wallet
    Reset,
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Derive the next wallet(s) for a chain
    New {
        #[arg(long)]
        chain: Chain,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// List wallets
    List {
        #[arg(long)]
        chain: Option<Chain>,
        /// Print the full state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Refresh balances and transaction counts
    Refresh {
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Create a new SPL token
    Create {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 9)]
        decimals: u8,
        /// Whole tokens minted to the creator
        #[arg(long, default_value_t = 0)]
        supply: u64,
        #[arg(long)]
        freeze: bool,
        #[arg(long)]
        no_mint_authority: bool,
    },
    /// Mint more of an existing token
    Mint {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        mint: String,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        recipient: Option<String>,
    },
    /// Refresh a wallet's token holdings
    Balances {
        #[arg(long)]
        wallet: String,
    },
    /// Set display name and symbol of a held token
    Metadata {
        #[arg(long)]
        mint: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
    },
    /// List tokens created by this wallet
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    let app = App::new(&config)?;
    info!(version = keyforge_wallet::VERSION, "Keyforge started");

    match cli.command {
        Commands::Mnemonic { action } => handle_mnemonic_command(action, &app)?,
        Commands::Wallet { action } => handle_wallet_command(action, &app).await?,
        Commands::Airdrop { wallet, amount } => {
            let receipt = app.airdrop.request_test_funds(&wallet, amount).await?;
            println!("Airdrop confirmed: {}", receipt.signature);
            println!("Balance: {} SOL", receipt.balance);
            if let Some(refresh) = receipt.refresh {
                refresh.await?;
            }
        }
        Commands::Token { action } => handle_token_command(action, &app).await?,
    }

    Ok(())
}

fn handle_mnemonic_command(action: MnemonicCommands, app: &App) -> Result<()> {
    match action {
        MnemonicCommands::New { words } => {
            let strength = if words == "24" { MnemonicStrength::Words24 } else { MnemonicStrength::Words12 };
            let phrase = app.state.generate_mnemonic(strength)?;
            println!("{}", phrase.as_str());
        }
        MnemonicCommands::Import { phrase } => {
            let phrase = app.state.import_mnemonic(&phrase)?;
            println!("Imported {}-word mnemonic", phrase.word_count());
        }
        MnemonicCommands::Show => match app.state.mnemonic() {
            Some(phrase) => println!("{}", phrase.as_str()),
            None => bail!("No mnemonic yet; run `keyforge mnemonic new`"),
        },
        MnemonicCommands::Reset => {
            app.state.reset()?;
            println!("Mnemonic and wallets cleared");
        }
    }
    Ok(())
}

async fn handle_wallet_command(action: WalletCommands, app: &App) -> Result<()> {
    match action {
        WalletCommands::New { chain, count } => {
            for _ in 0..count {
                app.state.create_wallet(chain)?;
            }
            report(&app.sync.refresh_pending().await);
            print_wallets(&app.state.wallets(chain));
        }
        WalletCommands::List { chain, json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&app.state.snapshot().registry)?);
                return Ok(());
            }
            for c in Chain::ALL {
                if chain.map_or(true, |wanted| wanted == c) {
                    print_wallets(&app.state.wallets(c));
                }
            }
        }
        WalletCommands::Refresh { id } => {
            let outcomes = match id {
                Some(id) => vec![app.sync.refresh_wallet(&id).await?],
                None => app.sync.refresh_all(None).await,
            };
            report(&outcomes);
            for chain in Chain::ALL {
                print_wallets(&app.state.wallets(chain));
            }
        }
    }
    Ok(())
}

async fn handle_token_command(action: TokenCommands, app: &App) -> Result<()> {
    match action {
        TokenCommands::Create { wallet, name, symbol, decimals, supply, freeze, no_mint_authority } => {
            let params = CreateTokenParams {
                wallet_id: wallet,
                name,
                symbol,
                decimals,
                initial_supply: supply,
                freeze_authority: freeze,
                mint_authority: !no_mint_authority,
            };
            let run = app.tokens.create_token(&params).await;
            let stages: Vec<String> = run.stages().iter().map(|s| s.to_string()).collect();
            println!("{}", stages.join(" -> "));

            let record = run.into_result()?;
            println!("Mint: {}", record.mint_address);
            println!("Supply: {} (base units)", record.supply);
        }
        TokenCommands::Mint { wallet, mint, amount, recipient } => {
            let receipt = app.tokens.mint_additional(&wallet, &mint, amount, recipient.as_deref()).await?;
            println!("Minted {} base units to {} ({})", receipt.amount, receipt.token_account, receipt.signature);
        }
        TokenCommands::Balances { wallet } => {
            let balances = app.portfolio.refresh_token_balances(&wallet).await?;
            if balances.is_empty() {
                println!("No token holdings");
            }
            for balance in balances {
                let label = balance.symbol.clone().unwrap_or_else(|| balance.mint_address.clone());
                println!("{:<12} {:>20} ({})", label, balance.ui_amount(), balance.token_account);
            }
        }
        TokenCommands::Metadata { mint, name, symbol } => {
            if !app.portfolio.set_token_metadata(&mint, &name, &symbol)? {
                bail!("Token {} is not among the current holdings", mint);
            }
        }
        TokenCommands::List => {
            for token in app.state.tokens() {
                println!(
                    "{} {:<8} {:<24} decimals={} supply={}",
                    token.mint_address, token.symbol, token.name, token.decimals, token.supply
                );
            }
        }
    }
    Ok(())
}

fn print_wallets(wallets: &[Wallet]) {
    for wallet in wallets {
        let status = match &wallet.sync_status {
            SyncStatus::Idle => "ok".to_string(),
            SyncStatus::Loading => "loading".to_string(),
            SyncStatus::Error(message) => format!("error: {}", message),
        };
        println!(
            "{:<32} #{:<3} {:<44} {:>14.9} {} txs={} [{}]",
            wallet.id(),
            wallet.index(),
            wallet.public_identifier(),
            wallet.balance,
            wallet.chain().native_symbol(),
            wallet.transaction_count,
            status
        );
    }
}

fn report(outcomes: &[SyncOutcome]) {
    let failed = outcomes.iter().filter(|o| !o.is_complete()).count();
    if failed > 0 {
        eprintln!("{} of {} refreshes were incomplete", failed, outcomes.len());
    }
}
