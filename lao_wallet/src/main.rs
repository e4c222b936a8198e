mod state;
mod wallet;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use lao_cash::{
    Amount, ApplyOutcome, Hash, IssuanceGrant, LedgerConfig, OrganizationId, PublicKey,
    Transaction, TxSigner,
};
use state::{Session, WalletState};
use std::path::PathBuf;
use wallet::Wallet;

#[derive(Parser)]
#[command(name = "lao-wallet")]
#[command(about = "LAO Wallet - digital cash for a local autonomous organization")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Wallet directory (key file and default state file)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Ledger state file (overrides LAO_CASH_STATE_PATH)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Log ledger activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new key, or import one
    Keygen {
        /// Import from a base64url Ed25519 secret
        #[arg(long)]
        import: Option<String>,

        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Show public key and payment address
    Address,

    /// Record the organizer allowed to issue cash in an organization
    RegisterOrganizer {
        #[arg(long)]
        lao: String,

        /// Organizer public key (defaults to this wallet's key)
        #[arg(long)]
        organizer: Option<String>,
    },

    /// Issue new cash (organizer only)
    Issue {
        #[arg(long)]
        lao: String,

        /// Amount paid to each beneficiary
        #[arg(long)]
        amount: String,

        /// Beneficiary addresses
        #[arg(long = "to", required = true, num_args = 1..)]
        beneficiaries: Vec<String>,
    },

    /// Pay another member
    Send {
        #[arg(long)]
        lao: String,

        /// Recipient address
        #[arg(long)]
        to: String,

        #[arg(long)]
        amount: String,
    },

    /// Show a balance
    Balance {
        #[arg(long)]
        lao: String,

        /// Address to inspect (defaults to this wallet)
        #[arg(long)]
        owner: Option<String>,
    },

    /// List transactions paying an address
    History {
        #[arg(long)]
        lao: String,

        #[arg(long)]
        owner: Option<String>,
    },

    /// Rebuild indices from the logs and compare
    Verify {
        #[arg(long)]
        lao: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = LedgerConfig::from_env();
    let validation = config.validate();
    if cli.verbose || !validation.valid {
        validation.log_summary();
    }

    let dir = cli.dir.clone().unwrap_or_else(wallet::default_dir);
    let state_path = cli
        .state
        .clone()
        .or_else(|| config.state_path.clone())
        .unwrap_or_else(|| wallet::default_state_path(&dir));

    match cli.command {
        Commands::Keygen { import, force } => {
            if Wallet::exists(&dir) && !force {
                println!("{}", "⚠️  Wallet already exists!".yellow());
                println!("Use 'lao-wallet address' to view it, or pass --force to replace it");
                return Ok(());
            }

            let wallet = match import {
                Some(secret) => {
                    println!("{}", "🔑 Importing key...".cyan());
                    Wallet::from_secret(&secret)?
                }
                None => {
                    println!("{}", "🔐 Generating new key...".cyan());
                    Wallet::generate()
                }
            };
            wallet.save(&dir)?;

            println!("\n{}", "✅ Wallet saved".green());
            println!("{}", format!("Address: {}", wallet.address).cyan());
            println!("{}", format!("Public Key: {}", wallet.public_key).cyan());
            let key_file = format!("Key file: {}", wallet::key_path(&dir).display());
            println!("{}", key_file.bright_black());
        }

        Commands::Address => {
            let wallet = Wallet::load(&dir)?;
            println!("\n{}", "👛 Wallet Information".cyan().bold());
            println!("{}", "═".repeat(50).cyan());
            println!("{}: {}", "Address".bright_white(), wallet.address.to_string().green());
            println!("{}: {}", "Public Key".bright_white(), wallet.public_key);
            println!("{}: {}", "Created".bright_white(), wallet.created_at);
        }

        Commands::RegisterOrganizer { lao, organizer } => {
            let organizer = match organizer {
                Some(key) => PublicKey::from_base64(key.trim())?,
                None => Wallet::load(&dir)?.public_key,
            };
            let lao = OrganizationId::new(lao);

            let mut state = WalletState::load_or_init(&state_path, config.accounting)?;
            if let Some(previous) = state.organizers.insert(lao.clone(), organizer) {
                if previous != organizer {
                    println!("{}", format!("⚠️  Replacing organizer {}", previous).yellow());
                }
            }
            state.save(&state_path)?;
            println!("{}", format!("✅ {} may issue cash in {}", organizer, lao).green());
        }

        Commands::Issue {
            lao,
            amount,
            beneficiaries,
        } => {
            let wallet = Wallet::load(&dir)?;
            let keys = wallet.keys()?;
            let amount = Amount::parse(&amount)?.as_i64()?;
            let beneficiaries = beneficiaries
                .into_iter()
                .map(|b| Hash::new(b.trim()))
                .collect::<lao_cash::Result<Vec<_>>>()?;
            let lao = OrganizationId::new(lao);

            let state = WalletState::load_or_init(&state_path, config.accounting)?;
            let mut session = Session::open(&state, config.outbound_capacity)?;
            let grant = IssuanceGrant::request(session.registry(), &lao, &keys.public_key())
                .map_err(|_| anyhow!("This wallet is not the registered organizer of {}", lao))?;

            println!("{}", "🪙 Issuing...".cyan());
            let tx = session.service().issue(&grant, &beneficiaries, amount)?;
            session.echo(&keys.public_key())?;
            session.into_state().save(&state_path)?;

            print_transaction(&tx);
            println!("\n{}", "✅ Issuance applied".green().bold());
        }

        Commands::Send { lao, to, amount } => {
            let wallet = Wallet::load(&dir)?;
            let keys = wallet.keys()?;
            let recipient = Hash::new(to.trim())?;
            let amount = Amount::parse(&amount)?.as_i64()?;
            let lao = OrganizationId::new(lao);

            let state = WalletState::load_or_init(&state_path, config.accounting)?;
            let mut session = Session::open(&state, config.outbound_capacity)?;

            println!("{}", "📤 Preparing transaction...".cyan());
            let tx = session.service().send(&lao, &keys, &recipient, amount)?;
            let outcomes = session.echo(&keys.public_key())?;
            session.into_state().save(&state_path)?;

            print_transaction(&tx);
            if outcomes.contains(&ApplyOutcome::AlreadyApplied) {
                println!("{}", "Transaction was already in the ledger".yellow());
            }
            println!("\n{}", "✅ Transaction applied".green().bold());
        }

        Commands::Balance { lao, owner } => {
            let owner = resolve_owner(owner, &dir)?;
            let lao = OrganizationId::new(lao);
            let state = WalletState::load_or_init(&state_path, config.accounting)?;
            let session = Session::open(&state, config.outbound_capacity)?;

            let balance = session.service().ledger().balance(&lao, &owner);
            println!("\n{}", format!("Balance: {}", balance).green().bold());
            println!("{}", format!("({} in {})", owner, lao).bright_black());
        }

        Commands::History { lao, owner } => {
            let owner = resolve_owner(owner, &dir)?;
            let lao = OrganizationId::new(lao);
            let state = WalletState::load_or_init(&state_path, config.accounting)?;
            let session = Session::open(&state, config.outbound_capacity)?;

            let history = session.service().ledger().transactions_by_owner(&lao, &owner);
            if history.is_empty() {
                println!("{}", "No transactions".yellow());
            }
            for tx in &history {
                let received: u64 = tx
                    .outputs()
                    .iter()
                    .filter(|o| o.owner() == &owner)
                    .map(|o| o.value)
                    .sum();
                let kind = if tx.is_coinbase() { "issuance" } else { "transfer" };
                println!(
                    "{}  {:>8}  +{}",
                    tx.id().to_string().cyan(),
                    kind,
                    received.to_string().green()
                );
            }
        }

        Commands::Verify { lao } => {
            let state = WalletState::load_or_init(&state_path, config.accounting)?;
            let session = Session::open(&state, config.outbound_capacity)?;
            let ledger = session.service().ledger();

            let organizations = match lao {
                Some(lao) => vec![OrganizationId::new(lao)],
                None => ledger.organizations(),
            };
            let mut all_ok = true;
            for lao in organizations {
                let ok = ledger.verify_indices(&lao)?;
                all_ok &= ok;
                let mark = if ok { "✅".green() } else { "❌".red() };
                println!("{} {} ({} transactions)", mark, lao, ledger.log(&lao).len());
            }
            if !all_ok {
                return Err(anyhow!("index mismatch"));
            }
        }
    }

    Ok(())
}

fn resolve_owner(owner: Option<String>, dir: &std::path::Path) -> Result<Hash> {
    match owner {
        Some(owner) => Ok(Hash::new(owner.trim())?),
        None => Ok(Wallet::load(dir)?.address),
    }
}

fn print_transaction(tx: &Transaction) {
    println!("\n{}", "Transaction Details:".bright_white().bold());
    println!("{}", "─".repeat(50).bright_black());
    println!("{}: {}", "Id".bright_white(), tx.id().to_string().cyan());
    for input in tx.inputs() {
        println!("{}: {}", "Spends".bright_white(), input.outpoint);
    }
    for output in tx.outputs() {
        println!(
            "{}: {} -> {}",
            "Pays".bright_white(),
            output.value,
            output.owner().to_string().green()
        );
    }
    println!("{}", "─".repeat(50).bright_black());
}
