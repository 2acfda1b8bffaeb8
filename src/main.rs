//! Merkle-multisig CLI Application
//!
//! A command-line interface for managing a threshold multisig wallet.

use clap::{Parser, Subcommand};
use merkle_multisig::cli::{self, AppState, InitOptions};
use merkle_multisig::multisig::{ErrorKind, Policy};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "multisig")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Threshold multisig wallet over a sparse Merkle signer set", long_about = None)]
struct Cli {
    /// Data directory for wallet storage
    #[arg(short, long, default_value = ".multisig_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate signer key pairs
    Keygen {
        /// Number of key pairs to generate
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Create a wallet with an initial signer set
    Init {
        /// Signer public key (hex), repeat for each signer
        #[arg(short, long = "signer", required = true)]
        signers: Vec<String>,

        /// Approvals required to execute
        #[arg(short, long)]
        threshold: u64,

        /// Opening balance of the wallet account
        #[arg(short, long, default_value = "0")]
        balance: u64,

        /// Wallet label
        #[arg(short, long)]
        label: Option<String>,

        /// Signatures cover only the nonce, not the action
        #[arg(long)]
        no_bind_action: bool,

        /// Keep collected approvals across signer or threshold changes
        #[arg(long)]
        no_reset: bool,

        /// Count repeated approvals from the same signer
        #[arg(long)]
        allow_repeat: bool,

        /// Replace an existing wallet
        #[arg(long)]
        force: bool,
    },

    /// Add a signer
    AddSigner {
        /// Public key (hex)
        pubkey: String,
    },

    /// Remove a signer
    RemoveSigner {
        /// Public key (hex)
        pubkey: String,
    },

    /// Change the approval threshold
    Threshold {
        /// New threshold
        value: u64,
    },

    /// Approve a balance change
    Sign {
        /// Signer's private key (hex)
        #[arg(short, long)]
        key: String,

        /// Signed balance change (negative withdraws)
        #[arg(short, long, allow_hyphen_values = true)]
        amount: i64,
    },

    /// Execute an approved balance change
    Execute {
        /// Signed balance change (must match the approvals)
        #[arg(short, long, allow_hyphen_values = true)]
        amount: i64,
    },

    /// Show wallet status
    Status,

    /// List signer identities
    Signers,

    /// Show the event log
    Events {
        /// Number of events to show
        #[arg(short, long, default_value = "20")]
        count: usize,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Keygen { count } => cli::cmd_keygen(count),

        Commands::Init {
            signers,
            threshold,
            balance,
            label,
            no_bind_action,
            no_reset,
            allow_repeat,
            force,
        } => {
            let mut policy = Policy::default();
            policy.set(Policy::BIND_ACTION, !no_bind_action);
            policy.set(Policy::RESET_ON_RECONFIGURE, !no_reset);
            policy.set(Policy::DISTINCT_APPROVERS, !allow_repeat);

            cli::cmd_init(
                &cli.data_dir,
                InitOptions {
                    signers,
                    threshold,
                    balance,
                    label,
                    policy,
                    force,
                },
            )
        }

        Commands::AddSigner { pubkey } => with_wallet(cli.data_dir, |state| {
            cli::cmd_add_signer(state, &pubkey)
        }),

        Commands::RemoveSigner { pubkey } => with_wallet(cli.data_dir, |state| {
            cli::cmd_remove_signer(state, &pubkey)
        }),

        Commands::Threshold { value } => {
            with_wallet(cli.data_dir, |state| cli::cmd_set_threshold(state, value))
        }

        Commands::Sign { key, amount } => {
            with_wallet(cli.data_dir, |state| cli::cmd_sign(state, &key, amount))
        }

        Commands::Execute { amount } => {
            with_wallet(cli.data_dir, |state| cli::cmd_execute(state, amount))
        }

        Commands::Status => with_wallet(cli.data_dir, |state| cli::cmd_status(state)),

        Commands::Signers => with_wallet(cli.data_dir, |state| cli::cmd_signers(state)),

        Commands::Events { count } => {
            with_wallet(cli.data_dir, |state| cli::cmd_events(state, count))
        }
    };

    if let Err(e) = result {
        let kind = cli::error_kind(e.as_ref());
        eprintln!("❌ Error: {}", e);
        if kind == Some(ErrorKind::StateConflict) {
            eprintln!("   The wallet changed since it was loaded. Re-run the command.");
        }
        std::process::exit(cli::exit_code(kind));
    }
}

/// Load the wallet in `data_dir` and run `f` against it
fn with_wallet<F>(data_dir: PathBuf, f: F) -> cli::CliResult<()>
where
    F: FnOnce(&mut AppState) -> cli::CliResult<()>,
{
    let mut state = AppState::new(data_dir)?;
    f(&mut state)
}
