//! CLI commands for the multisig wallet
//!
//! Every mutating command loads the wallet, claims its current snapshot,
//! submits one operation and commits the result only if no other process
//! saved the wallet in the meantime.

use crate::crypto::{public_key_from_hex, public_key_to_address, Digest, KeyPair};
use crate::multisig::{
    AccountLedger, Action, ErrorKind, MultisigError, MultisigEvent, MultisigWallet, Phase, Policy,
};
use crate::storage::{Storage, StorageConfig, StorageError};
use std::error::Error;
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Options for creating a wallet
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub signers: Vec<String>,
    pub threshold: u64,
    pub balance: u64,
    pub label: Option<String>,
    pub policy: Policy,
    pub force: bool,
}

/// Application state
pub struct AppState {
    pub wallet: MultisigWallet,
    pub storage: Storage,
    pub data_dir: PathBuf,
    /// Snapshot of the wallet as it was read from disk
    loaded: Digest,
}

impl AppState {
    /// Load the wallet stored in `data_dir`
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage = Storage::new(storage_config(&data_dir))?;
        if !storage.exists() {
            return Err(format!(
                "no wallet in {:?}; create one with: multisig init",
                data_dir
            )
            .into());
        }
        let wallet = storage.load()?;
        let loaded = wallet.state().snapshot();
        log::debug!(
            "Loaded wallet at version {} (snapshot {})",
            wallet.state().version,
            loaded.short()
        );

        Ok(Self {
            wallet,
            storage,
            data_dir,
            loaded,
        })
    }

    /// Write the wallet back, provided the file still holds what was loaded
    pub fn save(&mut self) -> CliResult<()> {
        self.storage.commit(&self.wallet, &self.loaded)?;
        self.loaded = self.wallet.state().snapshot();
        Ok(())
    }
}

fn storage_config(data_dir: &Path) -> StorageConfig {
    StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    }
}

/// Classify a command failure, if it came from the wallet's rules
pub fn error_kind(err: &(dyn Error + 'static)) -> Option<ErrorKind> {
    if let Some(e) = err.downcast_ref::<MultisigError>() {
        return Some(e.kind());
    }
    match err.downcast_ref::<StorageError>() {
        Some(StorageError::Multisig(e)) => Some(e.kind()),
        _ => None,
    }
}

/// Process exit code for a failed command; 2 means "reload and retry"
pub fn exit_code(kind: Option<ErrorKind>) -> i32 {
    match kind {
        Some(ErrorKind::StateConflict) => 2,
        _ => 1,
    }
}

/// Generate signer key pairs
pub fn cmd_keygen(count: u32) -> CliResult<()> {
    for _ in 0..count {
        let kp = KeyPair::generate();
        println!("🔐 New signer key");
        println!("   🔑 Private key: {}", kp.private_key_hex());
        println!("   📢 Public key:  {}", kp.public_key_hex());
        println!("   📍 Address:     {}", kp.address());
        println!("   🆔 Identity:    {}", kp.identity());
    }
    println!("\n   ⚠️  Private keys are not stored. Keep them safe!");
    Ok(())
}

/// Create and set up a new wallet
pub fn cmd_init(data_dir: &Path, options: InitOptions) -> CliResult<()> {
    let storage = Storage::new(storage_config(data_dir))?;

    if storage.exists() && !options.force {
        println!("⚠️  Wallet already exists at {:?}", data_dir);
        println!("   Use --force to replace it (this discards the existing wallet)");
        return Ok(());
    }

    let keys = options
        .signers
        .iter()
        .map(|s| public_key_from_hex(s))
        .collect::<Result<Vec<_>, _>>()?;

    let mut wallet = MultisigWallet::new(
        options.policy,
        AccountLedger::with_balance(options.balance),
        options.label,
    );
    let state = wallet.setup(&keys, options.threshold)?;
    storage.save(&wallet)?;

    println!("✅ Multisig wallet initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   👥 Policy: {}", wallet.description());
    println!("   🌳 Signer root: {}", state.signer_root);
    println!("   💰 Balance: {}", wallet.host().ledger().balance());

    Ok(())
}

/// Add a signer
pub fn cmd_add_signer(state: &mut AppState, pubkey: &str) -> CliResult<()> {
    let key = public_key_from_hex(pubkey)?;
    let committed = state.wallet.add_signer(&key)?;
    state.save()?;

    println!("➕ Signer added: {}", public_key_to_address(&key));
    println!("   👥 Policy: {}", state.wallet.description());
    println!("   🌳 Signer root: {}", committed.signer_root);
    Ok(())
}

/// Remove a signer
pub fn cmd_remove_signer(state: &mut AppState, pubkey: &str) -> CliResult<()> {
    let key = public_key_from_hex(pubkey)?;
    let committed = state.wallet.remove_signer(&key)?;
    state.save()?;

    println!("➖ Signer removed: {}", public_key_to_address(&key));
    println!("   👥 Policy: {}", state.wallet.description());
    println!("   🌳 Signer root: {}", committed.signer_root);
    Ok(())
}

/// Change the approval threshold
pub fn cmd_set_threshold(state: &mut AppState, threshold: u64) -> CliResult<()> {
    state.wallet.set_threshold(threshold)?;
    state.save()?;

    println!("🔧 Threshold updated");
    println!("   👥 Policy: {}", state.wallet.description());
    Ok(())
}

/// Approve a balance change with a signer's private key
pub fn cmd_sign(state: &mut AppState, private_key: &str, amount: i64) -> CliResult<()> {
    let kp = KeyPair::from_private_key_hex(private_key)?;
    let committed = state.wallet.approve(&kp, Action::new(amount))?;
    state.save()?;

    println!("✍️  Approval recorded from {}", kp.address());
    println!(
        "   ├─ Approvals: {}/{}",
        committed.tally.count, committed.threshold
    );
    println!("   └─ Next nonce: {}", committed.nonce.value());
    if committed.phase() == Phase::ReadyToExecute {
        println!("\n   ✅ Threshold reached, ready to execute");
    }
    Ok(())
}

/// Execute the approved balance change
pub fn cmd_execute(state: &mut AppState, amount: i64) -> CliResult<()> {
    let action = Action::new(amount);
    state.wallet.execute(action)?;
    state.save()?;

    println!("🚀 Executed {}", action);
    println!(
        "   💰 New balance: {}",
        state.wallet.host().ledger().balance()
    );
    Ok(())
}

/// Show wallet status
pub fn cmd_status(state: &AppState) -> CliResult<()> {
    let wallet = &state.wallet;
    let committed = wallet.state();

    println!("📊 Multisig Wallet");
    if let Some(label) = &wallet.label {
        println!("   ├─ Label: {}", label);
    }
    println!("   ├─ Policy: {}", wallet.description());
    println!("   ├─ Flags: {:?}", wallet.host().policy());
    println!("   ├─ Phase: {:?}", committed.phase());
    println!("   ├─ Signer root: {}", committed.signer_root);
    println!("   ├─ Nonce: {}", committed.nonce.value());
    println!("   ├─ Approvals: {}", committed.tally.count);
    match committed.tally.pending {
        Some(pending) => println!("   ├─ Pending action: {}", pending),
        None => println!("   ├─ Pending action: -"),
    }
    println!("   ├─ Balance: {}", wallet.host().ledger().balance());
    println!("   ├─ Version: {}", committed.version);
    println!("   └─ Snapshot: {}", committed.snapshot());
    Ok(())
}

/// List signer identities
pub fn cmd_signers(state: &AppState) -> CliResult<()> {
    let signers = state.wallet.signers();
    println!("👥 Signers ({}):", signers.count());
    for identity in signers.identities() {
        let approved = if state.wallet.approvers().contains(identity) {
            " ✍️"
        } else {
            ""
        };
        println!("   {}{}", identity, approved);
    }
    Ok(())
}

/// Show recent events
pub fn cmd_events(state: &AppState, count: usize) -> CliResult<()> {
    let events = state.wallet.host().events();
    if events.is_empty() {
        println!("📭 No events recorded");
        return Ok(());
    }

    println!("📜 Events (latest {}):", count.min(events.len()));
    for recorded in events.iter().rev().take(count) {
        let summary = match &recorded.event {
            MultisigEvent::WalletCreated {
                signer_count,
                threshold,
                ..
            } => format!("wallet created, {}-of-{}", threshold, signer_count),
            MultisigEvent::SignerAdded { identity } => format!("signer added {}", identity.short()),
            MultisigEvent::SignerRemoved { identity } => {
                format!("signer removed {}", identity.short())
            }
            MultisigEvent::ThresholdChanged { threshold } => {
                format!("threshold changed to {}", threshold)
            }
            MultisigEvent::ApprovalsReset { discarded } => {
                format!("{} approval(s) discarded", discarded)
            }
            MultisigEvent::ApprovalRecorded {
                identity,
                nonce,
                approvals,
            } => format!(
                "approval {} from {} at nonce {}",
                approvals,
                identity.short(),
                nonce
            ),
            MultisigEvent::TransactionExecuted { balance_change, .. } => {
                format!("executed balance change {:+}", balance_change)
            }
        };
        println!(
            "   v{:<4} {} {}",
            recorded.version,
            recorded.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            summary
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_wallet(dir: &Path, keys: &[KeyPair], threshold: u64) {
        cmd_init(
            dir,
            InitOptions {
                signers: keys.iter().map(|k| k.public_key_hex()).collect(),
                threshold,
                balance: 100,
                label: Some("ops".to_string()),
                policy: Policy::default(),
                force: false,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_cli_flow() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        init_wallet(temp_dir.path(), &keys, 2);

        let mut state = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        cmd_sign(&mut state, &keys[0].private_key_hex(), -40).unwrap();
        cmd_sign(&mut state, &keys[1].private_key_hex(), -40).unwrap();
        cmd_execute(&mut state, -40).unwrap();
        cmd_status(&state).unwrap();
        cmd_events(&state, 10).unwrap();

        let reloaded = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.wallet.host().ledger().balance(), 60);
        assert_eq!(reloaded.wallet.state().nonce.value(), 2);
    }

    #[test]
    fn test_rejected_command_not_saved() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keys: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
        init_wallet(temp_dir.path(), &keys, 2);

        let mut state = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert!(cmd_remove_signer(&mut state, &keys[0].public_key_hex()).is_err());
        assert!(cmd_set_threshold(&mut state, 5).is_err());

        let reloaded = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.wallet.description(), "2-of-2");
    }

    #[test]
    fn test_concurrent_commands_conflict() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        init_wallet(temp_dir.path(), &keys, 2);

        let mut first = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        let mut second = AppState::new(temp_dir.path().to_path_buf()).unwrap();

        cmd_sign(&mut first, &keys[0].private_key_hex(), -40).unwrap();
        let err = cmd_sign(&mut second, &keys[1].private_key_hex(), -90).unwrap_err();
        assert_eq!(error_kind(err.as_ref()), Some(ErrorKind::StateConflict));
        assert_eq!(exit_code(error_kind(err.as_ref())), 2);

        let reloaded = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        let committed = reloaded.wallet.state();
        assert_eq!(committed.nonce.value(), 1);
        assert_eq!(committed.tally.count, 1);
        assert_eq!(
            committed.tally.pending,
            Some(Action::new(-40).commitment())
        );
        assert!(reloaded.wallet.approvers().contains(&keys[0].identity()));

        // A fresh load sees the committed approval and can build on it
        let mut retry = reloaded;
        cmd_sign(&mut retry, &keys[1].private_key_hex(), -40).unwrap();
        assert_eq!(retry.wallet.state().phase(), Phase::ReadyToExecute);
    }

    #[test]
    fn test_error_kind_of_rule_violation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keys: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
        init_wallet(temp_dir.path(), &keys, 2);

        let mut state = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        let err = cmd_execute(&mut state, -1).unwrap_err();
        assert_eq!(
            error_kind(err.as_ref()),
            Some(ErrorKind::InsufficientApprovals)
        );
        assert_eq!(exit_code(error_kind(err.as_ref())), 1);

        let err = cmd_sign(&mut state, "zz", -1).unwrap_err();
        assert_eq!(error_kind(err.as_ref()), None);
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keys: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
        init_wallet(temp_dir.path(), &keys, 1);
        init_wallet(temp_dir.path(), &keys, 2);

        let state = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(state.wallet.description(), "1-of-2");
    }

    #[test]
    fn test_missing_wallet() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(AppState::new(temp_dir.path().to_path_buf()).is_err());
    }
}
