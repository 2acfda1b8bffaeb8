//! Wallet persistence layer
//!
//! Saves the wallet (committed state, ledger, event log and client-side
//! signer maps) as one JSON document, written to a temp file and renamed
//! into place so a crash never leaves a half-written wallet.
//!
//! [`Storage::commit`] is a compare-and-swap on the stored snapshot: it holds
//! a lock file while it re-reads the wallet on disk, and refuses to write if
//! another process committed since the caller loaded.

use crate::crypto::Digest;
use crate::multisig::{MultisigError, MultisigWallet};
use std::fs::{self, OpenOptions};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Wallet is locked by another process (remove {0:?} if it is stale)")]
    Locked(PathBuf),
    #[error(transparent)]
    Multisig(#[from] MultisigError),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub wallet_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".multisig_data"),
            wallet_file: "wallet.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Wallet storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::new(StorageConfig::default())
    }

    fn wallet_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.wallet_file)
    }

    fn temp_path(&self) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.tmp", self.config.wallet_file))
    }

    fn lock_path(&self) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.lock", self.config.wallet_file))
    }

    /// Take the exclusive write lock for this wallet file
    fn lock(&self) -> Result<WriteLock, StorageError> {
        let path = self.lock_path();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(WriteLock { path }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(StorageError::Locked(path)),
            Err(e) => Err(e.into()),
        }
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.wallet_file, index))
    }

    /// Save the wallet to disk, replacing whatever is stored
    pub fn save(&self, wallet: &MultisigWallet) -> Result<(), StorageError> {
        let _lock = self.lock()?;
        self.write(wallet)
    }

    /// Save the wallet only if the stored wallet still has snapshot `loaded`
    ///
    /// Fails with [`MultisigError::StateConflict`] when another writer
    /// committed in between; the stored wallet is left as it is.
    pub fn commit(&self, wallet: &MultisigWallet, loaded: &Digest) -> Result<(), StorageError> {
        let _lock = self.lock()?;

        let path = self.wallet_path();
        if path.exists() {
            let committed = load_from_file(&path)?.state().snapshot();
            if committed != *loaded {
                log::warn!(
                    "Refusing to save: wallet moved from {} to {}",
                    loaded.short(),
                    committed.short()
                );
                return Err(MultisigError::StateConflict {
                    claimed: *loaded,
                    committed,
                }
                .into());
            }
        }

        self.write(wallet)
    }

    fn write(&self, wallet: &MultisigWallet) -> Result<(), StorageError> {
        let path = self.wallet_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let temp_path = self.temp_path();
        save_to_file(wallet, &temp_path)?;
        fs::rename(&temp_path, &path)?;

        log::debug!("Saved wallet to {:?}", path);
        Ok(())
    }

    /// Load the wallet from disk
    pub fn load(&self) -> Result<MultisigWallet, StorageError> {
        let path = self.wallet_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Wallet file not found".to_string(),
            ));
        }

        load_from_file(&path)
    }

    pub fn exists(&self) -> bool {
        self.wallet_path().exists()
    }

    pub fn delete(&self) -> Result<(), StorageError> {
        let path = self.wallet_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn rotate_backups(&self) -> Result<(), StorageError> {
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<MultisigWallet, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        load_from_file(&backup_path)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }
}

/// Held while writing; removes the lock file when dropped
struct WriteLock {
    path: PathBuf,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to release lock {:?}: {}", self.path, e);
        }
    }
}

/// Save a wallet to a specific file path
pub fn save_to_file(wallet: &MultisigWallet, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, wallet)?;
    Ok(())
}

/// Load a wallet from a specific file path
///
/// The client-side signer map must reproduce the committed signer root,
/// otherwise every witness cut from it would be rejected.
pub fn load_from_file(path: &Path) -> Result<MultisigWallet, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let wallet: MultisigWallet = serde_json::from_reader(reader)?;

    let state = wallet.state();
    if state.initialized && wallet.signers().root() != state.signer_root {
        return Err(StorageError::InvalidData(format!(
            "signer map root {} does not match committed root {}",
            wallet.signers().root().short(),
            state.signer_root.short()
        )));
    }
    if wallet.approvers().root() != state.tally.approvers_root {
        return Err(StorageError::InvalidData(
            "approver map does not match committed tally".to_string(),
        ));
    }

    Ok(wallet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::multisig::{AccountLedger, Action, Policy};

    fn sample_wallet() -> (MultisigWallet, Vec<KeyPair>) {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let pubkeys: Vec<_> = keys.iter().map(|k| k.public_key).collect();
        let mut wallet =
            MultisigWallet::new(Policy::default(), AccountLedger::with_balance(50), None);
        wallet.setup(&pubkeys, 2).unwrap();
        (wallet, keys)
    }

    #[test]
    fn test_save_load_wallet() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        let (mut wallet, keys) = sample_wallet();
        wallet.approve(&keys[0], Action::new(-5)).unwrap();

        storage.save(&wallet).unwrap();
        assert!(storage.exists());

        let mut loaded = storage.load().unwrap();
        assert_eq!(loaded.state(), wallet.state());
        assert_eq!(loaded.host().events().len(), wallet.host().events().len());

        // The reloaded wallet can keep collecting approvals
        loaded.approve(&keys[1], Action::new(-5)).unwrap();
        loaded.execute(Action::new(-5)).unwrap();
        assert_eq!(loaded.host().ledger().balance(), 45);
    }

    #[test]
    fn test_tampered_signer_map_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("wallet.json");
        let (wallet, _) = sample_wallet();
        save_to_file(&wallet, &path).unwrap();

        let mut json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        json["signers"]["map"]["leaves"] = serde_json::json!({});
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(
            load_from_file(&path),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            max_backups: 3,
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        let (mut wallet, _) = sample_wallet();

        for threshold in [1, 2, 3, 1, 2] {
            storage.save(&wallet).unwrap();
            wallet.set_threshold(threshold).unwrap();
        }

        assert_eq!(storage.list_backups(), vec![0, 1, 2]);
        let restored = storage.restore_backup(0).unwrap();
        assert_eq!(restored.state().threshold, 3);
        assert!(storage.restore_backup(7).is_err());
    }

    #[test]
    fn test_commit_rejects_stale_snapshot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        let (wallet, keys) = sample_wallet();
        storage.save(&wallet).unwrap();

        let mut first = storage.load().unwrap();
        let mut second = storage.load().unwrap();
        let loaded = first.state().snapshot();

        first.approve(&keys[0], Action::new(-5)).unwrap();
        storage.commit(&first, &loaded).unwrap();

        second.approve(&keys[1], Action::new(-9)).unwrap();
        assert!(matches!(
            storage.commit(&second, &loaded),
            Err(StorageError::Multisig(MultisigError::StateConflict { .. }))
        ));

        let stored = storage.load().unwrap();
        assert_eq!(stored.state(), first.state());
        assert_eq!(stored.state().tally.pending, Some(Action::new(-5).commitment()));
    }

    #[test]
    fn test_held_lock_blocks_writers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        let (wallet, _) = sample_wallet();

        let lock = storage.lock().unwrap();
        assert!(matches!(storage.save(&wallet), Err(StorageError::Locked(_))));
        drop(lock);

        storage.save(&wallet).unwrap();
        assert!(!temp_dir.path().join("wallet.json.lock").exists());
    }

    #[test]
    fn test_temp_file_follows_wallet_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            wallet_file: "treasury.json".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            storage.temp_path(),
            temp_dir.path().join("treasury.json.tmp")
        );

        let (wallet, _) = sample_wallet();
        storage.save(&wallet).unwrap();
        assert!(temp_dir.path().join("treasury.json").exists());
        assert!(!storage.temp_path().exists());
    }

    #[test]
    fn test_load_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
    }
}
