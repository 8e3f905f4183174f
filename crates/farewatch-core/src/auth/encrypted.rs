//! Passphrase-encrypted file store for targets without an OS keychain.
//!
//! The file is JSON with a random salt and one sealed entry per key. The
//! encryption key is derived from the passphrase with Argon2id; each value is
//! sealed with ChaCha20-Poly1305 under a fresh nonce, with the entry key as
//! associated data so sealed values cannot be swapped between keys.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::{SecureStore, StoreError};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultFile {
    salt: Vec<u8>,
    #[serde(default)]
    entries: BTreeMap<String, SealedValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SealedValue {
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
}

pub struct EncryptedFileStore {
    path: PathBuf,
    salt: Vec<u8>,
    cipher: ChaCha20Poly1305,
    /// Serializes read-modify-write cycles on the file
    write_lock: Mutex<()>,
}

impl EncryptedFileStore {
    /// Open (or create) the store at `path`, deriving the key from `passphrase`.
    ///
    /// A wrong passphrase is not detected here; reads of existing entries fail
    /// with `StoreError::Crypto` instead.
    pub fn open(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, StoreError> {
        let path = path.into();
        let salt = match Self::read_vault(&path)? {
            Some(vault) if vault.salt.len() == SALT_LEN => vault.salt,
            Some(_) => return Err(StoreError::Crypto("invalid salt in store file".to_string())),
            None => {
                let mut salt = vec![0u8; SALT_LEN];
                OsRng.fill_bytes(&mut salt);
                let vault = VaultFile {
                    salt: salt.clone(),
                    entries: BTreeMap::new(),
                };
                Self::write_vault(&path, &vault)?;
                debug!(path = %path.display(), "Created encrypted credential file");
                salt
            }
        };

        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), &salt, &mut key)
            .map_err(|e| StoreError::Crypto(e.to_string()))?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));

        Ok(Self {
            path,
            salt,
            cipher,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_vault(path: &Path) -> Result<Option<VaultFile>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn write_vault(path: &Path, vault: &VaultFile) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string(vault)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Current file contents, or an empty vault bound to our salt
    fn load_or_empty(&self) -> Result<VaultFile, StoreError> {
        Ok(Self::read_vault(&self.path)?.unwrap_or_else(|| VaultFile {
            salt: self.salt.clone(),
            entries: BTreeMap::new(),
        }))
    }

    fn seal(&self, key: &str, value: &str) -> Result<SealedValue, StoreError> {
        let mut nonce = vec![0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: value.as_bytes(),
                    aad: key.as_bytes(),
                },
            )
            .map_err(|e| StoreError::Crypto(e.to_string()))?;
        Ok(SealedValue { nonce, ciphertext })
    }

    fn open_sealed(&self, key: &str, sealed: &SealedValue) -> Result<String, StoreError> {
        if sealed.nonce.len() != NONCE_LEN {
            return Err(StoreError::Crypto(format!("invalid nonce for '{}'", key)));
        }
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(&sealed.nonce),
                Payload {
                    msg: &sealed.ciphertext,
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| StoreError::Crypto(format!("cannot decrypt '{}' (wrong passphrase?)", key)))?;
        String::from_utf8(plaintext).map_err(|e| StoreError::Crypto(e.to_string()))
    }
}

impl SecureStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(vault) = Self::read_vault(&self.path)? else {
            return Ok(None);
        };
        vault
            .entries
            .get(key)
            .map(|sealed| self.open_sealed(key, sealed))
            .transpose()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut vault = self.load_or_empty()?;
        vault.entries.insert(key.to_string(), self.seal(key, value)?);
        Self::write_vault(&self.path, &vault)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut vault = self.load_or_empty()?;
        if vault.entries.remove(key).is_some() {
            Self::write_vault(&self.path, &vault)?;
        }
        Ok(())
    }
}
