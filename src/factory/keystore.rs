//! Encryption key storage
//!
//! Keys are opaque byte strings addressed by name. Persisting them safely
//! is the key store's job; this crate only asks for get and set.

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

/// Storage for store encryption keys
pub trait KeyStore: Send + Sync {
    /// Key stored under `name`, `Ok(None)` if there is none
    ///
    /// An error means the key store could not be read. The store is then
    /// left unopened rather than given a fresh key.
    fn get(&self, name: &str) -> io::Result<Option<Vec<u8>>>;

    /// Store `key` under `name`, replacing any previous value
    fn set(&self, name: &str, key: &[u8]) -> io::Result<()>;
}

/// Process-local key store
///
/// Keys are lost when the process exits, so on-disk stores keyed from it
/// cannot be reopened by a later process.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    /// Create an empty key store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        Ok(keys.get(name).cloned())
    }

    fn set(&self, name: &str, key: &[u8]) -> io::Result<()> {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.insert(name.to_string(), key.to_vec());
        Ok(())
    }
}

/// Key store backed by the platform keychain
///
/// Uses the macOS Keychain, the Windows Credential Manager or the Linux
/// kernel keyring. Each key is one entry under `service`, with the key
/// name as the entry's user.
#[cfg(feature = "keyring")]
#[derive(Debug, Clone)]
pub struct KeyringKeyStore {
    service: String,
}

#[cfg(feature = "keyring")]
impl KeyringKeyStore {
    /// Key store keeping its entries under `service`
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    /// Keychain service the entries live under
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Remove the entry for `name`, if any
    pub fn remove(&self, name: &str) -> io::Result<()> {
        match self.entry(name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error("delete", name, e)),
        }
    }

    fn entry(&self, name: &str) -> io::Result<keyring::Entry> {
        keyring::Entry::new(&self.service, name).map_err(|e| keyring_error("open", name, e))
    }
}

#[cfg(feature = "keyring")]
impl KeyStore for KeyringKeyStore {
    fn get(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match self.entry(name)?.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error("read", name, e)),
        }
    }

    fn set(&self, name: &str, key: &[u8]) -> io::Result<()> {
        self.entry(name)?
            .set_secret(key)
            .map_err(|e| keyring_error("store", name, e))
    }
}

#[cfg(feature = "keyring")]
fn keyring_error(action: &str, name: &str, err: keyring::Error) -> io::Error {
    io::Error::other(format!("Failed to {} keyring entry {}: {}", action, name, err))
}
