//! Secure Storage Module
//!
//! Durable key-value slots scoped to the local user. On Windows values are
//! encrypted with DPAPI before they touch the disk.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, error, debug};

#[cfg(windows)]
use windows::Win32::Security::Cryptography::{
    CryptProtectData, CryptUnprotectData, CRYPTPROTECT_UI_FORBIDDEN,
};
#[cfg(windows)]
use windows::Win32::Security::Cryptography::CRYPT_INTEGER_BLOB;

/// A durable string slot per key.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` when the slot is empty
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write (or overwrite) the value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the slot; deleting an empty slot is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed storage, one `<key>.dat` file per slot
pub struct SecureStorage {
    storage_path: PathBuf,
}

impl SecureStorage {
    /// Create a storage rooted at `storage_path`, creating the directory if needed
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        let storage_path = storage_path.into();

        if let Err(e) = std::fs::create_dir_all(&storage_path) {
            error!("Failed to create storage directory: {}", e);
        }

        debug!("Secure storage initialized at: {:?}", storage_path);

        Self { storage_path }
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.storage_path.join(format!("{}.dat", key))
    }

    #[cfg(windows)]
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        dpapi_transform(data, |input, output| unsafe {
            CryptProtectData(input, None, None, None, None, CRYPTPROTECT_UI_FORBIDDEN, output)
        })
        .ok_or_else(|| StorageError::Encryption("DPAPI refused to protect the slot".into()))
    }

    #[cfg(windows)]
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        // Fails for slots written by another Windows user or machine
        dpapi_transform(data, |input, output| unsafe {
            CryptUnprotectData(input, None, None, None, None, CRYPTPROTECT_UI_FORBIDDEN, output)
        })
        .ok_or_else(|| StorageError::Decryption("DPAPI refused to unprotect the slot".into()))
    }

    #[cfg(not(windows))]
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        // Plain files outside Windows; the slot is only as private as the data dir
        Ok(data.to_vec())
    }

    #[cfg(not(windows))]
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        Ok(data.to_vec())
    }
}

/// Run one DPAPI call over `data`, copying out and releasing the buffer it
/// allocates for the result
#[cfg(windows)]
fn dpapi_transform(
    data: &[u8],
    transform: impl FnOnce(&CRYPT_INTEGER_BLOB, &mut CRYPT_INTEGER_BLOB) -> windows::core::Result<()>,
) -> Option<Vec<u8>> {
    let input = CRYPT_INTEGER_BLOB {
        cbData: data.len() as u32,
        pbData: data.as_ptr() as *mut u8,
    };

    let mut output = CRYPT_INTEGER_BLOB {
        cbData: 0,
        pbData: std::ptr::null_mut(),
    };

    transform(&input, &mut output).ok()?;

    unsafe {
        let bytes = std::slice::from_raw_parts(output.pbData, output.cbData as usize).to_vec();

        windows::Win32::Foundation::LocalFree(
            windows::Win32::Foundation::HLOCAL(output.pbData as *mut std::ffi::c_void)
        );

        Some(bytes)
    }
}

impl KeyValueStore for SecureStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let file_path = self.slot_path(key);

        let encrypted = match std::fs::read(&file_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        let decrypted = self.decrypt(&encrypted)?;

        String::from_utf8(decrypted)
            .map(Some)
            .map_err(|e| StorageError::Decryption(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let encrypted = self.encrypt(value.as_bytes())?;

        std::fs::write(self.slot_path(key), encrypted)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        info!("Saved encrypted data for key: {}", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let file_path = self.slot_path(key);

        if file_path.exists() {
            std::fs::remove_file(&file_path)
                .map_err(|e| StorageError::Io(e.to_string()))?;
            info!("Deleted stored data for key: {}", key);
        }

        Ok(())
    }
}

/// Process-local storage, lost on exit
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Io("memory storage lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_storage_round_trips_a_slot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SecureStorage::new(dir.path());

        assert_eq!(storage.get("auth_token").unwrap(), None);

        storage.set("auth_token", "abc.def.ghi").unwrap();
        assert_eq!(storage.get("auth_token").unwrap().as_deref(), Some("abc.def.ghi"));
        assert!(dir.path().join("auth_token.dat").exists());

        storage.set("auth_token", "second").unwrap();
        assert_eq!(storage.get("auth_token").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn removing_missing_slot_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SecureStorage::new(dir.path().join("nested"));

        storage.remove("auth_token").unwrap();
        storage.set("auth_token", "x").unwrap();
        storage.remove("auth_token").unwrap();
        assert_eq!(storage.get("auth_token").unwrap(), None);
    }

    #[test]
    fn memory_storage_keeps_keys_apart() {
        let storage = MemoryStorage::new();
        storage.set("auth_token", "t").unwrap();
        storage.set("gustos", "paseos").unwrap();

        storage.remove("auth_token").unwrap();
        assert_eq!(storage.get("auth_token").unwrap(), None);
        assert_eq!(storage.get("gustos").unwrap().as_deref(), Some("paseos"));
    }
}
