//! Field-level encryption for small configuration values.
//!
//! A single 32-byte master key lives in a file inside the workspace
//! directory. Values are sealed with AES-256-GCM under a fresh random nonce
//! and stored as printable `nonce:tag:ciphertext` base64 text, so they fit
//! in the same settings table as plaintext entries. Decryption fails closed:
//! a value that cannot be authenticated reads back as the empty string, the
//! same as a value that was never configured.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as B64_ENGINE;
use base64::Engine;

use crate::errors::HearthError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Holds the cipher derived from the persisted master key.
pub struct SecretStore {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore").finish_non_exhaustive()
    }
}

impl SecretStore {
    /// Load the master key from `key_path`, creating it on first run.
    ///
    /// Creation uses an exclusive-create open so two processes racing on an
    /// empty workspace cannot both write a key: the loser of the race reads
    /// the winner's file. A key file of any length other than 32 bytes is
    /// fatal and is never regenerated.
    pub fn open(key_path: &Path) -> Result<Self, HearthError> {
        if let Some(parent) = key_path.parent() {
            fs::create_dir_all(parent).map_err(|e| HearthError::KeyFileIo(e.kind().to_string()))?;
        }

        let key_bytes = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(key_path)
        {
            Ok(mut file) => {
                let key = Aes256Gcm::generate_key(OsRng);
                file.write_all(&key)
                    .and_then(|_| file.sync_all())
                    .map_err(|e| HearthError::KeyFileIo(e.kind().to_string()))?;
                key.to_vec()
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                fs::read(key_path).map_err(|e| HearthError::KeyFileIo(e.kind().to_string()))?
            }
            Err(err) => return Err(HearthError::KeyFileIo(err.kind().to_string())),
        };

        if key_bytes.len() != KEY_LEN {
            return Err(HearthError::KeyFileInvalid(key_bytes.len()));
        }

        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Seal a value as `nonce:tag:ciphertext` base64 text.
    ///
    /// The empty string passes through unencrypted so "cleared" and "never
    /// set" stay representable as empty settings rows.
    pub fn encrypt_field(&self, plain: &str) -> Result<String, HearthError> {
        if plain.is_empty() {
            return Ok(String::new());
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plain.as_bytes())
            .map_err(|_| HearthError::Crypto)?;

        // The AEAD output is ciphertext with the tag appended; the stored
        // format keeps the tag as its own segment.
        let split = sealed.len() - TAG_LEN;
        let (ciphertext, tag) = sealed.split_at(split);

        Ok(format!(
            "{}:{}:{}",
            B64_ENGINE.encode(nonce.as_slice()),
            B64_ENGINE.encode(tag),
            B64_ENGINE.encode(ciphertext)
        ))
    }

    /// Open a stored value, returning `""` for anything that does not
    /// authenticate. Callers cannot distinguish a corrupted value from an
    /// absent one; the event log carries that diagnostic instead.
    pub fn decrypt_field(&self, stored: &str) -> String {
        if stored.is_empty() {
            return String::new();
        }
        match self.try_decrypt(stored) {
            Some(plain) => plain,
            None => {
                log::warn!(target: "secrets", "stored secret failed authentication");
                String::new()
            }
        }
    }

    fn try_decrypt(&self, stored: &str) -> Option<String> {
        let mut segments = stored.split(':');
        let nonce_b64 = segments.next()?;
        let tag_b64 = segments.next()?;
        let ciphertext_b64 = segments.next()?;
        if segments.next().is_some() {
            return None;
        }

        let nonce_bytes = B64_ENGINE.decode(nonce_b64).ok()?;
        let tag = B64_ENGINE.decode(tag_b64).ok()?;
        let ciphertext = B64_ENGINE.decode(ciphertext_b64).ok()?;
        if nonce_bytes.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return None;
        }

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let nonce = Nonce::from_slice(&nonce_bytes);
        let plain = self.cipher.decrypt(nonce, sealed.as_slice()).ok()?;
        String::from_utf8(plain).ok()
    }
}
