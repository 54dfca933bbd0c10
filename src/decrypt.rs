//! Store decryption collaborator.
//!
//! Actual cipher work is out of scope for this crate: real decryptors are
//! external implementations of [`Decryptor`]. The shipped
//! [`PlainStoreDecryptor`] handles the already-decrypted case by unpacking
//! the store layout into the working directory, which is all the rest of
//! the pipeline needs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{AnalysisError, Result};
use crate::probe::StoreVariant;

/// Credentials resolved from configuration or environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub key: Option<String>,
}

#[async_trait]
pub trait Decryptor: Send + Sync {
    /// Whether this decryptor needs a key at all. The orchestrator refuses
    /// to run a key-requiring decryptor without resolved credentials.
    fn requires_key(&self) -> bool {
        true
    }

    /// Produce a readable store directory under `dest_dir` from the
    /// application's source directory.
    async fn decrypt(
        &self,
        creds: &Credentials,
        source_dir: &Path,
        dest_dir: &Path,
    ) -> Result<PathBuf>;
}

/// Unpacks an already-decrypted store: finds the variant layout under the
/// source directory and copies its `.db` files into `dest_dir`.
pub struct PlainStoreDecryptor;

#[async_trait]
impl Decryptor for PlainStoreDecryptor {
    fn requires_key(&self) -> bool {
        false
    }

    async fn decrypt(
        &self,
        _creds: &Credentials,
        source_dir: &Path,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let store_src = [StoreVariant::V3, StoreVariant::V4]
            .iter()
            .filter_map(|v| v.store_subdir())
            .map(|sub| source_dir.join(sub))
            .find(|p| p.is_dir())
            .ok_or_else(|| {
                AnalysisError::DecryptionFailed(format!(
                    "no store layout (Msg or db_storage) under {}",
                    source_dir.display()
                ))
            })?;

        std::fs::create_dir_all(dest_dir)?;

        let mut db_files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(&store_src) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) == Some("db") {
                db_files.push(entry.path().to_path_buf());
            }
        }
        // Deterministic ordering, mostly for stable logs.
        db_files.sort();

        if db_files.is_empty() {
            return Err(AnalysisError::DecryptionFailed(format!(
                "no database files found under {}",
                store_src.display()
            )));
        }

        for path in &db_files {
            let name = path
                .file_name()
                .ok_or_else(|| AnalysisError::DecryptionFailed("unnamed db file".to_string()))?;
            std::fs::copy(path, dest_dir.join(name))?;
        }

        debug!(
            "unpacked {} database file(s) into {}",
            db_files.len(),
            dest_dir.display()
        );
        Ok(dest_dir.to_path_buf())
    }
}
