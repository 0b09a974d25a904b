//! The single-slot PKI cache
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::error::PkiResult;
use crate::fsutil;
use crate::layout::{PkiBundle, ServiceIdentity};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory-backed holder of one generation's worth of PKI bundles
///
/// The slot is populated at most once by this tool, and a correctly
/// populated slot never contains the CA private key. Nothing guards the
/// directory against other processes; at most one instance of this tool
/// is assumed to act on a given slot at a time.
#[derive(Debug, Clone)]
pub struct CacheSlot {
    root: PathBuf,
}

impl CacheSlot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the slot has ever been populated
    ///
    /// A missing directory observes as empty; it is created by the first
    /// populate.
    pub async fn is_empty(&self) -> PkiResult<bool> {
        match fsutil::is_dir_empty(&self.root).await {
            Ok(empty) => Ok(empty),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(error) => Err(error.into()),
        }
    }

    /// Where the CA private key would live if the slot were corrupted
    pub fn ca_key_path(&self) -> PathBuf {
        PkiBundle::under(&self.root, ServiceIdentity::Ca).private_key_path
    }

    /// Structural integrity probe: a populated slot must not hold the CA
    /// private key
    pub async fn has_ca_private_key(&self) -> bool {
        fsutil::file_exists(&self.ca_key_path()).await
    }

    /// Copy a generated tree into the slot
    pub async fn populate_from(&self, source: &Path) -> PkiResult<()> {
        debug!(
            source = %source.display(),
            cache = %self.root.display(),
            "populating cache"
        );
        fsutil::create_dir_if_not_exists(&self.root).await?;
        fsutil::copy_tree(source, &self.root).await?;
        info!(cache = %self.root.display(), "cache populated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TLS_SECRET_FILE_NAME;
    use tokio::fs;

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let slot = CacheSlot::new(dir.path().join("pki"));
        assert!(slot.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_populate_fills_slot() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("generated");
        fs::create_dir_all(source.join("gateway")).await.unwrap();
        fs::write(source.join("gateway").join("server.crt"), "cert")
            .await
            .unwrap();

        let slot = CacheSlot::new(dir.path().join("pki"));
        slot.populate_from(&source).await.unwrap();

        assert!(!slot.is_empty().await.unwrap());
        assert!(!slot.has_ca_private_key().await);
        assert_eq!(
            fs::read_to_string(slot.root().join("gateway/server.crt"))
                .await
                .unwrap(),
            "cert"
        );
    }

    #[tokio::test]
    async fn test_detects_planted_ca_key() {
        let dir = tempfile::tempdir().unwrap();
        let slot = CacheSlot::new(dir.path().join("pki"));
        let ca_dir = slot.root().join("ca");
        fs::create_dir_all(&ca_dir).await.unwrap();
        fs::write(ca_dir.join(TLS_SECRET_FILE_NAME), "leaked key")
            .await
            .unwrap();

        assert!(!slot.is_empty().await.unwrap());
        assert!(slot.has_ca_private_key().await);
        assert_eq!(slot.ca_key_path(), slot.root().join("ca/server.key"));
    }
}
