//! Deployment into the runtime secrets directory
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


use crate::error::{PkiError, PkiResult};
use crate::fsutil;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Written into every deployed service directory once its files are in
/// place; platform services wait for it before reading their material
pub const DEPLOY_SENTINEL_FILE_NAME: &str = ".pki-deploy.complete";

/// Mirror `source` into `dest` and mark the deployment complete
///
/// One-directional: files present in `dest` but absent from `source` are
/// not removed. No atomic rename is performed, so a crash mid-copy can
/// leave `dest` partially updated.
pub async fn deploy(source: &Path, dest: &Path) -> PkiResult<()> {
    fsutil::copy_tree(source, dest)
        .await
        .map_err(|source_err| PkiError::Deploy {
            dest: dest.to_path_buf(),
            source: source_err,
        })?;

    mark_complete(dest).await.map_err(|source_err| PkiError::Deploy {
        dest: dest.to_path_buf(),
        source: source_err,
    })?;

    info!(dest = %dest.display(), "deployed");
    Ok(())
}

/// Write a sentinel file into every directory of the deployed tree that
/// holds at least one file
async fn mark_complete(root: &Path) -> io::Result<()> {
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut holds_files = false;
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                pending.push(entry.path());
            } else {
                holds_files = true;
            }
        }

        if holds_files {
            let sentinel = dir.join(DEPLOY_SENTINEL_FILE_NAME);
            if !fsutil::file_exists(&sentinel).await {
                write_sentinel(&sentinel).await?;
            }
        }
    }

    Ok(())
}

async fn write_sentinel(path: &Path) -> io::Result<()> {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    fs::write(path, timestamp).await?;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o400)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deploy_mirrors_tree_and_marks_complete() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cache");
        let dest = dir.path().join("secrets");
        fs::create_dir_all(source.join("gateway")).await.unwrap();
        fs::write(source.join("gateway/server.crt"), "cert")
            .await
            .unwrap();
        fs::write(source.join("gateway/server.key"), "key")
            .await
            .unwrap();
        fs::set_permissions(
            source.join("gateway/server.key"),
            std::fs::Permissions::from_mode(0o400),
        )
        .await
        .unwrap();

        deploy(&source, &dest).await.unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("gateway/server.crt"))
                .await
                .unwrap(),
            "cert"
        );

        let key_mode = fs::metadata(dest.join("gateway/server.key"))
            .await
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(key_mode & 0o777, 0o400);

        let sentinel = dest.join("gateway").join(DEPLOY_SENTINEL_FILE_NAME);
        let content = fs::read_to_string(&sentinel).await.unwrap();
        assert!(content.parse::<i64>().is_ok(), "sentinel holds a timestamp");

        // the source tree is never marked
        assert!(!fsutil::file_exists(&source.join("gateway").join(DEPLOY_SENTINEL_FILE_NAME)).await);
    }

    #[tokio::test]
    async fn test_deploy_keeps_stale_destination_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cache");
        let dest = dir.path().join("secrets");
        fs::create_dir_all(&source).await.unwrap();
        fs::create_dir_all(&dest).await.unwrap();
        fs::write(source.join("fresh.pem"), "fresh").await.unwrap();
        fs::write(dest.join("stale.pem"), "stale").await.unwrap();

        deploy(&source, &dest).await.unwrap();

        assert!(fsutil::file_exists(&dest.join("fresh.pem")).await);
        assert!(fsutil::file_exists(&dest.join("stale.pem")).await);
    }

    #[tokio::test]
    async fn test_deploy_missing_source_is_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("secrets");

        let err = deploy(&dir.path().join("no-such"), &dest).await.unwrap_err();
        assert!(matches!(err, PkiError::Deploy { .. }));
    }
}
