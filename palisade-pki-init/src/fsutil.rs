//! Filesystem primitives shared by the PKI lifecycle steps
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
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Copy a single regular file, replacing the destination if present
///
/// The destination is removed first so that read-only key files can be
/// overwritten, and the source file mode is carried over to the copy.
pub async fn copy_file(src: &Path, dest: &Path) -> io::Result<u64> {
    let src_metadata = fs::metadata(src).await?;

    // only regular files are copied
    if !src_metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("[{}] is not a regular file to be copied", src.display()),
        ));
    }

    if fs::metadata(dest).await.is_ok() {
        fs::remove_file(dest).await?;
    }

    let bytes_written = fs::copy(src, dest).await?;
    fs::set_permissions(dest, src_metadata.permissions()).await?;
    Ok(bytes_written)
}

/// Recursively copy a directory tree
///
/// One-directional: entries already present beneath `dest` but absent from
/// `src` are left alone. File modes are preserved by `copy_file`.
pub async fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    let mut pending = vec![(src.to_path_buf(), dest.to_path_buf())];

    while let Some((src_dir, dest_dir)) = pending.pop() {
        fs::create_dir_all(&dest_dir).await?;

        let mut entries = fs::read_dir(&src_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let src_path = entry.path();
            let dest_path = dest_dir.join(entry.file_name());

            if entry.file_type().await?.is_dir() {
                pending.push((src_path, dest_path));
            } else {
                debug!(
                    src = %src_path.display(),
                    dest = %dest_path.display(),
                    "copying file"
                );
                copy_file(&src_path, &dest_path).await?;
            }
        }
    }

    Ok(())
}

pub async fn create_dir_if_not_exists(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir).await
}

/// Whether a directory holds no entries at all
pub async fn is_dir_empty(dir: &Path) -> io::Result<bool> {
    let mut entries = fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}

/// Whether `path` names an existing regular file
pub async fn file_exists(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(metadata) => metadata.is_file(),
        Err(_) => false,
    }
}

/// Fail with a configuration error unless `path` names an existing file
pub async fn require_file(path: &Path) -> PkiResult<()> {
    if file_exists(path).await {
        Ok(())
    } else {
        Err(PkiError::ConfigMissing(format!(
            "file does not exist: {}",
            path.display()
        )))
    }
}

/// A directory tree removed on drop
///
/// Holds the scratch and generated trees so they are cleaned up on every
/// exit path, success or error.
#[derive(Debug)]
pub struct EphemeralTree {
    root: PathBuf,
}

impl EphemeralTree {
    /// Create `root` (and any missing parents) and take ownership of it
    ///
    /// A leftover tree from a crashed earlier run is removed first, so the
    /// new tree always starts out empty.
    pub async fn create(root: &Path) -> io::Result<Self> {
        if fs::metadata(root).await.is_ok() {
            fs::remove_dir_all(root).await?;
        }
        fs::create_dir_all(root).await?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

impl Drop for EphemeralTree {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_dir_all(&self.root) {
            debug!(
                path = %self.root.display(),
                error = %error,
                "failed to remove ephemeral tree"
            );
        }
    }
}
