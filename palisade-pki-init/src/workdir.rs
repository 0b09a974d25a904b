//! Scoped change of the process working directory
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


use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Changes the process working directory and restores the previous one
/// when dropped
///
/// The external generator resolves its output paths against the current
/// directory, so the pipeline parks itself in the scratch directory for
/// the duration of the generator calls. Later steps and later commands
/// depend on the original directory being intact, which is why restoration
/// happens in `Drop` rather than at an explicit call site.
#[derive(Debug)]
pub struct WorkdirGuard {
    original: PathBuf,
}

impl WorkdirGuard {
    /// Switch the process into `dir`
    pub fn change_to(dir: &Path) -> io::Result<Self> {
        let original = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        debug!(dir = %dir.display(), "changed working directory");
        Ok(Self { original })
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        if let Err(error) = std::env::set_current_dir(&self.original) {
            warn!(
                dir = %self.original.display(),
                error = %error,
                "failed to restore working directory"
            );
        }
    }
}
