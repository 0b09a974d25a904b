//! Error types for PKI setup
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


use std::path::PathBuf;
use thiserror::Error;

/// PKI setup errors
#[derive(Error, Debug)]
pub enum PkiError {
    #[error("Missing required configuration: {0}")]
    ConfigMissing(String),

    #[error("CA private key unexpectedly present in cache: {0}")]
    CacheIntegrity(PathBuf),

    #[error("Cache at {0} is empty; nothing to import")]
    EmptyCache(PathBuf),

    #[error("Secure erase of {path} failed: {source}")]
    Erase {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Deploy to {dest} failed: {source}")]
    Deploy {
        dest: PathBuf,
        source: std::io::Error,
    },

    #[error("Certificate generation failed: {0}")]
    Generator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Descriptor error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for PKI setup operations
pub type PkiResult<T> = Result<T, PkiError>;
