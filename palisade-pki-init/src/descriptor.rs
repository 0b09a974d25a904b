//! X.509 descriptor files
//!
//! A descriptor is a small JSON document declaring where the certificate
//! generator writes its output and how the generated artifacts are named.
//! The rest of the tool only depends on the file names and the output
//! directory exposed here.
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
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Root CA naming and subject parameters
#[derive(Debug, Clone, Deserialize)]
pub struct CaParameters {
    pub ca_name: String,
    pub ca_country: String,
    pub ca_state: String,
    pub ca_locality: String,
    pub ca_organization: String,
}

/// Service TLS certificate parameters
#[derive(Debug, Clone, Deserialize)]
pub struct TlsParameters {
    pub tls_host: String,
    pub tls_domain: String,
    pub tls_organization: String,
}

/// One descriptor file's contents
#[derive(Debug, Clone, Deserialize)]
pub struct X509Descriptor {
    /// Generator output root; relative paths resolve against the
    /// generator's working directory
    pub working_dir: PathBuf,
    pub pki_ca: CaParameters,
    pub x509_tls_parameters: TlsParameters,
}

impl X509Descriptor {
    /// Read and parse a descriptor file
    ///
    /// A missing file is a configuration error naming the path, so the
    /// operator can tell which descriptor of the pair was not provisioned.
    pub async fn load(path: &Path) -> PkiResult<Self> {
        fsutil::require_file(path).await?;
        let content = fs::read_to_string(path).await?;
        let descriptor: X509Descriptor = serde_json::from_str(&content)?;
        Ok(descriptor)
    }

    /// Directory the generator writes into, beneath `working_dir`
    pub fn pki_output_dir(&self) -> PathBuf {
        self.working_dir.join(&self.pki_ca.ca_name)
    }

    pub fn ca_cert_file_name(&self) -> String {
        format!("{}.pem", self.pki_ca.ca_name)
    }

    pub fn ca_key_file_name(&self) -> String {
        format!("{}.priv.key", self.pki_ca.ca_name)
    }

    /// Fully qualified host name the TLS certificate is issued for
    pub fn tls_fqdn(&self) -> String {
        format!(
            "{}.{}",
            self.x509_tls_parameters.tls_host, self.x509_tls_parameters.tls_domain
        )
    }

    pub fn tls_cert_file_name(&self) -> String {
        format!("{}.pem", self.tls_fqdn())
    }

    pub fn tls_key_file_name(&self) -> String {
        format!("{}.priv.key", self.tls_fqdn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PkiError;

    fn sample_json() -> String {
        serde_json::json!({
            "working_dir": "pki-out",
            "pki_ca": {
                "ca_name": "PalisadeCA",
                "ca_country": "US",
                "ca_state": "CA",
                "ca_locality": "San Francisco",
                "ca_organization": "Palisade"
            },
            "x509_tls_parameters": {
                "tls_host": "gateway",
                "tls_domain": "palisade.local",
                "tls_organization": "Palisade"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_load_and_derive_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkisetup-gateway.json");
        tokio::fs::write(&path, sample_json()).await.unwrap();

        let descriptor = X509Descriptor::load(&path).await.unwrap();
        assert_eq!(descriptor.pki_output_dir(), PathBuf::from("pki-out/PalisadeCA"));
        assert_eq!(descriptor.ca_cert_file_name(), "PalisadeCA.pem");
        assert_eq!(descriptor.ca_key_file_name(), "PalisadeCA.priv.key");
        assert_eq!(descriptor.tls_cert_file_name(), "gateway.palisade.local.pem");
        assert_eq!(descriptor.tls_key_file_name(), "gateway.palisade.local.priv.key");
    }

    #[tokio::test]
    async fn test_load_missing_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkisetup-gateway.json");

        let err = X509Descriptor::load(&path).await.unwrap_err();
        match err {
            PkiError::ConfigMissing(message) => {
                assert!(message.contains("pkisetup-gateway.json"));
            }
            other => panic!("expected ConfigMissing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkisetup-gateway.json");
        tokio::fs::write(&path, "{\"working_dir\":").await.unwrap();

        let err = X509Descriptor::load(&path).await.unwrap_err();
        assert!(matches!(err, PkiError::Serialization(_)));
    }
}
