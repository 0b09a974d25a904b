//! TLS asset generation
//!
//! This module provides a trait-based interface for the certificate
//! generator so the lifecycle pipeline stays independent of how the
//! X.509 material is actually produced:
//! - Built-in rcgen-backed generation (current implementation)
//! - An external generator binary
//! - An organization-level CA issuing service
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


use crate::descriptor::X509Descriptor;
use crate::error::{PkiError, PkiResult};
use crate::fsutil;
use async_trait::async_trait;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    SanType,
};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Trait for certificate generator backends
///
/// `generate` runs against one descriptor file and writes its output
/// beneath the descriptor's output directory, resolved against the
/// current working directory. Callers that need the output somewhere
/// specific park the process there first (see `WorkdirGuard`).
#[async_trait]
pub trait CertificateGenerator: Send + Sync {
    /// Generate TLS assets for the named descriptor
    async fn generate(&self, descriptor_path: &Path) -> PkiResult<()>;
}

/// Built-in generator producing a root CA and one service certificate
/// per descriptor
///
/// When the CA certificate and key named by the descriptor already exist
/// in the output directory, they are loaded and reused, so the second
/// descriptor of a run issues its service certificate from the same root.
pub struct RcgenGenerator;

#[async_trait]
impl CertificateGenerator for RcgenGenerator {
    async fn generate(&self, descriptor_path: &Path) -> PkiResult<()> {
        let descriptor = X509Descriptor::load(descriptor_path).await?;

        let output_dir = descriptor.pki_output_dir();
        fsutil::create_dir_if_not_exists(&output_dir).await?;

        let ca = obtain_ca(&descriptor, &output_dir).await?;
        issue_service_cert(&descriptor, &output_dir, &ca).await?;

        info!(
            descriptor = %descriptor_path.display(),
            output_dir = %output_dir.display(),
            "TLS assets generated"
        );
        Ok(())
    }
}

/// Load the root CA from the output directory, or mint a fresh one
async fn obtain_ca(descriptor: &X509Descriptor, output_dir: &Path) -> PkiResult<Certificate> {
    let ca_cert_path = output_dir.join(descriptor.ca_cert_file_name());
    let ca_key_path = output_dir.join(descriptor.ca_key_file_name());

    if fsutil::file_exists(&ca_cert_path).await && fsutil::file_exists(&ca_key_path).await {
        debug!(ca_cert = %ca_cert_path.display(), "reusing existing root CA");
        return load_ca(&ca_cert_path, &ca_key_path).await;
    }

    let ca_params = descriptor.pki_ca.clone();
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, ca_params.ca_name.clone());
    dn.push(DnType::CountryName, ca_params.ca_country);
    dn.push(DnType::StateOrProvinceName, ca_params.ca_state);
    dn.push(DnType::LocalityName, ca_params.ca_locality);
    dn.push(DnType::OrganizationName, ca_params.ca_organization);
    params.distinguished_name = dn;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

    let ca = Certificate::from_params(params)
        .map_err(|e| PkiError::Generator(format!("root CA generation failed: {}", e)))?;

    let cert_pem = ca
        .serialize_pem()
        .map_err(|e| PkiError::Generator(format!("root CA serialization failed: {}", e)))?;
    write_pem(&ca_cert_path, &cert_pem, 0o644).await?;
    write_pem(&ca_key_path, &ca.serialize_private_key_pem(), 0o600).await?;

    info!(ca_name = %ca_params.ca_name, "new root CA created");
    Ok(ca)
}

async fn load_ca(ca_cert_path: &Path, ca_key_path: &Path) -> PkiResult<Certificate> {
    let cert_pem = fs::read_to_string(ca_cert_path).await?;
    let key_pem = fs::read_to_string(ca_key_path).await?;

    let key_pair = KeyPair::from_pem(&key_pem)
        .map_err(|e| PkiError::Generator(format!("cannot parse root CA key: {}", e)))?;
    let params = CertificateParams::from_ca_cert_pem(&cert_pem, key_pair)
        .map_err(|e| PkiError::Generator(format!("cannot parse root CA certificate: {}", e)))?;
    Certificate::from_params(params)
        .map_err(|e| PkiError::Generator(format!("cannot rebuild root CA: {}", e)))
}

async fn issue_service_cert(
    descriptor: &X509Descriptor,
    output_dir: &Path,
    ca: &Certificate,
) -> PkiResult<()> {
    let tls_params = &descriptor.x509_tls_parameters;
    let fqdn = descriptor.tls_fqdn();

    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, fqdn.clone());
    dn.push(DnType::OrganizationName, tls_params.tls_organization.clone());
    params.distinguished_name = dn;
    params.subject_alt_names = vec![
        SanType::DnsName(fqdn.clone()),
        SanType::DnsName(tls_params.tls_host.clone()),
    ];

    let cert = Certificate::from_params(params)
        .map_err(|e| PkiError::Generator(format!("TLS keypair generation failed: {}", e)))?;
    let cert_pem = cert
        .serialize_pem_with_signer(ca)
        .map_err(|e| PkiError::Generator(format!("TLS certificate signing failed: {}", e)))?;

    let cert_path = output_dir.join(descriptor.tls_cert_file_name());
    let key_path = output_dir.join(descriptor.tls_key_file_name());
    write_pem(&cert_path, &cert_pem, 0o644).await?;
    write_pem(&key_path, &cert.serialize_private_key_pem(), 0o600).await?;

    debug!(fqdn = %fqdn, "service certificate issued");
    Ok(())
}

async fn write_pem(path: &Path, pem: &str, mode: u32) -> PkiResult<()> {
    fs::write(path, pem).await?;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn descriptor_json(output_root: &Path, host: &str) -> String {
        serde_json::json!({
            "working_dir": output_root,
            "pki_ca": {
                "ca_name": "PalisadeCA",
                "ca_country": "US",
                "ca_state": "CA",
                "ca_locality": "San Francisco",
                "ca_organization": "Palisade"
            },
            "x509_tls_parameters": {
                "tls_host": host,
                "tls_domain": "palisade.local",
                "tls_organization": "Palisade"
            }
        })
        .to_string()
    }

    async fn write_descriptor(dir: &Path, name: &str, output_root: &Path, host: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, descriptor_json(output_root, host))
            .await
            .unwrap();
        path
    }

    #[tokio::test]
    async fn test_generates_ca_and_service_assets() {
        let dir = tempfile::tempdir().unwrap();
        let output_root = dir.path().join("out");
        let descriptor = write_descriptor(
            dir.path(),
            "pkisetup-secrets-store.json",
            &output_root,
            "secrets-store",
        )
        .await;

        RcgenGenerator.generate(&descriptor).await.unwrap();

        let pki_dir = output_root.join("PalisadeCA");
        for name in [
            "PalisadeCA.pem",
            "PalisadeCA.priv.key",
            "secrets-store.palisade.local.pem",
            "secrets-store.palisade.local.priv.key",
        ] {
            assert!(
                fsutil::file_exists(&pki_dir.join(name)).await,
                "missing generated file {name}"
            );
        }
    }

    #[tokio::test]
    async fn test_second_descriptor_reuses_root_ca() {
        let dir = tempfile::tempdir().unwrap();
        let output_root = dir.path().join("out");
        let store = write_descriptor(
            dir.path(),
            "pkisetup-secrets-store.json",
            &output_root,
            "secrets-store",
        )
        .await;
        let gateway =
            write_descriptor(dir.path(), "pkisetup-gateway.json", &output_root, "gateway").await;

        RcgenGenerator.generate(&store).await.unwrap();
        let pki_dir = output_root.join("PalisadeCA");
        let ca_before = fs::read(pki_dir.join("PalisadeCA.pem")).await.unwrap();

        RcgenGenerator.generate(&gateway).await.unwrap();
        let ca_after = fs::read(pki_dir.join("PalisadeCA.pem")).await.unwrap();

        assert_eq!(ca_before, ca_after, "root CA must not be regenerated");
        assert!(fsutil::file_exists(&pki_dir.join("gateway.palisade.local.pem")).await);
    }

    #[tokio::test]
    async fn test_missing_descriptor_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("pkisetup-secrets-store.json");

        let err = RcgenGenerator.generate(&missing).await.unwrap_err();
        assert!(matches!(err, PkiError::ConfigMissing(_)));
    }
}
