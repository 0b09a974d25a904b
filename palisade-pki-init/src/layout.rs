//! Canonical on-disk layout of provisioned PKI material
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


use std::path::{Path, PathBuf};

/// Private key file name inside every service directory
pub const TLS_SECRET_FILE_NAME: &str = "server.key";
/// Service TLS certificate file name
pub const TLS_CERT_FILE_NAME: &str = "server.crt";
/// CA certificate file name, present in every service directory
pub const CA_CERT_FILE_NAME: &str = "ca.pem";

/// The fixed set of service identities this tool provisions for
///
/// Arbitrary services are not supported; the platform reads exactly these
/// three directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceIdentity {
    /// The root certificate authority
    Ca,
    /// The secrets store
    SecretsStore,
    /// The API gateway
    Gateway,
}

impl ServiceIdentity {
    pub const ALL: [ServiceIdentity; 3] = [
        ServiceIdentity::Ca,
        ServiceIdentity::SecretsStore,
        ServiceIdentity::Gateway,
    ];

    /// Directory name under a layout root
    pub fn dir_name(&self) -> &'static str {
        match self {
            ServiceIdentity::Ca => "ca",
            ServiceIdentity::SecretsStore => "secrets-store",
            ServiceIdentity::Gateway => "gateway",
        }
    }

    pub fn is_ca(&self) -> bool {
        matches!(self, ServiceIdentity::Ca)
    }
}

/// One service's on-disk material under a layout root
///
/// For the CA the service certificate is the CA certificate itself, so
/// `cert_path` is `None`.
#[derive(Debug, Clone)]
pub struct PkiBundle {
    pub service: ServiceIdentity,
    pub private_key_path: PathBuf,
    pub cert_path: Option<PathBuf>,
    pub ca_cert_path: PathBuf,
}

impl PkiBundle {
    /// Compute the bundle paths for `service` under `root`
    pub fn under(root: &Path, service: ServiceIdentity) -> Self {
        let service_dir = root.join(service.dir_name());
        let cert_path = if service.is_ca() {
            None
        } else {
            Some(service_dir.join(TLS_CERT_FILE_NAME))
        };

        Self {
            service,
            private_key_path: service_dir.join(TLS_SECRET_FILE_NAME),
            cert_path,
            ca_cert_path: service_dir.join(CA_CERT_FILE_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_dir_names() {
        assert_eq!(ServiceIdentity::Ca.dir_name(), "ca");
        assert_eq!(ServiceIdentity::SecretsStore.dir_name(), "secrets-store");
        assert_eq!(ServiceIdentity::Gateway.dir_name(), "gateway");
    }

    #[test]
    fn test_ca_bundle_has_no_service_cert() {
        let bundle = PkiBundle::under(Path::new("/run/pki"), ServiceIdentity::Ca);
        assert!(bundle.cert_path.is_none());
        assert_eq!(
            bundle.private_key_path,
            PathBuf::from("/run/pki/ca/server.key")
        );
        assert_eq!(bundle.ca_cert_path, PathBuf::from("/run/pki/ca/ca.pem"));
    }

    #[test]
    fn test_service_bundle_paths() {
        let bundle = PkiBundle::under(Path::new("/run/pki"), ServiceIdentity::Gateway);
        assert_eq!(
            bundle.cert_path.as_deref(),
            Some(Path::new("/run/pki/gateway/server.crt"))
        );
        assert_eq!(
            bundle.private_key_path,
            PathBuf::from("/run/pki/gateway/server.key")
        );
    }
}
