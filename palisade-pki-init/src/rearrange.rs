//! Rearrangement of generator output into the canonical per-service tree
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
use crate::layout::{PkiBundle, ServiceIdentity};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Copy generator-native output into the canonical layout under
/// `generated_root`
///
/// Every service directory receives the CA certificate under its
/// canonical name; the CA directory receives the CA private key as its
/// secret; the other services receive their own key and certificate.
/// Private keys are left read-only to the owner.
pub async fn rearrange_by_service(
    generated_root: &Path,
    scratch_dir: &Path,
    store_descriptor: &X509Descriptor,
    gateway_descriptor: &X509Descriptor,
) -> PkiResult<()> {
    fsutil::create_dir_if_not_exists(generated_root).await?;

    let store_output = resolve_output_dir(scratch_dir, store_descriptor);
    let gateway_output = resolve_output_dir(scratch_dir, gateway_descriptor);

    debug!(root = %generated_root.display(), "rearranging generated PKI by service");

    // the CA bundle comes from the secrets-store descriptor's generation
    copy_generated_for_service(
        generated_root,
        ServiceIdentity::Ca,
        &store_output,
        store_descriptor,
    )
    .await?;
    copy_generated_for_service(
        generated_root,
        ServiceIdentity::SecretsStore,
        &store_output,
        store_descriptor,
    )
    .await?;
    copy_generated_for_service(
        generated_root,
        ServiceIdentity::Gateway,
        &gateway_output,
        gateway_descriptor,
    )
    .await?;

    Ok(())
}

/// Generator output lands beneath the scratch directory unless the
/// descriptor names an absolute output root
fn resolve_output_dir(scratch_dir: &Path, descriptor: &X509Descriptor) -> PathBuf {
    let output_dir = descriptor.pki_output_dir();
    if output_dir.is_absolute() {
        output_dir
    } else {
        scratch_dir.join(output_dir)
    }
}

async fn copy_generated_for_service(
    generated_root: &Path,
    service: ServiceIdentity,
    output_dir: &Path,
    descriptor: &X509Descriptor,
) -> PkiResult<()> {
    let service_dir = generated_root.join(service.dir_name());
    fsutil::create_dir_if_not_exists(&service_dir).await?;

    let bundle = PkiBundle::under(generated_root, service);

    copy_artifact(
        &output_dir.join(descriptor.ca_cert_file_name()),
        &bundle.ca_cert_path,
    )
    .await?;

    if service.is_ca() {
        copy_artifact(
            &output_dir.join(descriptor.ca_key_file_name()),
            &bundle.private_key_path,
        )
        .await?;
    } else {
        copy_artifact(
            &output_dir.join(descriptor.tls_key_file_name()),
            &bundle.private_key_path,
        )
        .await?;
        if let Some(cert_path) = &bundle.cert_path {
            copy_artifact(&output_dir.join(descriptor.tls_cert_file_name()), cert_path).await?;
        }
    }

    // read-only to the owner
    fs::set_permissions(
        &bundle.private_key_path,
        std::fs::Permissions::from_mode(0o400),
    )
    .await?;

    Ok(())
}

/// Copy one generated artifact, failing with a configuration error when
/// the configured source file was never produced
async fn copy_artifact(src: &Path, dest: &Path) -> PkiResult<u64> {
    if !fsutil::file_exists(src).await {
        return Err(PkiError::ConfigMissing(format!(
            "generated artifact does not exist: {}",
            src.display()
        )));
    }
    Ok(fsutil::copy_file(src, dest).await?)
}
