//! The PKI lifecycle commands
//!
//! Four commands cover the lifecycle: `generate` always mints fresh
//! material and deploys it; `cache` populates the cache slot exactly once
//! and deploys from it; `import` deploys a cache that was populated
//! out-of-band; `legacy` runs the raw generator for callers that predate
//! the lifecycle. Observed state is read from the filesystem alone.
//! Concurrent invocations against the same cache or deploy directory are
//! unsupported; nothing locks them.
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


use crate::cache::CacheSlot;
use crate::deploy;
use crate::descriptor::X509Descriptor;
use crate::error::{PkiError, PkiResult};
use crate::fsutil::{self, EphemeralTree};
use crate::generator::CertificateGenerator;
use crate::layout::{PkiBundle, ServiceIdentity};
use crate::shred;
use crate::workdir::WorkdirGuard;
use palisade_config::SetupConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Descriptor covering the root CA and the secrets store
pub const SECRETS_STORE_DESCRIPTOR: &str = "pkisetup-secrets-store.json";
/// Descriptor covering the API gateway
pub const GATEWAY_DESCRIPTOR: &str = "pkisetup-gateway.json";

const GENERATED_DIR: &str = "generated";
const SCRATCH_DIR: &str = "scratch";

/// The PKI lifecycle controller
///
/// All directories come from the configuration value handed in at
/// construction; there is no global state beyond the filesystem itself.
pub struct PkiInit {
    config: SetupConfig,
    generator: Arc<dyn CertificateGenerator>,
}

impl PkiInit {
    pub fn new(config: SetupConfig, generator: Arc<dyn CertificateGenerator>) -> Self {
        Self { config, generator }
    }

    /// Mint a fresh PKI and deploy it directly
    ///
    /// Every run produces fresh keypairs, so previously deployed trust
    /// material stops validating. The CA private key is destroyed before
    /// anything leaves the generated tree.
    pub async fn generate(&self) -> PkiResult<()> {
        let generated = self.generate_pki().await?;

        self.shred_ca_key(generated.path()).await?;
        deploy::deploy(generated.path(), &self.config.deploy_dir).await?;

        info!("PKI generation completes");
        Ok(())
    }

    /// Populate the cache on first run, then deploy from it
    ///
    /// A non-empty cache is reused without regeneration. A non-empty
    /// cache holding a CA private key was tampered with or corrupted and
    /// must not be trusted, so nothing is deployed from it.
    pub async fn cache(&self) -> PkiResult<()> {
        let slot = CacheSlot::new(&self.config.cache_dir);

        if slot.is_empty().await? {
            let generated = self.generate_pki().await?;
            self.shred_ca_key(generated.path()).await?;
            slot.populate_from(generated.path()).await?;
        } else if slot.has_ca_private_key().await {
            return Err(PkiError::CacheIntegrity(slot.ca_key_path()));
        } else {
            info!(cache = %slot.root().display(), "cache already populated, reusing");
        }

        deploy::deploy(slot.root(), &self.config.deploy_dir).await?;

        info!("PKI cache completes");
        Ok(())
    }

    /// Deploy a cache that was populated out-of-band
    ///
    /// Never generates and never shreds; an empty cache means there is
    /// nothing to import.
    pub async fn import(&self) -> PkiResult<()> {
        let slot = CacheSlot::new(&self.config.cache_dir);

        if slot.is_empty().await? {
            return Err(PkiError::EmptyCache(slot.root().to_path_buf()));
        }

        deploy::deploy(slot.root(), &self.config.deploy_dir).await?;

        info!("PKI import completes");
        Ok(())
    }

    /// Run the raw generator against one caller-supplied descriptor
    ///
    /// Backward-compatible invocation style: no cache, no shredding, no
    /// deployment, and the working directory is left alone.
    pub async fn legacy(&self, descriptor_path: &Path) -> PkiResult<()> {
        self.generator.generate(descriptor_path).await?;

        info!("legacy generation completes");
        Ok(())
    }

    /// Produce a canonical generated tree beneath the work directory
    ///
    /// The returned guard removes the tree when dropped, so it never
    /// outlives the command that produced it. The scratch tree lives only
    /// for the duration of this call.
    async fn generate_pki(&self) -> PkiResult<EphemeralTree> {
        let cert_config_dir = self.cert_config_dir()?;

        let store_descriptor_path = cert_config_dir.join(SECRETS_STORE_DESCRIPTOR);
        let gateway_descriptor_path = cert_config_dir.join(GATEWAY_DESCRIPTOR);
        fsutil::require_file(&store_descriptor_path).await?;
        fsutil::require_file(&gateway_descriptor_path).await?;

        // the working directory changes below, so the work dir must not
        // stay relative
        let work_dir = std::path::absolute(&self.config.work_dir)?;
        let scratch = EphemeralTree::create(&work_dir.join(SCRATCH_DIR)).await?;
        let generated = EphemeralTree::create(&work_dir.join(GENERATED_DIR)).await?;

        debug!(
            store_descriptor = %store_descriptor_path.display(),
            gateway_descriptor = %gateway_descriptor_path.display(),
            scratch = %scratch.path().display(),
            "generating TLS assets"
        );

        {
            // generate inside the scratch directory; the guard restores
            // the original working directory on every exit path
            let _workdir = WorkdirGuard::change_to(scratch.path())?;
            self.generator.generate(&store_descriptor_path).await?;
            self.generator.generate(&gateway_descriptor_path).await?;
        }

        let store_descriptor = X509Descriptor::load(&store_descriptor_path).await?;
        let gateway_descriptor = X509Descriptor::load(&gateway_descriptor_path).await?;
        crate::rearrange::rearrange_by_service(
            generated.path(),
            scratch.path(),
            &store_descriptor,
            &gateway_descriptor,
        )
        .await?;

        Ok(generated)
    }

    async fn shred_ca_key(&self, generated_root: &Path) -> PkiResult<()> {
        let ca_key = PkiBundle::under(generated_root, ServiceIdentity::Ca).private_key_path;
        shred::secure_erase(&ca_key).await
    }

    fn cert_config_dir(&self) -> PkiResult<PathBuf> {
        let dir = self.config.cert_config_dir.as_ref().ok_or_else(|| {
            PkiError::ConfigMissing(
                "certificate descriptor directory is not configured \
                 (set PALISADE_CERT_CONFIG_DIR)"
                    .to_string(),
            )
        })?;
        Ok(std::path::absolute(dir)?)
    }
}
