//! Configuration management for the Palisade PKI setup tool

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Subdirectory appended to the runtime dir (or /tmp) for scratch work
const PKI_BASE_DIR: &str = "palisade/pki-init";
const DEFAULT_WORK_BASE: &str = "/tmp";
const DEFAULT_CACHE_DIR: &str = "/etc/palisade/pki";
const DEFAULT_DEPLOY_DIR: &str = "/run/palisade/secrets";

/// PKI setup configuration
///
/// All directories are resolved once at startup and passed explicitly into
/// the components that use them.
#[derive(Debug, Clone, Deserialize)]
pub struct SetupConfig {
    /// Directory holding the X.509 descriptor files; required for the
    /// commands that generate material
    pub cert_config_dir: Option<PathBuf>,
    /// Base directory for the scratch and generated trees
    pub work_dir: PathBuf,
    /// Cache slot root
    pub cache_dir: PathBuf,
    /// Runtime secrets root read by platform services
    pub deploy_dir: PathBuf,
    pub log_level: Option<String>,
}

impl SetupConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let cert_config_dir = env::var("PALISADE_CERT_CONFIG_DIR")
            .ok()
            .map(PathBuf::from);

        let work_dir = resolve_work_dir(
            env::var("XDG_RUNTIME_DIR").ok(),
            env::var("PALISADE_PKI_WORK_DIR").ok(),
        );

        let cache_dir = match env::var("PALISADE_PKI_CACHE_DIR") {
            Ok(dir) => {
                check_dir_override("PALISADE_PKI_CACHE_DIR", &dir)?;
                PathBuf::from(dir)
            }
            Err(_) => PathBuf::from(DEFAULT_CACHE_DIR),
        };

        let deploy_dir = match env::var("PALISADE_PKI_DEPLOY_DIR") {
            Ok(dir) => {
                check_dir_override("PALISADE_PKI_DEPLOY_DIR", &dir)?;
                PathBuf::from(dir)
            }
            Err(_) => PathBuf::from(DEFAULT_DEPLOY_DIR),
        };

        let log_level = env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            cert_config_dir,
            work_dir,
            cache_dir,
            deploy_dir,
            log_level: Some(log_level),
        })
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

/// Resolve the scratch/generated base directory
///
/// Preference order follows the platform convention: a user runtime dir
/// when the session provides one, then an explicit override, then /tmp.
fn resolve_work_dir(xdg_runtime_dir: Option<String>, override_dir: Option<String>) -> PathBuf {
    if let Some(runtime_dir) = xdg_runtime_dir {
        return Path::new(&runtime_dir).join(PKI_BASE_DIR);
    }
    if let Some(dir) = override_dir {
        return PathBuf::from(dir);
    }
    Path::new(DEFAULT_WORK_BASE).join(PKI_BASE_DIR)
}

/// An overridden cache/deploy directory must already exist and be writable
fn check_dir_override(var: &str, dir: &str) -> Result<(), config::ConfigError> {
    let metadata = std::fs::metadata(dir).map_err(|_| {
        config::ConfigError::Message(format!("{}, {}, does not exist", var, dir))
    })?;

    if !metadata.is_dir() {
        return Err(config::ConfigError::Message(format!(
            "{}, {}, is not a directory",
            var, dir
        )));
    }

    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o200 == 0 {
        return Err(config::ConfigError::Message(format!(
            "{}, {}, is not writable",
            var, dir
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_dir_prefers_runtime_dir() {
        let dir = resolve_work_dir(
            Some("/run/user/1000".to_string()),
            Some("/var/lib/override".to_string()),
        );
        assert_eq!(dir, PathBuf::from("/run/user/1000/palisade/pki-init"));
    }

    #[test]
    fn test_work_dir_override() {
        let dir = resolve_work_dir(None, Some("/var/lib/override".to_string()));
        assert_eq!(dir, PathBuf::from("/var/lib/override"));
    }

    #[test]
    fn test_work_dir_default() {
        let dir = resolve_work_dir(None, None);
        assert_eq!(dir, PathBuf::from("/tmp/palisade/pki-init"));
    }

    #[test]
    fn test_dir_override_must_exist() {
        let result = check_dir_override("PALISADE_PKI_CACHE_DIR", "/no/such/dir");
        assert!(result.is_err());
    }

    #[test]
    fn test_dir_override_accepts_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_dir_override("PALISADE_PKI_CACHE_DIR", dir.path().to_str().unwrap());
        assert!(result.is_ok());
    }
}
