use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vouch_attest::AttestConfig;

use crate::error::{RootError, RootResult};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "vouch=info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// Top-level configuration for the vouch binary.
///
/// Loaded from a TOML file (typically `~/.vouch/config.toml`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConfig {
    /// Directory for vouch state. `prove` writes proofs under `proofs/`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub attest: AttestConfig,

    #[serde(default)]
    pub log: LogConfig,
}

fn default_data_dir() -> PathBuf {
    dirs_or_default(".vouch")
}

/// Returns `$HOME/<suffix>` if HOME is available, otherwise `./<suffix>`.
fn dirs_or_default(suffix: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(suffix))
        .unwrap_or_else(|_| PathBuf::from(suffix))
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            attest: AttestConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl RootConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> RootResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: RootConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> RootResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RootError::Config(format!("TOML serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> RootResult<()> {
        self.attest
            .validate()
            .map_err(|e| RootError::Config(e.to_string()))?;
        if self.log.filter.trim().is_empty() {
            return Err(RootError::Config("log.filter must not be empty".into()));
        }
        Ok(())
    }

    /// Default output for a proof over `record`:
    /// `<data_dir>/proofs/<record stem>.proof.json`.
    pub fn proof_path_for(&self, record: &Path) -> PathBuf {
        let stem = record
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "record".to_string());
        self.data_dir
            .join("proofs")
            .join(format!("{}.proof.json", stem))
    }

    pub fn default_config_path() -> PathBuf {
        dirs_or_default(".vouch/config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RootConfig::default();
        assert!(config.data_dir.to_string_lossy().contains(".vouch"));
        assert_eq!(config.attest.publish_timeout_ms, 30_000);
        assert_eq!(config.log.filter, "vouch=info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
data_dir = "/tmp/vouch-test"

[attest]
publish_timeout_ms = 5000

[attest.schemas]
forecast = "0xschema-forecast"
reputation = "0xschema-reputation"

[log]
filter = "vouch=debug"
"#;
        let config: RootConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/vouch-test"));
        assert_eq!(config.attest.publish_timeout_ms, 5000);
        assert_eq!(
            config.attest.schema_for("reputation").unwrap().as_str(),
            "0xschema-reputation"
        );
        assert_eq!(config.log.filter, "vouch=debug");
    }

    #[test]
    fn test_config_validate_zero_timeout() {
        let mut config = RootConfig::default();
        config.attest.publish_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(RootError::Config(_))));
    }

    #[test]
    fn test_proof_path_under_data_dir() {
        let config = RootConfig {
            data_dir: PathBuf::from("/var/vouch"),
            ..RootConfig::default()
        };
        assert_eq!(
            config.proof_path_for(Path::new("/home/alice/forecast.json")),
            PathBuf::from("/var/vouch/proofs/forecast.proof.json")
        );
        assert_eq!(
            config.proof_path_for(Path::new("/")),
            PathBuf::from("/var/vouch/proofs/record.proof.json")
        );
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = RootConfig::load(Path::new("/nonexistent/vouch.toml")).unwrap();
        assert_eq!(config, RootConfig::default());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = std::env::temp_dir().join(format!("vouch-test-config-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("config.toml");

        let mut config = RootConfig {
            data_dir: dir.clone(),
            ..RootConfig::default()
        };
        config.attest = config.attest.with_schema("forecast", "0xabc");
        config.save(&path).unwrap();

        let loaded = RootConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
