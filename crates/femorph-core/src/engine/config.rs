use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MCS_TIMEOUT_S: f64 = 60.0;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

fn default_mcs_timeout() -> f64 {
    DEFAULT_MCS_TIMEOUT_S
}

/// Configuration of one morph construction run.
///
/// `workspace_root` is the project directory below which the per-ligand
/// inputs (`ligands/<name>/`) and the per-morph workspaces
/// (`morphs/<method>/<pair>/`) live. `method` is the free energy method
/// tag; it is resolved against the topology registry when a
/// [`crate::workflows::morph::Morph`] is constructed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MorphConfig {
    pub workspace_root: PathBuf,
    pub method: String,
    #[serde(default = "default_mcs_timeout")]
    pub mcs_timeout_s: f64,
}

impl MorphConfig {
    /// Loads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// The MCS search budget as a duration.
    pub fn mcs_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.mcs_timeout_s.max(0.0))
    }
}

#[derive(Default)]
pub struct MorphConfigBuilder {
    workspace_root: Option<PathBuf>,
    method: Option<String>,
    mcs_timeout_s: Option<f64>,
}

impl MorphConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workspace_root(mut self, path: PathBuf) -> Self {
        self.workspace_root = Some(path);
        self
    }

    pub fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn mcs_timeout_s(mut self, seconds: f64) -> Self {
        self.mcs_timeout_s = Some(seconds);
        self
    }

    pub fn build(self) -> Result<MorphConfig, ConfigError> {
        Ok(MorphConfig {
            workspace_root: self
                .workspace_root
                .ok_or(ConfigError::MissingParameter("workspace_root"))?,
            method: self.method.ok_or(ConfigError::MissingParameter("method"))?,
            mcs_timeout_s: self.mcs_timeout_s.unwrap_or(DEFAULT_MCS_TIMEOUT_S),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn builder_fills_defaults() {
        let config = MorphConfigBuilder::new()
            .workspace_root(PathBuf::from("/tmp/fep"))
            .method("pertfile")
            .build()
            .unwrap();
        assert_eq!(config.mcs_timeout_s, DEFAULT_MCS_TIMEOUT_S);
        assert_eq!(config.mcs_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn builder_rejects_missing_parameters() {
        let result = MorphConfigBuilder::new().method("pertfile").build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::MissingParameter("workspace_root")
        );

        let result = MorphConfigBuilder::new()
            .workspace_root(PathBuf::from("/tmp/fep"))
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::MissingParameter("method"));
    }

    #[test]
    fn load_parses_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            b"workspace_root = \"/tmp/fep\"\nmethod = \"sander/softcore\"\nmcs_timeout_s = 5.0\n",
        )
        .unwrap();

        let config = MorphConfig::load(file.path()).unwrap();
        assert_eq!(config.workspace_root, PathBuf::from("/tmp/fep"));
        assert_eq!(config.method, "sander/softcore");
        assert_eq!(config.mcs_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"workspace_root = \"/tmp\"\nmethod = \"pertfile\"\nbogus = 1\n")
            .unwrap();
        assert!(matches!(
            MorphConfig::load(file.path()),
            Err(ConfigLoadError::Toml { .. })
        ));
    }

    #[test]
    fn negative_timeout_clamps_to_zero() {
        let config = MorphConfigBuilder::new()
            .workspace_root(PathBuf::from("/tmp"))
            .method("pertfile")
            .mcs_timeout_s(-3.0)
            .build()
            .unwrap();
        assert_eq!(config.mcs_timeout(), Duration::ZERO);
    }
}
