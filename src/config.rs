//! Session configuration, persisted as TOML.
//!
//! The default location is `$XDG_CONFIG_HOME/prover-bridge/config.toml`
//! (falling back to `$HOME/.config`). Nothing reads it implicitly: pass a
//! loaded [`BridgeConfig`] to [`ProverBuilder::from_config`](crate::engine::ProverBuilder::from_config).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::EngineKind;
use crate::error::{ConfigError, ConfigResult};

/// Engine selection and invocation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Which engine dialect to speak.
    #[serde(default)]
    pub engine: EngineKind,
    /// Explicit engine program. Tried before searching `PATH`.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Command searched on `PATH` (default: `swipl` or `problog`).
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments used to probe the `PATH` command.
    #[serde(default = "default_probe_args")]
    pub probe_args: Vec<String>,
    /// Extra arguments placed before the script arguments.
    #[serde(default)]
    pub engine_args: Vec<String>,
    /// Directories prepended to `LD_LIBRARY_PATH` for the engine process.
    #[serde(default)]
    pub library_path: Vec<PathBuf>,
    /// Libraries loaded into every session. Unset means the engine default.
    #[serde(default)]
    pub libraries: Option<Vec<String>>,
    /// Output line prefixes treated as engine errors.
    #[serde(default)]
    pub error_prefixes: Option<Vec<String>>,
    /// Output line prefixes treated as engine warnings.
    #[serde(default)]
    pub warning_prefixes: Option<Vec<String>>,
    /// Environment variables set for the engine process. Kept last so it
    /// serializes as a trailing TOML table.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_probe_args() -> Vec<String> {
    vec!["--version".into()]
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            executable: None,
            command: None,
            probe_args: default_probe_args(),
            engine_args: Vec::new(),
            library_path: Vec::new(),
            libraries: None,
            error_prefixes: None,
            warning_prefixes: None,
            env: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    /// Default config for one engine.
    pub fn for_engine(engine: EngineKind) -> Self {
        Self {
            engine,
            ..Self::default()
        }
    }

    /// `$XDG_CONFIG_HOME/prover-bridge/config.toml`.
    pub fn default_path() -> ConfigResult<PathBuf> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| ConfigError::NoHome)?;
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join("prover-bridge");
        Ok(config_dir.join("config.toml"))
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from `path` if it exists, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: BridgeConfig = toml::from_str("engine = \"problog\"\n").unwrap();
        assert_eq!(config.engine, EngineKind::Problog);
        assert_eq!(config.probe_args, vec!["--version"]);
        assert!(config.libraries.is_none());
        assert!(config.executable.is_none());
    }

    #[test]
    fn empty_file_is_default() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.engine, EngineKind::Swi);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = BridgeConfig::for_engine(EngineKind::Swi);
        config.executable = Some(PathBuf::from("/opt/swipl/bin/swipl"));
        config.env.insert("SWI_HOME_DIR".into(), "/opt/swipl".into());
        config.library_path.push(PathBuf::from("/opt/swipl/lib"));
        config.libraries = Some(vec!["clpfd".into()]);
        config.save(&path).unwrap();

        let loaded = BridgeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = BridgeConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        let config = BridgeConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "engine = [").unwrap();
        assert!(matches!(
            BridgeConfig::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn unknown_engine_is_parse_error() {
        let result: Result<BridgeConfig, _> = toml::from_str("engine = \"datalog\"\n");
        assert!(result.is_err());
    }
}
