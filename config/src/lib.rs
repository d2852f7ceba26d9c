//! Configuration loading for delve.
//!
//! Settings live in `~/.delve/config.toml`. Every section and key is optional; anything
//! left out keeps the built-in default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use delve_tools::SearchSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelveConfig {
    pub search: Option<SearchConfig>,
    pub glob: Option<GlobConfig>,
    pub fuzzy: Option<FuzzyConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Path to a bundled ripgrep binary, or the directory holding it.
    pub binary: Option<String>,
    /// Extra install directories searched before the defaults.
    #[serde(default)]
    pub package_dirs: Vec<String>,
    pub max_results: Option<usize>,
    pub max_output_chars: Option<usize>,
    pub max_line_length: Option<usize>,
    /// Wall-clock limit per search; 0 disables it.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobConfig {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FuzzyConfig {
    pub limit: Option<usize>,
}

/// Substitute `${VAR}` in a configured path. Unset variables expand to nothing; text after an
/// unterminated `${` is left as written.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(open) = rest.find("${") {
        let Some(len) = rest[open + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = &rest[open + 2..open + 2 + len];
        if let Some(val) = (!name.is_empty()).then(|| env::var_os(name)).flatten() {
            out.push_str(&val.to_string_lossy());
        }
        rest = &rest[open + 3 + len..];
    }
    out.push_str(rest);
    out
}

impl DelveConfig {
    /// Load the default config file. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        Self::parse(&content).map_err(|err| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, err);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            }
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Merge onto the defaults. `DELVE_RG_PATH` wins over `search.binary`.
    #[must_use]
    pub fn to_settings(&self) -> SearchSettings {
        let mut settings = SearchSettings::default();

        if let Some(search) = &self.search {
            let bundled = search
                .binary
                .as_deref()
                .map(expand_env_vars)
                .filter(|b| !b.trim().is_empty())
                .map(PathBuf::from);
            let extra = search
                .package_dirs
                .iter()
                .map(|d| expand_env_vars(d))
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
                .collect::<Vec<_>>();
            settings.locator = settings
                .locator
                .with_bundled(bundled)
                .with_extra_package_dirs(extra);

            if let Some(n) = search.max_results {
                settings.content.max_results = n;
            }
            if let Some(n) = search.max_output_chars {
                settings.content.max_output_chars = n;
            }
            if let Some(n) = search.max_line_length {
                settings.content.max_line_length = n;
            }
            if let Some(ms) = search.timeout_ms {
                let timeout = (ms > 0).then(|| Duration::from_millis(ms));
                settings = settings.with_timeout(timeout);
            }
        }
        if let Some(limit) = self.glob.as_ref().and_then(|g| g.limit) {
            settings.glob.limit = limit;
        }
        if let Some(limit) = self.fuzzy.as_ref().and_then(|f| f.limit) {
            settings.fuzzy.limit = limit;
        }

        settings.locator = settings.locator.with_env_override();
        settings
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".delve").join("config.toml"))
}
