use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const DEFAULT_CACHE_DIR: &str = "/var/cache/dnf";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub output_dir: PathBuf,
    /// Where rendered reports go. Defaults to `<output_dir>/html`.
    #[serde(default)]
    pub report_dir: Option<PathBuf>,
    /// Custom HTML template; the built-in one is used when unset.
    #[serde(default)]
    pub template_path: Option<PathBuf>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub include_packages: bool,
    pub include_updates: bool,
    pub include_orphans: bool,
    pub include_cache: bool,
    pub include_dependencies: bool,
    pub max_packages_sample: usize,
    pub cache_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            include_packages: true,
            include_updates: true,
            include_orphans: true,
            include_cache: true,
            include_dependencies: true,
            max_packages_sample: 100,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl AnalysisConfig {
    /// Every category switched off. Useful as a base for tests and for
    /// metadata-only snapshots.
    pub fn none() -> Self {
        AnalysisConfig {
            include_packages: false,
            include_updates: false,
            include_orphans: false,
            include_cache: false,
            include_dependencies: false,
            ..AnalysisConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub model: String,
    pub endpoint: String,
    /// Name of the environment variable holding the api key, never the key itself
    pub api_key_env: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: 0.7,
            top_p: 0.95,
            max_output_tokens: 8192,
            timeout_secs: 120,
        }
    }
}

impl Config {
    /// Defaults rooted at the given snapshot directory.
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Config {
            output_dir: output_dir.into(),
            report_dir: None,
            template_path: None,
            analysis: AnalysisConfig::default(),
            ai: AiConfig::default(),
        }
    }

    /// Load the config named on the command line, or the per-user default.
    ///
    /// An explicit path must exist. The default path is optional: when
    /// nothing is there the built-in defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let dirs = project_dirs()?;
                let path = dirs.config_dir().join("config.json");
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    info!(path = %path.display(), "no config file, using defaults");
                    Self::with_output_dir(dirs.data_dir().join("snapshots"))
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading config");
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::Config("output_dir must not be empty".into()));
        }
        if self.analysis.max_packages_sample == 0 {
            return Err(Error::Config("analysis.max_packages_sample must be at least 1".into()));
        }
        if self.analysis.include_cache && self.analysis.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("analysis.cache_dir must not be empty when include_cache is set".into()));
        }
        if self.ai.model.trim().is_empty() {
            return Err(Error::Config("ai.model must not be empty".into()));
        }
        if self.ai.api_key_env.trim().is_empty() {
            return Err(Error::Config("ai.api_key_env must name an environment variable".into()));
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(Error::Config(format!(
                "ai.temperature must be between 0 and 2, got {}",
                self.ai.temperature
            )));
        }
        Ok(())
    }

    pub fn report_dir(&self) -> PathBuf {
        self.report_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("html"))
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "pkgscope")
        .ok_or_else(|| Error::Config("could not determine the user config directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = Config::from_json(r#"{"output_dir": "/tmp/raw"}"#).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/raw"));
        assert!(config.analysis.include_updates);
        assert_eq!(config.analysis.max_packages_sample, 100);
        assert_eq!(config.ai.model, DEFAULT_MODEL);
        assert_eq!(config.report_dir(), PathBuf::from("/tmp/raw/html"));
        config.validate().unwrap();
    }

    #[test]
    fn partial_analysis_block_keeps_other_defaults() {
        let config = Config::from_json(
            r#"{"output_dir": "/tmp/raw", "analysis": {"include_orphans": false, "max_packages_sample": 2}}"#,
        )
        .unwrap();
        assert!(!config.analysis.include_orphans);
        assert!(config.analysis.include_cache);
        assert_eq!(config.analysis.max_packages_sample, 2);
    }

    #[test]
    fn zero_sample_is_rejected() {
        let mut config = Config::with_output_dir("/tmp/raw");
        config.analysis.max_packages_sample = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let mut config = Config::with_output_dir("/tmp/raw");
        config.ai.temperature = 3.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn missing_output_dir_is_a_parse_error() {
        assert!(Config::from_json(r#"{"analysis": {}}"#).is_err());
    }

    #[test]
    fn explicit_missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("nope.json")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn explicit_file_is_loaded_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"output_dir": "/tmp/raw", "analysis": {"max_packages_sample": 0}}"#).unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(Error::Config(_))));
    }
}
