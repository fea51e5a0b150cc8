//! Configuration management for the CMS content API.
//!
//! Parses `cms.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `storage.data_file`
//! - `sites.domain`

mod expand;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override content snapshot file.
    pub data_file: Option<PathBuf>,
    /// Override render cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override maximum tree depth.
    pub max_depth: Option<usize>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "cms.toml";

/// Upper bound accepted for `tree.max_depth`.
const MAX_TREE_DEPTH: usize = 10_000;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Render cache configuration.
    pub cache: CacheConfig,
    /// Tree assembly configuration.
    pub tree: TreeConfig,
    /// Storage configuration (paths are relative strings from TOML).
    storage: StorageConfigRaw,
    /// Configured sites with their languages.
    pub sites: Vec<SiteConfig>,

    /// Resolved storage configuration (set after loading).
    #[serde(skip)]
    pub storage_resolved: StorageConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Render cache configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether rendered placeholder content is memoized.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Sibling ordering applied when assembling trees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeOrder {
    /// Keep the order returned by storage.
    Source,
    /// Order by menu position.
    #[default]
    Position,
    /// Order by creation timestamp.
    Created,
}

/// Tree assembly configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Maximum depth before a tree is considered malformed.
    pub max_depth: usize,
    /// Sibling ordering.
    pub order: TreeOrder,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            order: TreeOrder::default(),
        }
    }
}

/// Raw storage configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StorageConfigRaw {
    data_file: Option<String>,
}

/// Resolved storage configuration with absolute paths.
#[derive(Debug, Default)]
pub struct StorageConfig {
    /// JSON content snapshot read by the file-backed store.
    pub data_file: PathBuf,
}

/// A tenant and its language configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct SiteConfig {
    /// Site identifier.
    pub id: u32,
    /// Public domain used for absolute links.
    pub domain: String,
    /// URL scheme used for absolute links.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Languages configured for this site, in display order.
    #[serde(default)]
    pub languages: Vec<LanguageEntry>,
}

fn default_scheme() -> String {
    "https".to_owned()
}

/// A single configured language.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LanguageEntry {
    /// Language code (e.g., "en", "de").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Whether the language is visible on public endpoints.
    #[serde(default = "default_true")]
    pub public: bool,
    /// Ordered fallback language codes.
    #[serde(default)]
    pub fallbacks: Vec<String>,
    /// Hide content that is not translated instead of falling back.
    #[serde(default = "default_true")]
    pub hide_untranslated: bool,
    /// Redirect to the fallback language URL instead of serving it in place.
    #[serde(default = "default_true")]
    pub redirect_on_fallback: bool,
}

fn default_true() -> bool {
    true
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`sites.domain`").
        field: String,
        /// Error message (e.g., "${`SITE_DOMAIN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `cms.toml` in current directory and parents.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Parse configuration from a TOML string, resolving paths against `base`.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Look up a site by id.
    #[must_use]
    pub fn site(&self, id: u32) -> Option<&SiteConfig> {
        self.sites.iter().find(|site| site.id == id)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(data_file) = &settings.data_file {
            self.storage_resolved.data_file.clone_from(data_file);
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.cache.enabled = cache_enabled;
        }
        if let Some(max_depth) = settings.max_depth {
            self.tree.max_depth = max_depth;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            cache: CacheConfig::default(),
            tree: TreeConfig::default(),
            storage: StorageConfigRaw::default(),
            sites: Vec::new(),
            storage_resolved: StorageConfig {
                data_file: base.join("content.json"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_tree()?;
        self.validate_sites()?;
        Ok(())
    }

    fn validate_tree(&self) -> Result<(), ConfigError> {
        if self.tree.max_depth == 0 {
            return Err(ConfigError::Validation(
                "tree.max_depth must be greater than 0".to_owned(),
            ));
        }
        if self.tree.max_depth > MAX_TREE_DEPTH {
            return Err(ConfigError::Validation(format!(
                "tree.max_depth cannot exceed {MAX_TREE_DEPTH}"
            )));
        }
        Ok(())
    }

    fn validate_sites(&self) -> Result<(), ConfigError> {
        let mut site_ids = HashSet::new();
        for site in &self.sites {
            if !site_ids.insert(site.id) {
                return Err(ConfigError::Validation(format!(
                    "duplicate site id {}",
                    site.id
                )));
            }
            require_non_empty(&site.domain, "sites.domain")?;
            if site.scheme != "http" && site.scheme != "https" {
                return Err(ConfigError::Validation(format!(
                    "sites.scheme must be http or https (site {})",
                    site.id
                )));
            }

            let mut codes = HashSet::new();
            for language in &site.languages {
                require_non_empty(&language.code, "sites.languages.code")?;
                if !codes.insert(language.code.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "duplicate language code '{}' in site {}",
                        language.code, site.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref data_file) = self.storage.data_file {
            self.storage.data_file = Some(expand::expand_env(data_file, "storage.data_file")?);
        }
        for site in &mut self.sites {
            site.domain = expand::expand_env(&site.domain, "sites.domain")?;
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.storage_resolved = StorageConfig {
            data_file: config_dir.join(self.storage.data_file.as_deref().unwrap_or("content.json")),
        };
    }
}
