//! CLI command implementations.

pub(crate) mod languages;
pub(crate) mod menu;
pub(crate) mod page;
pub(crate) mod placeholder;
pub(crate) mod plugins;
pub(crate) mod tree;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use cms_cache::MemoryCache;
use cms_config::{CliSettings, Config};
use cms_content::{ContentService, RenderMode, Viewer};
use cms_storage::JsonStore;

use crate::error::CliError;

pub(crate) use languages::LanguagesArgs;
pub(crate) use menu::MenuArgs;
pub(crate) use page::PageArgs;
pub(crate) use placeholder::PlaceholderArgs;
pub(crate) use plugins::PluginsArgs;
pub(crate) use tree::TreeArgs;

/// Options shared by every command.
#[derive(Args)]
pub(crate) struct ContextArgs {
    /// Path to configuration file (default: auto-discover cms.toml).
    #[arg(short, long, env = "CMS_CONFIG")]
    config: Option<PathBuf>,

    /// Content snapshot file (overrides config).
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Site to query.
    #[arg(long, default_value_t = 1)]
    pub site: u32,

    /// Maximum tree depth (overrides config).
    #[arg(long)]
    max_depth: Option<usize>,

    /// Disable the render cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output (timing logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ContextArgs {
    /// Load configuration with CLI overrides applied.
    pub(crate) fn load_config(&self) -> Result<Config, CliError> {
        let settings = CliSettings {
            data_file: self.data_file.clone(),
            cache_enabled: self.no_cache.then_some(false),
            max_depth: self.max_depth,
        };
        Ok(Config::load(self.config.as_deref(), Some(&settings))?)
    }

    /// Open the configured store and build a service over it.
    pub(crate) fn service(&self) -> Result<ContentService, CliError> {
        let config = self.load_config()?;
        let start = Instant::now();
        let store = JsonStore::open(&config.storage_resolved.data_file)?;
        tracing::info!(
            data_file = %config.storage_resolved.data_file.display(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Opened content store"
        );
        Ok(ContentService::new(Arc::new(store), &config).with_cache(&MemoryCache::new()))
    }
}

/// Identity the request is made as.
#[derive(Args)]
pub(crate) struct ViewerArgs {
    /// Authenticated user id (default: anonymous).
    #[arg(long)]
    user: Option<u64>,

    /// Treat the user as staff (allows preview).
    #[arg(long, requires = "user")]
    staff: bool,
}

impl ViewerArgs {
    pub(crate) fn viewer(&self) -> Viewer {
        Viewer {
            user_id: self.user,
            is_staff: self.staff,
        }
    }
}

pub(crate) fn render_mode(preview: bool) -> RenderMode {
    if preview {
        RenderMode::Preview
    } else {
        RenderMode::Published
    }
}
