//! `cms menu` command implementation.

use clap::Args;
use cms_content::MenuRequest;

use super::{ContextArgs, ViewerArgs};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the menu command.
#[derive(Args)]
pub(crate) struct MenuArgs {
    #[command(flatten)]
    pub context: ContextArgs,

    #[command(flatten)]
    viewer: ViewerArgs,

    /// Language code.
    #[arg(short, long)]
    language: String,

    /// Only show descendants of this page.
    #[arg(long)]
    root: Option<String>,

    /// First level to show.
    #[arg(long, default_value_t = 0)]
    from_level: usize,

    /// Last level to show.
    #[arg(long, default_value_t = 100)]
    to_level: usize,

    /// Levels shown below pages off the selected path.
    #[arg(long, default_value_t = 0)]
    extra_inactive: usize,

    /// Levels shown below the selected page.
    #[arg(long, default_value_t = 1000)]
    extra_active: usize,

    /// Path of the current page.
    #[arg(long)]
    selected: Option<String>,
}

impl MenuArgs {
    fn request(&self) -> MenuRequest {
        let trim = |path: &String| path.trim_matches('/').to_owned();
        MenuRequest {
            root_path: self.root.as_ref().map(trim),
            from_level: self.from_level,
            to_level: self.to_level,
            extra_inactive: self.extra_inactive,
            extra_active: self.extra_active,
            selected_path: self.selected.as_ref().map(trim),
        }
    }

    /// Execute the menu command.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let service = self.context.service()?;
        let menu = service.menu(
            self.context.site,
            &self.language,
            &self.viewer.viewer(),
            &self.request(),
        )?;
        output.json(&menu)
    }
}
