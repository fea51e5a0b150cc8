//! `cms page` command implementation.

use clap::Args;

use super::{ContextArgs, ViewerArgs, render_mode};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the page command.
#[derive(Args)]
pub(crate) struct PageArgs {
    #[command(flatten)]
    pub context: ContextArgs,

    #[command(flatten)]
    viewer: ViewerArgs,

    /// Language code.
    #[arg(short, long)]
    language: String,

    /// Page path without language prefix (default: home page).
    #[arg(short, long, default_value = "")]
    path: String,

    /// Show every slot, including ones the template no longer declares.
    #[arg(long)]
    preview: bool,
}

impl PageArgs {
    /// Execute the page command.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let service = self.context.service()?;
        let page = service.page_detail(
            self.context.site,
            &self.language,
            self.path.trim_matches('/'),
            &self.viewer.viewer(),
            render_mode(self.preview),
        )?;
        output.json(&page)
    }
}
