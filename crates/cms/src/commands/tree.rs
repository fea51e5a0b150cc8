//! `cms tree` command implementation.

use clap::Args;

use super::{ContextArgs, ViewerArgs};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the tree command.
#[derive(Args)]
pub(crate) struct TreeArgs {
    #[command(flatten)]
    pub context: ContextArgs,

    #[command(flatten)]
    viewer: ViewerArgs,

    /// Language code.
    #[arg(short, long)]
    language: String,
}

impl TreeArgs {
    /// Execute the tree command.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let service = self.context.service()?;
        let tree = service.build_tree(self.context.site, &self.language, &self.viewer.viewer())?;
        output.json(&tree)
    }
}
