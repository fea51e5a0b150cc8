//! `cms plugins` command implementation.

use clap::Args;

use super::ContextArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the plugins command.
#[derive(Args)]
pub(crate) struct PluginsArgs {
    #[command(flatten)]
    pub context: ContextArgs,
}

impl PluginsArgs {
    /// Execute the plugins command.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let service = self.context.service()?;
        output.json(&service.plugin_definitions())
    }
}
