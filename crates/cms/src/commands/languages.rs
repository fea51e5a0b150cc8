//! `cms languages` command implementation.

use clap::Args;

use super::ContextArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the languages command.
#[derive(Args)]
pub(crate) struct LanguagesArgs {
    #[command(flatten)]
    pub context: ContextArgs,
}

impl LanguagesArgs {
    /// Execute the languages command.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let service = self.context.service()?;
        output.json(&service.languages(self.context.site)?)
    }
}
