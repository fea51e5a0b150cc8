//! `cms placeholder` command implementation.

use clap::Args;
use cms_content::ResolveOptions;
use cms_storage::AreaKey;

use super::{ContextArgs, ViewerArgs, render_mode};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the placeholder command.
#[derive(Args)]
pub(crate) struct PlaceholderArgs {
    #[command(flatten)]
    pub context: ContextArgs,

    #[command(flatten)]
    viewer: ViewerArgs,

    /// Language code.
    #[arg(short, long)]
    language: String,

    /// Content type id of the owning object.
    #[arg(long)]
    content_type: u32,

    /// Id of the owning object.
    #[arg(long)]
    object: u64,

    /// Slot name.
    #[arg(long)]
    slot: String,

    /// Render work-in-progress slots (staff only).
    #[arg(long)]
    preview: bool,

    /// Fall back to other languages when this one has no content.
    #[arg(long)]
    fallback: bool,

    /// Return placeholder metadata without rendering content.
    #[arg(long)]
    no_content: bool,
}

impl PlaceholderArgs {
    /// Execute the placeholder command.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let service = self.context.service()?;
        let area = AreaKey::new(self.content_type, self.object, self.slot);
        let viewer = self.viewer.viewer();
        let mode = render_mode(self.preview);
        let options = ResolveOptions {
            bypass_cache: false,
            render_content: !self.no_content,
        };

        let view = if self.fallback {
            service.resolve_placeholder_with_fallback(
                self.context.site,
                &area,
                &self.language,
                &viewer,
                mode,
                options,
            )?
        } else {
            service.resolve_placeholder(
                self.context.site,
                &area,
                &self.language,
                &viewer,
                mode,
                options,
            )?
        };

        if view.language != self.language {
            output.note(&format!("Content served in fallback language {}", view.language));
        }
        output.json(&view)
    }
}
