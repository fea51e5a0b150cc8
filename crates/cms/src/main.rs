//! CMS CLI - query the content API from the command line.
//!
//! Provides commands for:
//! - `languages`: List the languages of a site
//! - `tree`: Print the page tree
//! - `placeholder`: Render a placeholder
//! - `page`: Print a page with its placeholder references
//! - `menu`: Print a navigation menu
//! - `plugins`: List registered content unit kinds
//!
//! Every command prints JSON to stdout.

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{LanguagesArgs, MenuArgs, PageArgs, PlaceholderArgs, PluginsArgs, TreeArgs};
use output::Output;

/// CMS - read-only content API.
#[derive(Parser)]
#[command(name = "cms", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured languages of a site.
    Languages(LanguagesArgs),
    /// Print the page tree visible to a viewer.
    Tree(TreeArgs),
    /// Render the content of a placeholder.
    Placeholder(PlaceholderArgs),
    /// Print a page with its placeholder references.
    Page(PageArgs),
    /// Print a navigation menu.
    Menu(MenuArgs),
    /// List registered content unit kinds.
    Plugins(PluginsArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Languages(args) => args.context.verbose,
            Self::Tree(args) => args.context.verbose,
            Self::Placeholder(args) => args.context.verbose,
            Self::Page(args) => args.context.verbose,
            Self::Menu(args) => args.context.verbose,
            Self::Plugins(args) => args.context.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Languages(args) => args.execute(&output),
        Commands::Tree(args) => args.execute(&output),
        Commands::Placeholder(args) => args.execute(&output),
        Commands::Page(args) => args.execute(&output),
        Commands::Menu(args) => args.execute(&output),
        Commands::Plugins(args) => args.execute(&output),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbose_flag_per_command() {
        let cli = Cli::try_parse_from(["cms", "tree", "--language", "de", "--verbose"]).unwrap();
        assert!(cli.command.verbose());

        let cli = Cli::try_parse_from(["cms", "plugins"]).unwrap();
        assert!(!cli.command.verbose());
    }
}
