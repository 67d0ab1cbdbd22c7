use std::path::PathBuf;

use crate::prelude::*;
use clap::Parser;

mod config;
mod error;
mod inspect;
mod lines;
mod output;
mod prelude;
mod split;

#[cfg(test)]
mod fixtures;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Split a co-parenting message-thread PDF export into one file per message"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// TOML file with header, noise, attachment and output settings
    #[clap(long, env = "THREADSPLIT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "THREADSPLIT_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Split exports into one file per message
    Split(crate::split::SplitOptions),

    /// Show the records an export would produce without writing them
    Inspect(crate::inspect::InspectOptions),

    /// Dump extracted text lines with page and position
    Lines(crate::lines::LinesOptions),

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Split(options) => crate::split::run(options, app.global).await,
        SubCommands::Inspect(options) => crate::inspect::run(options, app.global).await,
        SubCommands::Lines(options) => crate::lines::run(options, app.global).await,
        SubCommands::Config => crate::config::run(app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
