//! Plex Assets Exporter.
//!
//! Exports the artwork (posters, backgrounds, banners, season posters) and
//! theme music Plex has cached for a library next to the media files, so other
//! tools and media servers can pick them up.
//!
//! Code layout:
//! - `base_system`: config, logging, destination paths
//! - `download`: export pipeline (selection, catalog, decision, main flow)
//! - `network_parser`: Plex API client and asset downloads
//! - `ui`: prompts and terminal output

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use crossterm::style::Stylize;
use tracing::{error, info};

mod base_system;
mod download;
mod network_parser;
mod ui;

use base_system::config::load_or_create;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use download::models::AssetRequest;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "plex-assets-exporter", version)]
#[command(about = "Export Plex artwork and theme music next to your media files")]
struct Cli {
    /// The Plex server URL.
    #[arg(long)]
    serverurl: Option<String>,

    /// The Plex authentication token / X-Plex-Token.
    #[arg(long)]
    token: Option<String>,

    /// The Plex library name.
    #[arg(long)]
    library: Option<String>,

    /// Which assets should be exported?
    #[arg(long, value_enum)]
    assets: AssetRequest,

    /// Export posters with overlay from Plex Meta Manager?
    #[arg(long, default_value_t = false, overrides_with = "no_overlays")]
    overlays: bool,

    /// Skip overlayed items even if config.yml includes them.
    #[arg(long, default_value_t = false, overrides_with = "overlays")]
    no_overlays: bool,

    /// Overwrite existing assets?
    #[arg(long, default_value_t = false, overrides_with = "no_overwrite")]
    overwrite: bool,

    /// Keep existing assets even if config.yml says to overwrite.
    #[arg(long, default_value_t = false, overrides_with = "overwrite")]
    no_overwrite: bool,

    /// Show extra information?
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// Start exporting without asking for confirmation.
    #[arg(long, short = 'y', default_value_t = false)]
    yes: bool,

    /// Number of items exported in parallel (overrides config.yml).
    #[arg(long)]
    workers: Option<usize>,

    /// Mirror debug logs to stderr.
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Directory holding config.yml and logs/.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl Cli {
    /// Command-line values win over config.yml; absent switches keep it.
    fn apply_to(&self, config: &mut Config) {
        if let Some(url) = &self.serverurl {
            config.server_url = url.clone();
        }
        if let Some(token) = &self.token {
            config.token = token.clone();
        }
        if let Some(library) = &self.library {
            config.library = library.clone();
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(overwrite) = switch(self.overwrite, self.no_overwrite) {
            config.overwrite = overwrite;
        }
        if let Some(overlays) = switch(self.overlays, self.no_overlays) {
            config.include_overlays = overlays;
        }
    }
}

/// `--x` / `--no-x` pair; the later one on the command line wins.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.as_deref();
    let mut config =
        load_or_create::<Config>(data_dir).map_err(|e| anyhow!("config.yml: {e}"))?;
    cli.apply_to(&mut config);

    let log = init_logging(cli.debug, config.save_log, data_dir)?;
    info!(target: "startup", "Plex Assets Exporter v{}", VERSION);

    let session = ui::noui::SessionOptions {
        assets: cli.assets,
        verbose: cli.verbose,
        assume_yes: cli.yes,
    };

    if let Err(err) = ui::noui::run(&config, session) {
        error!(target: "startup", "{err:#}");
        eprintln!("{} {err:#}", "ERROR:".red());
        log.safe_exit();
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(
    debug: bool,
    save_log: bool,
    base_dir: Option<&std::path::Path>,
) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: true,
        console: debug,
        file: save_log,
    };
    LogSystem::init_with_base(opts, base_dir).map_err(|e| anyhow!(e))
}
