use anyhow::{Context, Result};
use crossterm::style::Stylize;
use tracing::info;

use super::{confirm, pick_section, prompt_required};
use crate::base_system::context::Config;
use crate::download::downloader::AssetExporter;
use crate::download::models::{AssetRequest, ExportEvent, ExportOptions};
use crate::download::plan::{self, SectionChoice};
use crate::download::progress::ProgressReporter;
use crate::download::traits::LocalFs;
use crate::network_parser::plex::{PlexConfig, PlexServer};

/// Per-invocation switches that are not persisted in `config.yml`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionOptions {
    pub assets: AssetRequest,
    pub verbose: bool,
    pub assume_yes: bool,
}

pub(crate) fn run(config: &Config, session: SessionOptions) -> Result<()> {
    let verbose = session.verbose;

    let base_url = match config.server_url() {
        Some(url) => url,
        None => prompt_required("Enter your server URL: ")?,
    };
    let token = match config.token() {
        Some(token) => token,
        None => prompt_required("Enter your authentication token / X-Plex-Token: ")?,
    };

    let server = PlexServer::new(&PlexConfig {
        base_url,
        token,
        request_timeout: config.request_timeout(),
        connect_timeout: config.connect_timeout(),
        insecure_tls: config.insecure_tls,
    })?;
    info!(target: "cli", "connecting to {}", server.base_url());

    let sections = plan::fetch_sections(&server)?;
    let section = match plan::choose_section(sections, config.library()) {
        SectionChoice::Selected(section) => section,
        SectionChoice::Ask(sections) => pick_section(&sections)?,
    };
    if verbose {
        println!("{} {}", "SELECTED LIBRARY:".blue(), section.title);
        println!("{} {}", "ASSETS:".blue(), session.assets);
        println!("{} {}", "OVERWRITE:".blue(), config.overwrite);
        println!(
            "{} {}",
            "INCLUDE OVERLAYED POSTERS:".blue(),
            config.include_overlays
        );
        println!("\nGetting library items...");
    }

    let plan = plan::prepare_export_plan(&server, section, config.include_overlays)
        .context("list library items")?;
    println!("\n{} items found.", plan.items.len());

    if !session.assume_yes && !confirm("Start exporting assets? [y]/[n]: ")? {
        println!("\nCancelled");
        info!(target: "cli", "export cancelled by user");
        return Ok(());
    }

    let options = ExportOptions {
        assets: session.assets,
        overwrite: config.overwrite,
        max_workers: config.max_workers.max(1),
    };
    let fetcher = server.asset_fetcher();
    let progress = ProgressReporter::new(plan.items.len(), !verbose);
    let sink = |event: ExportEvent| {
        if verbose {
            print_event(&event);
        }
        progress.observe(&event);
    };

    let result = AssetExporter::new(options, &fetcher, &LocalFs)
        .with_events(&sink)
        .run(&plan.items);
    progress.finish();
    let report = result?;

    if verbose {
        println!("\n{} {}", "TOTAL SKIPPED:".blue(), report.skipped);
        println!("{} {}", "TOTAL DOWNLOADED:".blue(), report.downloaded);
    } else {
        println!(
            "\nDone: {} downloaded, {} skipped.",
            report.downloaded, report.skipped
        );
    }
    Ok(())
}

fn print_event(event: &ExportEvent) {
    match event {
        ExportEvent::ItemStarted { title } => println!("\n{} {}", "ITEM:".blue(), title),
        ExportEvent::Skipped { path } => println!("{} {}", "SKIPPED:".yellow(), path.display()),
        ExportEvent::Downloaded { path } => {
            println!("{} {}", "DOWNLOADED:".green(), path.display())
        }
        ExportEvent::ItemFinished => {}
    }
}
