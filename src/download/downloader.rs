//! Export main flow: walk the items, decide per file, hand fetches to the
//! transfer collaborator and count the outcome.
//!
//! The run stops at the first fatal condition (unresolvable path or failed
//! transfer). Files written before that point are left in place.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel as channel;
use tracing::{debug, error, info};

use super::catalog::{candidates_for_item, candidates_for_season};
use super::decision::{Decision, decide};
use super::errors::ExportError;
use super::models::{ExportEvent, ExportOptions, ExportReport, ExportTarget, LibraryItem, MediaType};
use super::traits::{AssetFetcher, FileProbe};
use crate::base_system::media_paths;

pub type EventSink<'a> = &'a (dyn Fn(ExportEvent) + Send + Sync);

#[derive(Debug, Default)]
struct Counters {
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
}

impl Counters {
    fn report(&self) -> ExportReport {
        ExportReport {
            downloaded: self.downloaded.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }
}

pub struct AssetExporter<'a> {
    options: ExportOptions,
    fetcher: &'a dyn AssetFetcher,
    probe: &'a dyn FileProbe,
    events: Option<EventSink<'a>>,
}

impl<'a> AssetExporter<'a> {
    pub fn new(
        options: ExportOptions,
        fetcher: &'a dyn AssetFetcher,
        probe: &'a dyn FileProbe,
    ) -> Self {
        Self {
            options,
            fetcher,
            probe,
            events: None,
        }
    }

    pub fn with_events(mut self, sink: EventSink<'a>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Export every item and return the final counters.
    pub fn run(&self, items: &[LibraryItem]) -> Result<ExportReport, ExportError> {
        info!(
            target: "export",
            "exporting {} items (assets={}, overwrite={}, workers={})",
            items.len(),
            self.options.assets,
            self.options.overwrite,
            self.options.max_workers.max(1)
        );

        let counters = Counters::default();
        let result = if self.options.max_workers > 1 && items.len() > 1 {
            self.run_pooled(items, &counters)
        } else {
            items
                .iter()
                .try_for_each(|item| self.export_item(item, &counters, None))
        };

        let report = counters.report();
        match &result {
            Ok(()) => info!(
                target: "export",
                "export finished: downloaded={}, skipped={}",
                report.downloaded, report.skipped
            ),
            Err(err) => error!(
                target: "export",
                "export aborted after downloaded={}, skipped={}: {err}",
                report.downloaded, report.skipped
            ),
        }
        result.map(|()| report)
    }

    // ── worker pool ───────────────────────────────────────────────

    /// Items are spread over `max_workers` threads. A worker owns a whole
    /// item, so the per-item emission order matches the sequential run.
    fn run_pooled(&self, items: &[LibraryItem], counters: &Counters) -> Result<(), ExportError> {
        let workers = self.options.max_workers.min(items.len());
        let (tx, rx) = channel::unbounded::<&LibraryItem>();
        for item in items {
            let _ = tx.send(item);
        }
        drop(tx);

        let cancel = AtomicBool::new(false);
        let first_error: Mutex<Option<ExportError>> = Mutex::new(None);

        thread::scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                let cancel = &cancel;
                let first_error = &first_error;
                scope.spawn(move || {
                    while let Ok(item) = rx.recv() {
                        if cancel.load(Ordering::SeqCst) {
                            return;
                        }
                        if let Err(err) = self.export_item(item, counters, Some(cancel)) {
                            cancel.store(true, Ordering::SeqCst);
                            if let Ok(mut slot) = first_error.lock()
                                && slot.is_none()
                            {
                                *slot = Some(err);
                            }
                            return;
                        }
                    }
                });
            }
        });

        match first_error.into_inner() {
            Ok(Some(err)) => Err(err),
            Ok(None) => Ok(()),
            Err(poisoned) => poisoned.into_inner().map_or(Ok(()), Err),
        }
    }

    // ── per item ──────────────────────────────────────────────────

    fn export_item(
        &self,
        item: &LibraryItem,
        counters: &Counters,
        cancel: Option<&AtomicBool>,
    ) -> Result<(), ExportError> {
        debug!(target: "export", "item: {}", item.title);
        self.emit(ExportEvent::ItemStarted {
            title: item.title.clone(),
        });

        let dir = media_paths::item_dir(item)?;
        for target in candidates_for_item(item, self.options.assets, &dir) {
            if is_cancelled(cancel) {
                return Ok(());
            }
            self.export_target(&target, counters)?;
        }

        if item.media_type == MediaType::Show {
            for season in &item.seasons {
                let dir = media_paths::season_dir(item, season)?;
                for target in candidates_for_season(season, self.options.assets, &dir) {
                    if is_cancelled(cancel) {
                        return Ok(());
                    }
                    self.export_target(&target, counters)?;
                }
            }
        }

        self.emit(ExportEvent::ItemFinished);
        Ok(())
    }

    fn export_target(&self, target: &ExportTarget, counters: &Counters) -> Result<(), ExportError> {
        let exists = self.probe.exists(&target.dir, &target.filename);
        match decide(self.options.overwrite, exists) {
            Decision::Skip => {
                let path = target.path();
                debug!(target: "export", "skipped: {}", path.display());
                counters.skipped.fetch_add(1, Ordering::SeqCst);
                self.emit(ExportEvent::Skipped { path });
            }
            Decision::Fetch => {
                let path = self
                    .fetcher
                    .fetch(&target.accessor, &target.dir, &target.filename)
                    .map_err(|source| ExportError::Transfer {
                        path: target.path(),
                        source,
                    })?;
                debug!(target: "export", "downloaded: {}", path.display());
                counters.downloaded.fetch_add(1, Ordering::SeqCst);
                self.emit(ExportEvent::Downloaded { path });
            }
        }
        Ok(())
    }

    fn emit(&self, event: ExportEvent) {
        if let Some(sink) = self.events {
            sink(event);
        }
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|c| c.load(Ordering::SeqCst))
}
