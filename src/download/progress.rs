//! Progress reporting and the CLI progress bar.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::models::ExportEvent;

pub(crate) struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    /// A bar over `total` items, drawn on stderr. `enabled = false` (verbose
    /// output, which prints a line per file instead) gives a silent reporter.
    pub(crate) fn new(total: usize, enabled: bool) -> Self {
        if !enabled || total == 0 {
            return Self { bar: None };
        }
        let style = ProgressStyle::with_template(
            "{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        bar.set_style(style);
        bar.set_prefix("Exporting");
        Self { bar: Some(bar) }
    }

    pub(crate) fn observe(&self, event: &ExportEvent) {
        let Some(bar) = self.bar.as_ref() else {
            return;
        };
        match event {
            ExportEvent::ItemStarted { title } => bar.set_message(title.clone()),
            ExportEvent::ItemFinished => bar.inc(1),
            ExportEvent::Downloaded { .. } | ExportEvent::Skipped { .. } => {}
        }
    }

    pub(crate) fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(|b| b.position())
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = self.bar.as_ref() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn counts_finished_items_only() {
        let reporter = ProgressReporter::new(3, true);
        reporter.observe(&ExportEvent::ItemStarted {
            title: "Heat".to_string(),
        });
        reporter.observe(&ExportEvent::Downloaded {
            path: PathBuf::from("/movies/Heat/poster.jpg"),
        });
        reporter.observe(&ExportEvent::ItemFinished);
        assert_eq!(reporter.position(), Some(1));
        reporter.finish();
    }

    #[test]
    fn disabled_reporter_has_no_bar() {
        let reporter = ProgressReporter::new(3, false);
        reporter.observe(&ExportEvent::ItemFinished);
        assert_eq!(reporter.position(), None);
        assert_eq!(ProgressReporter::new(0, true).position(), None);
    }
}
