use backupcheck_common::{FolderComparisonResult, FolderStatus};
use backupcheck_core::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar over matched folder pairs, drawn on stderr
pub struct FolderProgress {
    bar: ProgressBar,
}

impl FolderProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} folders {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl ProgressSink for FolderProgress {
    fn on_start(&self, total_pairs: usize) {
        self.bar.set_length(total_pairs as u64);
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_folder_done(&self, result: &FolderComparisonResult) {
        let mark = match result.status {
            FolderStatus::Matched => "✓",
            FolderStatus::Partial => "✗",
            FolderStatus::Incomplete => "⚠",
        };
        self.bar.set_message(format!("{} {}", mark, result.pair.source.name()));
        self.bar.inc(1);
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}
