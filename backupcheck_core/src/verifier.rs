use crate::comparer::{CaseSensitivity, DestinationIndex, FileSetComparer, FileSetDiff};
use crate::folder_name::{parse_destination_folder_name, parse_source_folder_name};
use crate::matcher::{list_child_folders, match_folders, FolderIndex};
use crate::report::ReportBuilder;
use crate::scanner::{
    AnyRule, ExcludeRule, FolderScanner, MacMetadataRule, NoExclusion, PatternRule, ScanItem,
};
use backupcheck_common::{
    AppConfig, FolderComparisonResult, FolderStatus, MatchedPair, TreeSide, VerificationReport,
    VerifyError,
};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Receives progress notifications while folder pairs are verified.
/// Calls may arrive from several worker threads.
pub trait ProgressSink: Send + Sync {
    fn on_start(&self, _total_pairs: usize) {}
    fn on_folder_done(&self, _result: &FolderComparisonResult) {}
    fn on_finish(&self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Knobs for a verification run
#[derive(Clone)]
pub struct VerifyOptions {
    /// Files matching this rule are left out on both sides
    pub exclusion: Arc<dyn ExcludeRule>,
    pub case_sensitivity: CaseSensitivity,
    /// Size of the worker pool; `None` uses one thread per core
    pub threads: Option<usize>,
    /// Raising this flag stops running scans; their folders become `Incomplete`
    pub cancel: Option<Arc<AtomicBool>>,
    pub progress: Arc<dyn ProgressSink>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            exclusion: Arc::new(NoExclusion),
            case_sensitivity: CaseSensitivity::Sensitive,
            threads: None,
            cancel: None,
            progress: Arc::new(NoProgress),
        }
    }
}

impl VerifyOptions {
    /// Options described by a configuration file
    pub fn from_config(config: &AppConfig) -> Result<Self, VerifyError> {
        let mut rule = AnyRule::new();
        if config.ignore_deleted {
            rule = rule.with(MacMetadataRule {
                max_size: config.metadata_max_size,
            });
        }
        if !config.ignore_patterns.is_empty() {
            rule = rule.with(PatternRule::new(config.ignore_patterns.as_slice())?);
        }

        let exclusion: Arc<dyn ExcludeRule> = if rule.is_empty() {
            Arc::new(NoExclusion)
        } else {
            Arc::new(rule)
        };

        Ok(Self {
            exclusion,
            case_sensitivity: if config.case_insensitive_paths {
                CaseSensitivity::Insensitive
            } else {
                CaseSensitivity::Sensitive
            },
            threads: config.threads,
            ..Default::default()
        })
    }

    pub fn with_exclusion(mut self, exclusion: Arc<dyn ExcludeRule>) -> Self {
        self.exclusion = exclusion;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }
}

/// Verify that every dated source folder has a complete copy under
/// `destination_root`.
///
/// Only a missing or non-directory root is an error; every other problem is
/// recorded in the returned report.
pub fn verify(
    source_root: &Path,
    destination_root: &Path,
    options: &VerifyOptions,
) -> Result<VerificationReport, VerifyError> {
    check_root(source_root, TreeSide::Source)?;
    check_root(destination_root, TreeSide::Destination)?;

    info!("Starting backup verification");
    info!("  Source:      {}", source_root.display());
    info!("  Destination: {}", destination_root.display());

    let source_index = FolderIndex::build(list_child_folders(source_root)?, parse_source_folder_name);
    info!(
        "Found {} unique dates in source folders ({} unparseable)",
        source_index.dates().count(),
        source_index.unparseable().len()
    );

    let destination_index = FolderIndex::build(
        list_child_folders(destination_root)?,
        parse_destination_folder_name,
    );
    info!(
        "Found {} unique dates in destination folders ({} unparseable)",
        destination_index.dates().count(),
        destination_index.unparseable().len()
    );

    let matching = match_folders(source_index, destination_index);
    let scanner = FolderScanner::new(Arc::clone(&options.exclusion));

    let pool = ThreadPoolBuilder::new()
        .num_threads(options.threads.unwrap_or(0))
        .build()
        .map_err(|e| {
            VerifyError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to start worker pool: {}", e),
            ))
        })?;

    options.progress.on_start(matching.pairs.len());
    let results: Vec<FolderComparisonResult> = pool.install(|| {
        matching
            .pairs
            .into_par_iter()
            .map(|pair| {
                let result = verify_pair(&scanner, pair, options);
                options.progress.on_folder_done(&result);
                result
            })
            .collect()
    });
    options.progress.on_finish();

    let mut builder = ReportBuilder::new(source_root, destination_root)
        .with_unmatched(matching.unmatched_source, matching.unmatched_destination);
    for result in results {
        builder.push_result(result);
    }
    let report = builder.build();

    if report.overall_success {
        info!("Verification completed successfully - all files verified");
    } else {
        warn!(
            "Verification completed with issues: {} missing, {} size mismatches, {} unmatched folders",
            report.totals.missing_files,
            report.totals.size_mismatches,
            report.totals.unmatched_source + report.totals.unmatched_destination
        );
    }
    Ok(report)
}

fn check_root(path: &Path, side: TreeSide) -> Result<(), VerifyError> {
    if !path.exists() {
        return Err(VerifyError::RootNotFound {
            side,
            path: path.to_path_buf(),
        });
    }
    if !path.is_dir() {
        return Err(VerifyError::NotADirectory {
            side,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Index the destination folder, then stream the source folder through the
/// comparer.
fn verify_pair(
    scanner: &FolderScanner,
    pair: MatchedPair,
    options: &VerifyOptions,
) -> FolderComparisonResult {
    let cancel = options.cancel.as_deref();
    debug!(
        "Checking {} against {}",
        pair.source.path.display(),
        pair.destination.path.display()
    );

    let destination_scan = scanner.scan(&pair.destination.path, cancel);
    let mut warnings = destination_scan.warnings;
    let index = DestinationIndex::new(destination_scan.files, options.case_sensitivity);

    let mut comparer = FileSetComparer::new(&index);
    let mut walk = scanner.walk(&pair.source.path, cancel);
    let mut source_skipped = false;
    for item in walk.by_ref() {
        match item {
            ScanItem::File(record) => comparer.check(record),
            ScanItem::Warning(warning) => {
                source_skipped = true;
                warnings.push(warning);
            }
        }
    }
    let complete = destination_scan.complete && walk.is_complete();
    let diff = comparer.finish();

    for warning in &warnings {
        warn!(
            "Scan warning in {}: {}",
            warning
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            warning.message
        );
    }

    let status = pair_status(&diff, complete, source_skipped);
    match status {
        FolderStatus::Matched => info!("✓ All files verified in {}", pair.destination.name()),
        FolderStatus::Partial => warn!(
            "✗ {} files missing or mismatched in {}",
            diff.missing.len() + diff.size_mismatches.len(),
            pair.destination.name()
        ),
        FolderStatus::Incomplete => warn!(
            "Scan of {} did not finish or skipped unreadable entries",
            pair.source.name()
        ),
    }

    FolderComparisonResult {
        pair,
        source_file_count: diff.source_file_count,
        destination_file_count: index.file_count(),
        missing: diff.missing,
        size_mismatches: diff.size_mismatches,
        warnings,
        status,
    }
}

/// Source entries that could not be read were never compared, so a clean
/// diff does not prove the folder is complete. Unreadable destination entries
/// already surface as missing files.
fn pair_status(diff: &FileSetDiff, complete: bool, source_skipped: bool) -> FolderStatus {
    if !complete || source_skipped {
        FolderStatus::Incomplete
    } else {
        diff.status()
    }
}
