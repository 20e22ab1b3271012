use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default size limit for `._*` metadata files that may be ignored
pub const DEFAULT_METADATA_MAX_SIZE: u64 = 4096;

/// Date and optional description extracted from a folder name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFolderName {
    pub date: NaiveDate,
    pub description: Option<String>,
}

/// A dated folder found directly under one of the two roots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderDescriptor {
    pub path: PathBuf,
    pub date: NaiveDate,
    pub description: Option<String>,
}

impl FolderDescriptor {
    /// Final path component, used when rendering reports
    pub fn name(&self) -> String {
        folder_name(&self.path)
    }
}

pub(crate) fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// A regular file found while scanning a folder
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the scanned folder, always `/`-separated
    pub relative_path: String,
    pub size: u64,
}

/// Source and destination folder sharing the same date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub date: NaiveDate,
    pub source: FolderDescriptor,
    pub destination: FolderDescriptor,
}

/// Why a folder did not take part in a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnmatchedReason {
    /// No folder on the other side carries this date
    NoCounterpart,
    /// Another folder with the same date was paired instead
    DuplicateDate,
    /// The name does not follow the naming convention of its tree
    Unparseable,
}

impl UnmatchedReason {
    pub fn describe(&self) -> &'static str {
        match self {
            UnmatchedReason::NoCounterpart => "No matching folder on the other side",
            UnmatchedReason::DuplicateDate => "Another folder with the same date was matched",
            UnmatchedReason::Unparseable => "Could not parse date from folder name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedFolder {
    pub path: PathBuf,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub reason: UnmatchedReason,
}

impl UnmatchedFolder {
    pub fn from_descriptor(descriptor: FolderDescriptor, reason: UnmatchedReason) -> Self {
        Self {
            path: descriptor.path,
            date: Some(descriptor.date),
            description: descriptor.description,
            reason,
        }
    }

    pub fn unparseable(path: PathBuf) -> Self {
        Self {
            path,
            date: None,
            description: None,
            reason: UnmatchedReason::Unparseable,
        }
    }

    pub fn name(&self) -> String {
        folder_name(&self.path)
    }
}

/// A file present on both sides with differing sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeMismatch {
    pub relative_path: String,
    pub source_size: u64,
    pub destination_size: u64,
}

/// Non-fatal problem hit while walking a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Outcome of verifying one matched pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderStatus {
    /// Every source file is present with the same size
    Matched,
    /// At least one file is missing or differs in size
    Partial,
    /// A scan was stopped before it finished
    Incomplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderComparisonResult {
    pub pair: MatchedPair,
    pub source_file_count: usize,
    pub destination_file_count: usize,
    pub missing: Vec<FileRecord>,
    pub size_mismatches: Vec<SizeMismatch>,
    pub warnings: Vec<ScanWarning>,
    pub status: FolderStatus,
}

impl FolderComparisonResult {
    pub fn is_matched(&self) -> bool {
        self.status == FolderStatus::Matched
    }
}

/// Aggregate counts over a verification run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub folders_checked: usize,
    pub folders_matched: usize,
    pub total_source_files: usize,
    pub total_destination_files: usize,
    pub missing_files: usize,
    pub size_mismatches: usize,
    pub unmatched_source: usize,
    pub unmatched_destination: usize,
    pub scan_warnings: usize,
}

impl ReportTotals {
    pub fn missing_or_mismatched(&self) -> usize {
        self.missing_files + self.size_mismatches
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    pub results: Vec<FolderComparisonResult>,
    pub unmatched_source: Vec<UnmatchedFolder>,
    pub unmatched_destination: Vec<UnmatchedFolder>,
    pub totals: ReportTotals,
    pub overall_success: bool,
}

/// Settings read from `backupcheck.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gitignore-style patterns for files that never count as missing
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Skip small `._*` metadata files, as the delete tool would remove them
    #[serde(default)]
    pub ignore_deleted: bool,

    /// Largest `._*` file considered metadata
    #[serde(default = "default_metadata_max_size")]
    pub metadata_max_size: u64,

    /// Compare relative paths without regard to case
    #[serde(default)]
    pub case_insensitive_paths: bool,

    /// Worker threads used to verify folder pairs
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_metadata_max_size() -> u64 {
    DEFAULT_METADATA_MAX_SIZE
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            ignore_deleted: false,
            metadata_max_size: DEFAULT_METADATA_MAX_SIZE,
            case_insensitive_paths: false,
            threads: None,
        }
    }
}
