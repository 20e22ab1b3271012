use backupcheck_common::{FileRecord, ScanWarning, VerifyError, DEFAULT_METADATA_MAX_SIZE};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::{Parallelism, WalkDir};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Decides whether a scanned file should be left out of the file set
pub trait ExcludeRule: Send + Sync {
    /// `relative_path` is `/`-separated and relative to the scanned folder.
    fn excludes(&self, relative_path: &str, size: u64) -> bool;
}

impl<F> ExcludeRule for F
where
    F: Fn(&str, u64) -> bool + Send + Sync,
{
    fn excludes(&self, relative_path: &str, size: u64) -> bool {
        self(relative_path, size)
    }
}

/// Keeps every file
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExclusion;

impl ExcludeRule for NoExclusion {
    fn excludes(&self, _relative_path: &str, _size: u64) -> bool {
        false
    }
}

/// macOS `._*` resource-fork files, which the delete tool removes when small
#[derive(Debug, Clone, Copy)]
pub struct MacMetadataRule {
    pub max_size: u64,
}

impl Default for MacMetadataRule {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_METADATA_MAX_SIZE,
        }
    }
}

impl ExcludeRule for MacMetadataRule {
    fn excludes(&self, relative_path: &str, size: u64) -> bool {
        let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        file_name.starts_with("._") && size <= self.max_size
    }
}

/// Gitignore-style patterns matched against the path and all of its parents
pub struct PatternRule {
    matcher: Gitignore,
}

impl PatternRule {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, VerifyError> {
        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            let pattern = pattern.as_ref();
            builder
                .add_line(None, pattern)
                .map_err(|e| VerifyError::Pattern(format!("{}: {}", pattern, e)))?;
            debug!("Added ignore pattern: {}", pattern);
        }

        let matcher = builder
            .build()
            .map_err(|e| VerifyError::Pattern(e.to_string()))?;
        Ok(Self { matcher })
    }
}

impl ExcludeRule for PatternRule {
    fn excludes(&self, relative_path: &str, _size: u64) -> bool {
        let path = Path::new(relative_path);
        if self.matcher.matched(path, false).is_ignore() {
            return true;
        }

        let mut current = path;
        while let Some(parent) = current.parent() {
            if !parent.as_os_str().is_empty() && self.matcher.matched(parent, true).is_ignore() {
                return true;
            }
            current = parent;
        }
        false
    }
}

/// Excludes a file when any of its rules does
#[derive(Default)]
pub struct AnyRule {
    rules: Vec<Box<dyn ExcludeRule>>,
}

impl AnyRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: impl ExcludeRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ExcludeRule for AnyRule {
    fn excludes(&self, relative_path: &str, size: u64) -> bool {
        self.rules.iter().any(|rule| rule.excludes(relative_path, size))
    }
}

/// One item produced while walking a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanItem {
    File(FileRecord),
    Warning(ScanWarning),
}

/// Collected result of a full walk
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub files: Vec<FileRecord>,
    pub warnings: Vec<ScanWarning>,
    /// False when the walk was cancelled before it finished
    pub complete: bool,
}

/// Recursive scanner for regular files under a folder
#[derive(Clone)]
pub struct FolderScanner {
    exclusion: Arc<dyn ExcludeRule>,
}

impl Default for FolderScanner {
    fn default() -> Self {
        Self::new(Arc::new(NoExclusion))
    }
}

impl FolderScanner {
    pub fn new(exclusion: Arc<dyn ExcludeRule>) -> Self {
        Self { exclusion }
    }

    /// Lazily walk `root`. Symbolic links are neither followed nor reported.
    pub fn walk<'a>(&'a self, root: &Path, cancel: Option<&'a AtomicBool>) -> FileWalk<'a> {
        // Serial: callers already run one walk per worker thread.
        let entries = WalkDir::new(root)
            .follow_links(false)
            .skip_hidden(false)
            .sort(true)
            .parallelism(Parallelism::Serial)
            .into_iter();

        FileWalk {
            root: root.to_path_buf(),
            entries: Box::new(entries),
            exclusion: self.exclusion.as_ref(),
            cancel,
            cancelled: false,
        }
    }

    /// Walk `root` to the end and collect everything it yields.
    pub fn scan(&self, root: &Path, cancel: Option<&AtomicBool>) -> ScanOutcome {
        let mut walk = self.walk(root, cancel);
        let mut outcome = ScanOutcome::default();

        for item in walk.by_ref() {
            match item {
                ScanItem::File(record) => outcome.files.push(record),
                ScanItem::Warning(warning) => outcome.warnings.push(warning),
            }
        }

        outcome.complete = walk.is_complete();
        debug!(
            "Scanned {} files from {:?} ({} warnings)",
            outcome.files.len(),
            root,
            outcome.warnings.len()
        );
        outcome
    }
}

type EntryResult = Result<jwalk::DirEntry<((), ())>, jwalk::Error>;

/// Streaming walk over one folder, see [`FolderScanner::walk`]
pub struct FileWalk<'a> {
    root: PathBuf,
    entries: Box<dyn Iterator<Item = EntryResult> + 'a>,
    exclusion: &'a dyn ExcludeRule,
    cancel: Option<&'a AtomicBool>,
    cancelled: bool,
}

impl FileWalk<'_> {
    /// True once the walk has ended without being cancelled
    pub fn is_complete(&self) -> bool {
        !self.cancelled
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}

impl Iterator for FileWalk<'_> {
    type Item = ScanItem;

    fn next(&mut self) -> Option<ScanItem> {
        loop {
            if self.cancelled {
                return None;
            }
            if self.cancel_requested() {
                debug!("Scan of {:?} cancelled", self.root);
                self.cancelled = true;
                return None;
            }

            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    return Some(ScanItem::Warning(ScanWarning {
                        path: e.path().map(Path::to_path_buf),
                        message: e.to_string(),
                    }));
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                if let Some(e) = &entry.read_children_error {
                    return Some(ScanItem::Warning(ScanWarning {
                        path: Some(entry.path()),
                        message: format!("Failed to read directory: {}", e),
                    }));
                }
                continue;
            }
            // Symlinks and special files are not part of the set.
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            let relative_path = match path.strip_prefix(&self.root) {
                Ok(relative) if !relative.as_os_str().is_empty() => to_posix(relative),
                _ => continue,
            };

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    return Some(ScanItem::Warning(ScanWarning {
                        path: Some(path),
                        message: format!("Metadata error: {}", e),
                    }));
                }
            };

            if self.exclusion.excludes(&relative_path, size) {
                debug!("Ignoring excluded file: {}", path.display());
                continue;
            }

            return Some(ScanItem::File(FileRecord {
                relative_path,
                size,
            }));
        }
    }
}

fn to_posix(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
