use backupcheck_common::{
    FolderDescriptor, MatchedPair, ParsedFolderName, UnmatchedFolder, UnmatchedReason, VerifyError,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Folders of one tree grouped by the date encoded in their names
#[derive(Debug, Default)]
pub struct FolderIndex {
    by_date: BTreeMap<NaiveDate, Vec<FolderDescriptor>>,
    unparseable: Vec<PathBuf>,
}

impl FolderIndex {
    /// Parse the final component of every path with `parse`. Folders sharing a
    /// date are kept in path order; names that do not parse are set aside.
    pub fn build<I, F>(paths: I, parse: F) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
        F: Fn(&str) -> Option<ParsedFolderName>,
    {
        let mut index = FolderIndex::default();

        for path in paths {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            match parse(&name) {
                Some(parsed) => {
                    index.by_date.entry(parsed.date).or_default().push(FolderDescriptor {
                        path,
                        date: parsed.date,
                        description: parsed.description,
                    });
                }
                None => {
                    debug!("Could not parse date from folder name: {:?}", name);
                    index.unparseable.push(path);
                }
            }
        }

        for folders in index.by_date.values_mut() {
            folders.sort_by(|a, b| a.path.cmp(&b.path));
        }
        index.unparseable.sort();
        index
    }

    /// Distinct dates, in ascending order
    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.by_date.keys()
    }

    pub fn folders_for(&self, date: &NaiveDate) -> &[FolderDescriptor] {
        self.by_date.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn unparseable(&self) -> &[PathBuf] {
        &self.unparseable
    }

    /// Number of dated folders
    pub fn folder_count(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }
}

/// Pairing of source and destination folders by date
#[derive(Debug, Default)]
pub struct FolderMatching {
    /// One pair per date present on both sides, ascending by date
    pub pairs: Vec<MatchedPair>,
    pub unmatched_source: Vec<UnmatchedFolder>,
    pub unmatched_destination: Vec<UnmatchedFolder>,
}

/// Pair folders by date.
///
/// When several folders on one side share a date, the one with the lowest
/// path is paired and the others are reported as `DuplicateDate`. Folders are
/// never merged.
pub fn match_folders(source: FolderIndex, destination: FolderIndex) -> FolderMatching {
    let mut matching = FolderMatching::default();
    let mut destination_by_date = destination.by_date;

    for (date, source_folders) in source.by_date {
        let Some(destination_folders) = destination_by_date.remove(&date) else {
            debug!("No destination folder found for date {}", date);
            matching.unmatched_source.extend(
                source_folders
                    .into_iter()
                    .map(|f| UnmatchedFolder::from_descriptor(f, UnmatchedReason::NoCounterpart)),
            );
            continue;
        };

        let mut source_iter = source_folders.into_iter();
        let mut destination_iter = destination_folders.into_iter();
        if let (Some(source), Some(destination)) = (source_iter.next(), destination_iter.next()) {
            matching.pairs.push(MatchedPair {
                date,
                source,
                destination,
            });
        }

        for duplicate in source_iter {
            warn!("Duplicate source folder for {}: {}", date, duplicate.path.display());
            matching
                .unmatched_source
                .push(UnmatchedFolder::from_descriptor(duplicate, UnmatchedReason::DuplicateDate));
        }
        for duplicate in destination_iter {
            warn!("Duplicate destination folder for {}: {}", date, duplicate.path.display());
            matching
                .unmatched_destination
                .push(UnmatchedFolder::from_descriptor(duplicate, UnmatchedReason::DuplicateDate));
        }
    }

    for (_, destination_folders) in destination_by_date {
        matching.unmatched_destination.extend(
            destination_folders
                .into_iter()
                .map(|f| UnmatchedFolder::from_descriptor(f, UnmatchedReason::NoCounterpart)),
        );
    }

    matching
        .unmatched_source
        .extend(source.unparseable.into_iter().map(UnmatchedFolder::unparseable));
    matching
        .unmatched_destination
        .extend(destination.unparseable.into_iter().map(UnmatchedFolder::unparseable));

    sort_unmatched(&mut matching.unmatched_source);
    sort_unmatched(&mut matching.unmatched_destination);

    info!(
        "Matched {} folder pairs ({} unmatched source, {} unmatched destination)",
        matching.pairs.len(),
        matching.unmatched_source.len(),
        matching.unmatched_destination.len()
    );
    matching
}

/// Dated entries first in date order, then undated ones; ties by path.
fn sort_unmatched(folders: &mut [UnmatchedFolder]) {
    folders.sort_by(|a, b| {
        (a.date.is_none(), a.date, &a.path).cmp(&(b.date.is_none(), b.date, &b.path))
    });
}

/// Immediate subdirectories of `root`, sorted by path.
///
/// Symbolic links and plain files are skipped. Entries that cannot be read
/// are logged and skipped; failing to read `root` itself is an error.
pub fn list_child_folders(root: &Path) -> Result<Vec<PathBuf>, VerifyError> {
    let mut folders = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in {}: {}", root.display(), e);
                continue;
            }
        };
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => folders.push(entry.path()),
            Ok(_) => {}
            Err(e) => warn!("Failed to read file type of {}: {}", entry.path().display(), e),
        }
    }

    folders.sort();
    Ok(folders)
}
