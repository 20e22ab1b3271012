use backupcheck_common::{FileRecord, FolderStatus, SizeMismatch};
use std::collections::HashMap;
use tracing::debug;

/// How relative paths are matched between the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSensitivity {
    /// Exact byte-for-byte path match
    #[default]
    Sensitive,
    /// Paths that differ only in letter case are the same file
    Insensitive,
}

impl CaseSensitivity {
    fn key(&self, relative_path: &str) -> String {
        match self {
            CaseSensitivity::Sensitive => relative_path.to_string(),
            CaseSensitivity::Insensitive => relative_path.to_lowercase(),
        }
    }
}

/// Destination file set indexed by relative path
#[derive(Debug, Clone, Default)]
pub struct DestinationIndex {
    /// Under case folding several files can share a key
    sizes: HashMap<String, Vec<u64>>,
    file_count: usize,
    case: CaseSensitivity,
}

impl DestinationIndex {
    pub fn new<I>(records: I, case: CaseSensitivity) -> Self
    where
        I: IntoIterator<Item = FileRecord>,
    {
        let mut index = DestinationIndex {
            case,
            ..Default::default()
        };
        for record in records {
            let sizes = index.sizes.entry(case.key(&record.relative_path)).or_default();
            if !sizes.is_empty() {
                debug!(
                    "Destination paths differing only in case: {}",
                    record.relative_path
                );
            }
            sizes.push(record.size);
            index.file_count += 1;
        }
        index
    }

    /// Number of records indexed, including any that collapsed onto the same
    /// key under case-insensitive matching
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Sizes of every destination file stored under this path
    pub fn sizes_of(&self, relative_path: &str) -> Option<&[u64]> {
        self.sizes
            .get(&self.case.key(relative_path))
            .map(Vec::as_slice)
    }
}

/// Source files not accounted for in the destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSetDiff {
    pub source_file_count: usize,
    pub missing: Vec<FileRecord>,
    pub size_mismatches: Vec<SizeMismatch>,
}

impl FileSetDiff {
    pub fn status(&self) -> FolderStatus {
        if self.missing.is_empty() && self.size_mismatches.is_empty() {
            FolderStatus::Matched
        } else {
            FolderStatus::Partial
        }
    }
}

/// Checks source files one at a time against a destination index, so the
/// source side can be streamed straight from the scanner.
pub struct FileSetComparer<'a> {
    destination: &'a DestinationIndex,
    diff: FileSetDiff,
}

impl<'a> FileSetComparer<'a> {
    pub fn new(destination: &'a DestinationIndex) -> Self {
        Self {
            destination,
            diff: FileSetDiff::default(),
        }
    }

    pub fn check(&mut self, record: FileRecord) {
        self.diff.source_file_count += 1;

        match self.destination.sizes_of(&record.relative_path) {
            None | Some([]) => self.diff.missing.push(record),
            Some(sizes) if sizes.contains(&record.size) => {}
            Some(sizes) => {
                self.diff.size_mismatches.push(SizeMismatch {
                    relative_path: record.relative_path,
                    source_size: record.size,
                    destination_size: sizes[0],
                });
            }
        }
    }

    /// Finish the comparison with results ordered by relative path
    pub fn finish(mut self) -> FileSetDiff {
        self.diff.missing.sort();
        self.diff
            .size_mismatches
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        self.diff
    }
}

/// Compare a source file stream against a destination index.
///
/// Files that exist only in the destination are not reported.
pub fn compare<I>(source: I, destination: &DestinationIndex) -> FileSetDiff
where
    I: IntoIterator<Item = FileRecord>,
{
    let mut comparer = FileSetComparer::new(destination);
    for record in source {
        comparer.check(record);
    }
    comparer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            size,
        }
    }

    #[test]
    fn test_identical_sets_match() {
        let destination = DestinationIndex::new(vec![record("a.jpg", 10)], CaseSensitivity::Sensitive);
        let diff = compare(vec![record("a.jpg", 10)], &destination);

        assert_eq!(diff.source_file_count, 1);
        assert!(diff.missing.is_empty());
        assert!(diff.size_mismatches.is_empty());
        assert_eq!(diff.status(), FolderStatus::Matched);
    }

    #[test]
    fn test_size_mismatch() {
        let destination = DestinationIndex::new(vec![record("a.jpg", 5)], CaseSensitivity::Sensitive);
        let diff = compare(vec![record("a.jpg", 10)], &destination);

        assert!(diff.missing.is_empty());
        assert_eq!(
            diff.size_mismatches,
            vec![SizeMismatch {
                relative_path: "a.jpg".to_string(),
                source_size: 10,
                destination_size: 5,
            }]
        );
        assert_eq!(diff.status(), FolderStatus::Partial);
    }

    #[test]
    fn test_missing_files_sorted_and_destination_extras_ignored() {
        let destination = DestinationIndex::new(
            vec![record("b.jpg", 1), record("extra.jpg", 7)],
            CaseSensitivity::Sensitive,
        );
        let diff = compare(
            vec![record("sub/z.mov", 3), record("b.jpg", 1), record("a.jpg", 2)],
            &destination,
        );

        assert_eq!(diff.source_file_count, 3);
        assert_eq!(diff.missing, vec![record("a.jpg", 2), record("sub/z.mov", 3)]);
        assert!(diff.size_mismatches.is_empty());
        assert_eq!(diff.status(), FolderStatus::Partial);
    }

    #[test]
    fn test_empty_source_is_matched() {
        let destination = DestinationIndex::new(vec![record("a.jpg", 1)], CaseSensitivity::Sensitive);
        let diff = compare(Vec::new(), &destination);
        assert_eq!(diff.source_file_count, 0);
        assert_eq!(diff.status(), FolderStatus::Matched);
    }

    #[test]
    fn test_case_sensitivity() {
        let source = vec![record("IMG_0001.JPG", 4)];

        let sensitive = DestinationIndex::new(vec![record("img_0001.jpg", 4)], CaseSensitivity::Sensitive);
        assert_eq!(compare(source.clone(), &sensitive).missing.len(), 1);

        let insensitive =
            DestinationIndex::new(vec![record("img_0001.jpg", 4)], CaseSensitivity::Insensitive);
        let diff = compare(source, &insensitive);
        assert!(diff.missing.is_empty());
        assert_eq!(diff.status(), FolderStatus::Matched);
    }

    #[test]
    fn test_destination_file_count() {
        let index = DestinationIndex::new(
            vec![record("a", 1), record("A", 1), record("b", 2)],
            CaseSensitivity::Insensitive,
        );
        assert_eq!(index.file_count(), 3);
        assert_eq!(index.sizes_of("B"), Some(&[2][..]));
        assert_eq!(index.sizes_of("a"), Some(&[1, 1][..]));
        assert_eq!(index.sizes_of("c"), None);
    }

    #[test]
    fn test_case_folded_collision_keeps_every_size() {
        let index = DestinationIndex::new(
            vec![record("IMG.jpg", 10), record("img.JPG", 20)],
            CaseSensitivity::Insensitive,
        );

        let diff = compare(vec![record("img.jpg", 10), record("Img.Jpg", 20)], &index);
        assert!(diff.missing.is_empty());
        assert!(diff.size_mismatches.is_empty());

        let diff = compare(vec![record("IMG.JPG", 30)], &index);
        assert_eq!(
            diff.size_mismatches,
            vec![SizeMismatch {
                relative_path: "IMG.JPG".to_string(),
                source_size: 30,
                destination_size: 10,
            }]
        );
    }
}
