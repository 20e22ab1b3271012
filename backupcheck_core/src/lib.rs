pub mod comparer;
pub mod folder_name;
pub mod matcher;
pub mod report;
pub mod scanner;
pub mod verifier;

pub use comparer::{compare, CaseSensitivity, DestinationIndex, FileSetComparer, FileSetDiff};
pub use folder_name::{
    format_destination_date, parse_destination_folder_name, parse_source_folder_name,
};
pub use matcher::{list_child_folders, match_folders, FolderIndex, FolderMatching};
pub use report::{render_json, render_text, ReportBuilder};
pub use scanner::{
    AnyRule, ExcludeRule, FileWalk, FolderScanner, MacMetadataRule, NoExclusion, PatternRule,
    ScanItem, ScanOutcome,
};
pub use verifier::{verify, NoProgress, ProgressSink, VerifyOptions};
