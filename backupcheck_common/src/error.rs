use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which tree a root-level error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSide {
    Source,
    Destination,
}

impl fmt::Display for TreeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeSide::Source => f.write_str("Source"),
            TreeSide::Destination => f.write_str("Destination"),
        }
    }
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{side} directory does not exist: {}", path.display())]
    RootNotFound { side: TreeSide, path: PathBuf },

    #[error("{side} path is not a directory: {}", path.display())]
    NotADirectory { side: TreeSide, path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid ignore pattern: {0}")]
    Pattern(String),
}

impl VerifyError {
    /// True for errors caused by how the run was set up rather than by the
    /// state of the backup itself.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            VerifyError::RootNotFound { .. }
                | VerifyError::NotADirectory { .. }
                | VerifyError::Config(_)
                | VerifyError::Pattern(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
