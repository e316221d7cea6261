//! File input/output.

pub mod artifact;
pub mod cloudy;
pub mod utils;

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;

/// How much non-critical status information to report.
#[derive(Clone)]
pub enum Verbosity {
    Quiet,
    Messages,
    Progress(ProgressStyle),
}

impl Verbosity {
    /// Whether status messages should be printed.
    pub fn print_messages(&self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Creates a progress bar for the given number of steps, hidden unless
    /// progress reporting is enabled.
    pub fn create_progress_bar(&self, size: usize) -> ProgressBar {
        match self {
            Self::Progress(style) => ProgressBar::new(size as u64).with_style(style.clone()),
            _ => ProgressBar::hidden(),
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::Quiet
    }
}

impl fmt::Debug for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quiet => write!(f, "Quiet"),
            Self::Messages => write!(f, "Messages"),
            Self::Progress(_) => write!(f, "Progress"),
        }
    }
}

/// Whether existing files may be replaced when writing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverwriteMode {
    Always,
    Never,
}

impl From<bool> for OverwriteMode {
    fn from(overwrite: bool) -> Self {
        if overwrite {
            Self::Always
        } else {
            Self::Never
        }
    }
}
