//! Targets and the deduplicated target set
//!
//! A target is one unit of work: a file path, or standard input.

use ahash::RandomState;
use hashbrown::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Argument spelling that stands for standard input
pub const STDIN_ARG: &str = "-";

/// One unit of work
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Read everything from standard input
    Stdin,
    /// Read the file at this path
    File(PathBuf),
}

impl Target {
    /// Build a target from a command-line argument (`-` means stdin)
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == STDIN_ARG {
            Self::Stdin
        } else {
            Self::File(arg.to_path_buf())
        }
    }

    /// Label printed next to the count: the path, or empty for stdin
    pub fn label(&self) -> String {
        match self {
            Self::Stdin => String::new(),
            Self::File(path) => path.display().to_string(),
        }
    }

    /// Human-readable name used in diagnostics
    pub fn name(&self) -> String {
        match self {
            Self::Stdin => "standard input".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, Self::Stdin)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Stdin => None,
            Self::File(path) => Some(path),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Deduplicated collection of targets, built once before a run
#[derive(Debug, Clone)]
pub struct TargetSet {
    targets: HashSet<Target, RandomState>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self {
            targets: HashSet::with_hasher(RandomState::new()),
        }
    }

    /// Resolve positional arguments into a target set.
    ///
    /// No arguments means standard input. With `recursive`, directory
    /// arguments are replaced by the regular files found beneath them.
    pub fn from_args<P: AsRef<Path>>(args: &[P], recursive: bool) -> Self {
        let mut set = Self::new();

        if args.is_empty() {
            set.insert(Target::Stdin);
            return set;
        }

        for arg in args {
            let arg = arg.as_ref();
            if recursive && arg.is_dir() {
                set.extend_from_dir(arg);
            } else {
                set.insert(Target::from_arg(arg));
            }
        }

        set
    }

    /// Add every regular file below `dir`
    fn extend_from_dir(&mut self, dir: &Path) {
        for entry in WalkDir::new(dir).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    self.insert(Target::File(entry.into_path()));
                }
                Ok(_) => {}
                Err(e) => log::warn!("skipping entry under {}: {}", dir.display(), e),
            }
        }
    }

    /// Insert a target; returns false if it was already present
    pub fn insert(&mut self, target: Target) -> bool {
        self.targets.insert(target)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn contains(&self, target: &Target) -> bool {
        self.targets.contains(target)
    }

    /// True when the only work is reading standard input
    pub fn is_stdin_only(&self) -> bool {
        self.targets.len() == 1 && self.targets.contains(&Target::Stdin)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    /// Sum of the on-disk sizes of regular file targets
    pub fn known_size(&self) -> u64 {
        self.targets
            .iter()
            .filter_map(Target::path)
            .filter_map(|p| p.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum()
    }

    pub(crate) fn into_inner(self) -> HashSet<Target, RandomState> {
        self.targets
    }
}

impl Default for TargetSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Target> for TargetSet {
    fn from_iter<I: IntoIterator<Item = Target>>(iter: I) -> Self {
        let mut set = Self::new();
        for target in iter {
            set.insert(target);
        }
        set
    }
}
