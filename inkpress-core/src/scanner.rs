//! Content discovery: walk a root, build every Markdown file found.

use crate::entry::{EntryBuilder, EntryError, RawDocument};
use crate::models::{Entry, EntryKind, Failure, FailureKind};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("content root {} does not exist", path.display())]
    RootMissing { path: PathBuf },

    #[error("content root {} is not a directory", path.display())]
    RootNotADirectory { path: PathBuf },

    #[error("cannot read content root {}: {error}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

/// One tree to scan and the entity kind it produces
#[derive(Debug, Clone)]
pub struct ScanRoot {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Subtrees to skip (e.g. a pages directory nested in the posts root)
    pub exclude: Vec<PathBuf>,
}

impl ScanRoot {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
            exclude: Vec::new(),
        }
    }

    pub fn excluding(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude.push(path.into());
        self
    }
}

/// Everything one scan produced
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Successfully built entities that passed draft filtering
    pub entries: Vec<Entry>,
    pub failures: Vec<Failure>,
    /// Drafts built, whether or not they were kept
    pub draft_count: usize,
    /// Markdown files discovered
    pub discovered: usize,
}

impl ScanOutcome {
    pub fn merge(&mut self, other: ScanOutcome) {
        self.entries.extend(other.entries);
        self.failures.extend(other.failures);
        self.draft_count += other.draft_count;
        self.discovered += other.discovered;
    }
}

/// Walks content roots and hands each Markdown file to the entry builder
pub struct Scanner<'a> {
    builder: EntryBuilder<'a>,
    include_drafts: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(builder: EntryBuilder<'a>, include_drafts: bool) -> Self {
        Self {
            builder,
            include_drafts,
        }
    }

    /// Scan `root` recursively. A missing or unreadable root is fatal;
    /// anything wrong with an individual file becomes a [`Failure`].
    pub fn scan(&self, root: &ScanRoot) -> Result<ScanOutcome, ScanError> {
        check_root(&root.path)?;

        let mut outcome = ScanOutcome::default();
        for file in self.discover(root, &mut outcome.failures)? {
            outcome.discovered += 1;
            match self.build_file(root, &file) {
                Ok(entry) => {
                    if entry.is_draft() {
                        outcome.draft_count += 1;
                        if !self.include_drafts {
                            tracing::debug!("Skipping draft {}", file.display());
                            continue;
                        }
                    }
                    outcome.entries.push(entry);
                }
                Err(err) => {
                    tracing::warn!("Skipping {}: {}", file.display(), err);
                    outcome.failures.push(err.into_failure());
                }
            }
        }

        tracing::info!(
            "Scanned {} ({}): {} files, {} built, {} failed, {} drafts",
            root.path.display(),
            root.kind.as_str(),
            outcome.discovered,
            outcome.entries.len(),
            outcome.failures.len(),
            outcome.draft_count
        );

        Ok(outcome)
    }

    /// Every `.md` file under the root, at any depth, in path order.
    /// Hidden files and directories are skipped.
    fn discover(
        &self,
        root: &ScanRoot,
        failures: &mut Vec<Failure>,
    ) -> Result<Vec<PathBuf>, ScanError> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&root.path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || is_excluded(e, &root.exclude)));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && is_markdown(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(err) if err.depth() == 0 => {
                    return Err(ScanError::RootUnreadable {
                        path: root.path.clone(),
                        error: err.into(),
                    });
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.path.clone());
                    tracing::warn!("Cannot read {}: {}", path.display(), err);
                    failures.push(Failure {
                        path,
                        kind: FailureKind::Unreadable,
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::debug!("Found {} markdown files under {}", files.len(), root.path.display());
        Ok(files)
    }

    fn build_file(&self, root: &ScanRoot, path: &Path) -> Result<Entry, EntryError> {
        let text = fs::read_to_string(path).map_err(|error| EntryError::Unreadable {
            path: path.to_path_buf(),
            error,
        })?;
        let rel_path = path.strip_prefix(&root.path).unwrap_or(path).to_path_buf();

        self.builder.build(
            &RawDocument {
                path: path.to_path_buf(),
                rel_path,
                text,
            },
            root.kind,
        )
    }
}

fn check_root(path: &Path) -> Result<(), ScanError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ScanError::RootNotADirectory {
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ScanError::RootMissing {
            path: path.to_path_buf(),
        }),
        Err(error) => Err(ScanError::RootUnreadable {
            path: path.to_path_buf(),
            error,
        }),
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn is_excluded(entry: &DirEntry, exclude: &[PathBuf]) -> bool {
    entry.file_type().is_dir() && exclude.iter().any(|p| entry.path() == p)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}
