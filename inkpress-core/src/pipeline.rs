//! The content pipeline: scan, build, assemble.
//!
//! [`build_site`] is the single entry point. It carries no state between
//! calls, so the dev server simply calls it again after every change.

use crate::entry::{EntryBuilder, SiteDefaults};
use crate::markdown::MarkdownRenderer;
use crate::models::{EntryKind, Failure, SiteModel};
use crate::scanner::{ScanError, ScanOutcome, ScanRoot, Scanner};
use crate::site::assemble;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Immutable inputs threaded through scanning and entity building
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Root of the chronological post tree
    pub content_root: PathBuf,
    /// Root of the static page tree, if any
    pub pages_root: Option<PathBuf>,
    pub include_drafts: bool,
    pub defaults: SiteDefaults,
}

impl PipelineOptions {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            pages_root: None,
            include_drafts: false,
            defaults: SiteDefaults::default(),
        }
    }
}

/// Two or more entities derived the same slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugCollision {
    pub slug: String,
    /// Every conflicting source path, sorted
    pub paths: Vec<PathBuf>,
}

impl fmt::Display for SlugCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        write!(f, "slug `{}` is claimed by {}", self.slug, paths.join(", "))
    }
}

/// Errors that abort the whole build
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("the pages root {} must not contain the content root {}", pages.display(), content.display())]
    RootsOverlap { content: PathBuf, pages: PathBuf },

    #[error("{}", describe_collisions(.0))]
    SlugCollisions(Vec<SlugCollision>),
}

fn describe_collisions(collisions: &[SlugCollision]) -> String {
    let mut out = format!("{} slug collision(s):", collisions.len());
    for collision in collisions {
        out.push_str("\n  ");
        out.push_str(&collision.to_string());
    }
    out
}

/// Result of one successful pipeline run
#[derive(Debug)]
pub struct BuildOutput {
    pub model: SiteModel,
    /// Files excluded from the model, in discovery order
    pub failures: Vec<Failure>,
    /// Markdown files discovered across all roots
    pub discovered: usize,
}

/// Run the full pipeline: scan posts (and pages), then assemble the model.
///
/// Per-file problems come back in [`BuildOutput::failures`]; only a missing
/// root or a slug collision is an `Err`.
pub fn build_site(options: &PipelineOptions) -> Result<BuildOutput, PipelineError> {
    let renderer = MarkdownRenderer::new();
    build_site_with(options, &renderer)
}

/// [`build_site`] with a caller-configured Markdown renderer
pub fn build_site_with(
    options: &PipelineOptions,
    renderer: &MarkdownRenderer,
) -> Result<BuildOutput, PipelineError> {
    let roots = scan_roots(options)?;
    let scanner = Scanner::new(
        EntryBuilder::new(&options.defaults, renderer),
        options.include_drafts,
    );

    let mut outcome = ScanOutcome::default();
    for root in &roots {
        outcome.merge(scanner.scan(root)?);
    }

    let model = assemble(
        outcome.entries,
        outcome.draft_count,
        options.defaults.site_offset,
    )?;

    if !outcome.failures.is_empty() {
        tracing::warn!("{} file(s) skipped", outcome.failures.len());
    }

    Ok(BuildOutput {
        model,
        failures: outcome.failures,
        discovered: outcome.discovered,
    })
}

/// Content subdirectories copied verbatim to the output, never scanned
pub const PASSTHROUGH_DIRS: [&str; 2] = ["attachments", "extras"];

fn scan_roots(options: &PipelineOptions) -> Result<Vec<ScanRoot>, PipelineError> {
    let content_root = &options.content_root;
    let mut posts = ScanRoot::new(content_root, EntryKind::Post);
    for dir in PASSTHROUGH_DIRS {
        posts = posts.excluding(content_root.join(dir));
    }
    let mut roots = Vec::with_capacity(2);

    if let Some(pages_root) = &options.pages_root {
        // Compare resolved paths so `./posts` and `posts/pages` nest
        let content = canonical(content_root);
        let pages = canonical(pages_root);
        if content.starts_with(&pages) {
            return Err(PipelineError::RootsOverlap {
                content: content_root.clone(),
                pages: pages_root.clone(),
            });
        }
        // Spelled relative to the content root so it matches walked paths
        if let Ok(nested) = pages.strip_prefix(&content) {
            posts = posts.excluding(content_root.join(nested));
        }
        roots.push(posts);
        roots.push(ScanRoot::new(pages_root, EntryKind::Page));
    } else {
        roots.push(posts);
    }

    Ok(roots)
}

/// Resolved path when it exists; missing roots are reported by the scanner
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn order(output: &BuildOutput) -> Vec<String> {
        output.model.posts().iter().map(|p| p.slug.clone()).collect()
    }

    #[test]
    fn test_posts_and_nested_pages() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        write(&content, "first.md", "---\ntitle: First\ndate: 2024-01-01\n---\nHi");
        write(&content, "pages/about.md", "---\ntitle: About\n---\nMe");

        let mut options = PipelineOptions::new(&content);
        options.pages_root = Some(content.join("pages"));
        let output = build_site(&options).unwrap();

        assert_eq!(order(&output), vec!["first"]);
        assert_eq!(output.model.pages().len(), 1);
        assert_eq!(output.model.pages()[0].slug, "about");
        assert_eq!(output.discovered, 2);
    }

    #[test]
    fn test_partial_failure_isolation() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            write(
                dir.path(),
                &format!("post-{:02}.md", i),
                &format!("---\ntitle: Post {}\ndate: 2024-01-{:02}\n---\nBody", i, i + 1),
            );
        }
        write(dir.path(), "broken.md", "---\ndescription: no title\n---\nBody");

        let output = build_site(&PipelineOptions::new(dir.path())).unwrap();
        assert_eq!(output.model.posts().len(), 10);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].kind, FailureKind::MissingRequiredField);
        assert!(output.failures[0].path.ends_with("broken.md"));
    }

    #[test]
    fn test_draft_exclusion_everywhere() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "draft.md",
            "---\ntitle: Draft\ndate: 2024-05-05\ntags: [secret]\ncategory: hidden\ndraft: true\n---\n",
        );
        write(
            dir.path(),
            "live.md",
            "---\ntitle: Live\ndate: 2024-05-04\ntags: [open]\n---\n",
        );

        let output = build_site(&PipelineOptions::new(dir.path())).unwrap();
        let model = &output.model;
        assert_eq!(order(&output), vec!["live"]);
        assert!(model.tags().get("secret").is_none());
        assert!(model.categories().is_empty());
        assert_eq!(model.archived(2024, Some(5), Some(5)).len(), 0);
        assert_eq!(model.draft_count(), 1);
        assert_eq!(model.published_count(), 1);

        let mut options = PipelineOptions::new(dir.path());
        options.include_drafts = true;
        let output = build_site(&options).unwrap();
        assert_eq!(order(&output), vec!["draft", "live"]);
        assert_eq!(output.model.published_count(), 1);
    }

    #[test]
    fn test_collision_across_directories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "2023/hello.md", "---\ntitle: One\n---\n");
        write(dir.path(), "2024/2024-02-02-hello.md", "---\ntitle: Two\n---\n");

        let err = build_site(&PipelineOptions::new(dir.path())).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("slug `hello`"));
        assert!(message.contains("2023/hello.md"));
        assert!(message.contains("2024-02-02-hello.md"));
    }

    #[test]
    fn test_determinism() {
        let dir = TempDir::new().unwrap();
        for (name, date, tags) in [
            ("a", "2024-01-01", "x, y"),
            ("b", "2024-01-01", "y"),
            ("c", "2023-01-01", "x"),
        ] {
            write(
                dir.path(),
                &format!("{}.md", name),
                &format!("---\ntitle: {}\ndate: {}\ntags: \"{}\"\n---\n", name, date, tags),
            );
        }
        write(dir.path(), "d.md", "---\ntitle: d\n---\n");

        let first = build_site(&PipelineOptions::new(dir.path())).unwrap();
        let second = build_site(&PipelineOptions::new(dir.path())).unwrap();
        assert_eq!(order(&first), order(&second));
        assert_eq!(order(&first), vec!["a", "b", "c", "d"]);
        assert_eq!(first.model.tags(), second.model.tags());
        assert_eq!(first.model.tags().get("x"), Some(&vec![0, 2]));
    }

    #[test]
    fn test_missing_content_root() {
        let dir = TempDir::new().unwrap();
        let err = build_site(&PipelineOptions::new(dir.path().join("missing"))).unwrap_err();
        assert!(matches!(err, PipelineError::Scan(ScanError::RootMissing { .. })));
    }

    #[test]
    fn test_pages_root_containing_content_root() {
        let dir = TempDir::new().unwrap();
        let mut options = PipelineOptions::new(dir.path().join("site/posts"));
        options.pages_root = Some(dir.path().join("site"));
        assert!(matches!(
            build_site(&options),
            Err(PipelineError::RootsOverlap { .. })
        ));
    }

    #[test]
    fn test_nested_pages_spelled_differently() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        fs::create_dir_all(dir.path().join("drafts")).unwrap();
        write(&content, "first.md", "---\ntitle: First\ndate: 2024-01-01\n---\nHi");
        write(&content, "pages/about.md", "---\ntitle: About\n---\nMe");

        let mut options = PipelineOptions::new(dir.path().join("drafts/../content"));
        options.pages_root = Some(content.join("pages"));
        let output = build_site(&options).unwrap();

        assert_eq!(order(&output), vec!["first"]);
        assert_eq!(output.model.pages().len(), 1);
    }

    #[test]
    fn test_passthrough_dirs_are_not_scanned() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "first.md", "---\ntitle: First\n---\nHi");
        write(dir.path(), "extras/README.md", "not a post");
        write(dir.path(), "attachments/notes.md", "not a post either");

        let output = build_site(&PipelineOptions::new(dir.path())).unwrap();
        assert_eq!(order(&output), vec!["first"]);
        assert!(output.failures.is_empty());
    }
}
