//! Content model: posts, pages, per-file failures and the assembled site.

use crate::markdown::truncate_words;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Words per minute used for reading time
pub const WORDS_PER_MINUTE: usize = 200;

/// Which kind of entity a source file produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Post,
    Page,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Post => "post",
            EntryKind::Page => "page",
        }
    }
}

/// A chronological blog post
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub title: String,

    /// URL path segment, unique across posts and pages
    pub slug: String,

    /// Publication timestamp; undated posts sort last and are not archived
    pub date: Option<DateTime<FixedOffset>>,

    pub modified: Option<DateTime<FixedOffset>>,

    /// Normalized (lowercase, trimmed, deduplicated) in first-seen order
    pub tags: Vec<String>,

    pub category: Option<String>,

    pub author: Option<String>,

    pub draft: bool,

    /// Raw Markdown body, frontmatter stripped
    pub content: String,

    /// Rendered HTML body
    pub html: String,

    /// Description from frontmatter
    pub description: Option<String>,

    /// Plain text of the first paragraph
    pub excerpt: Option<String>,

    pub word_count: usize,

    pub reading_minutes: usize,

    pub cover: Option<String>,
    pub twitter_creator: Option<String>,
    pub twitter_site: Option<String>,

    /// File this post was built from (diagnostics only)
    pub source_path: PathBuf,
}

impl Post {
    /// Frontmatter description, or the first paragraph truncated to
    /// `max_chars`.
    pub fn summary(&self, max_chars: usize) -> Option<String> {
        summary(&self.description, &self.excerpt, max_chars)
    }

    pub fn is_dated(&self) -> bool {
        self.date.is_some()
    }
}

/// A static, non-chronological page
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub title: String,
    pub slug: String,
    pub modified: Option<DateTime<FixedOffset>>,
    pub author: Option<String>,
    pub draft: bool,
    pub content: String,
    pub html: String,
    pub description: Option<String>,
    pub excerpt: Option<String>,
    pub cover: Option<String>,
    pub twitter_creator: Option<String>,
    pub twitter_site: Option<String>,
    pub source_path: PathBuf,
}

impl Page {
    pub fn summary(&self, max_chars: usize) -> Option<String> {
        summary(&self.description, &self.excerpt, max_chars)
    }
}

fn summary(
    description: &Option<String>,
    excerpt: &Option<String>,
    max_chars: usize,
) -> Option<String> {
    description
        .clone()
        .or_else(|| excerpt.as_deref().map(|e| truncate_words(e, max_chars)))
}

/// Reading time in whole minutes, at least one when there is any text.
pub fn reading_minutes(word_count: usize) -> usize {
    word_count.div_ceil(WORDS_PER_MINUTE)
}

/// A built entity, kind resolved once at scan time
#[derive(Debug, Clone)]
pub enum Entry {
    Post(Post),
    Page(Page),
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Post(_) => EntryKind::Post,
            Entry::Page(_) => EntryKind::Page,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Entry::Post(p) => &p.slug,
            Entry::Page(p) => &p.slug,
        }
    }

    pub fn is_draft(&self) -> bool {
        match self {
            Entry::Post(p) => p.draft,
            Entry::Page(p) => p.draft,
        }
    }

    pub fn source_path(&self) -> &Path {
        match self {
            Entry::Post(p) => &p.source_path,
            Entry::Page(p) => &p.source_path,
        }
    }
}

/// Category of a file-local failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingRequiredField,
    InvalidDateFormat,
    MalformedFrontmatter,
    SlugDerivation,
    InvalidField,
    Unreadable,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingRequiredField => "missing_required_field",
            FailureKind::InvalidDateFormat => "invalid_date_format",
            FailureKind::MalformedFrontmatter => "malformed_frontmatter",
            FailureKind::SlugDerivation => "slug_derivation",
            FailureKind::InvalidField => "invalid_field",
            FailureKind::Unreadable => "unreadable",
        }
    }
}

/// A source file that was excluded from the site model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.path.display(),
            self.kind.as_str(),
            self.message
        )
    }
}

/// Posts of one calendar month, with per-day buckets
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveMonth {
    pub posts: Vec<usize>,
    pub days: BTreeMap<u32, Vec<usize>>,
}

/// Posts of one calendar year, with per-month buckets
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveYear {
    pub posts: Vec<usize>,
    pub months: BTreeMap<u32, ArchiveMonth>,
}

/// Year → month → day buckets of indices into [`SiteModel::posts`]
pub type Archive = BTreeMap<i32, ArchiveYear>;

/// The assembled, read-only model of one build.
///
/// Tag, category and archive buckets hold indices into `posts`, so every
/// bucket shares the global chronological order.
#[derive(Debug, Clone)]
pub struct SiteModel {
    pub(crate) posts: Vec<Post>,
    pub(crate) pages: Vec<Page>,
    pub(crate) tags: BTreeMap<String, Vec<usize>>,
    pub(crate) categories: BTreeMap<String, Vec<usize>>,
    pub(crate) archive: Archive,
    pub(crate) draft_count: usize,
    pub(crate) published_count: usize,
    pub(crate) site_offset: FixedOffset,
}

impl SiteModel {
    /// Posts, newest first, undated last
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Pages, ordered by slug
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn tags(&self) -> &BTreeMap<String, Vec<usize>> {
        &self.tags
    }

    pub fn categories(&self) -> &BTreeMap<String, Vec<usize>> {
        &self.categories
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn draft_count(&self) -> usize {
        self.draft_count
    }

    pub fn published_count(&self) -> usize {
        self.published_count
    }

    /// Timezone the archive was bucketed in
    pub fn site_offset(&self) -> FixedOffset {
        self.site_offset
    }

    /// Resolve a bucket of indices to posts
    pub fn resolve<'a>(&'a self, bucket: &'a [usize]) -> impl Iterator<Item = &'a Post> + 'a {
        bucket.iter().filter_map(move |&i| self.posts.get(i))
    }

    pub fn posts_tagged(&self, tag: &str) -> Vec<&Post> {
        self.tags
            .get(tag)
            .map(|bucket| self.resolve(bucket).collect())
            .unwrap_or_default()
    }

    pub fn posts_in_category(&self, category: &str) -> Vec<&Post> {
        self.categories
            .get(category)
            .map(|bucket| self.resolve(bucket).collect())
            .unwrap_or_default()
    }

    /// Posts in an archive bucket. `month`/`day` narrow the bucket.
    pub fn archived(&self, year: i32, month: Option<u32>, day: Option<u32>) -> Vec<&Post> {
        let Some(y) = self.archive.get(&year) else {
            return Vec::new();
        };
        let bucket = match (month, day) {
            (None, _) => Some(&y.posts),
            (Some(m), None) => y.months.get(&m).map(|mb| &mb.posts),
            (Some(m), Some(d)) => y.months.get(&m).and_then(|mb| mb.days.get(&d)),
        };
        bucket
            .map(|b| self.resolve(b).collect())
            .unwrap_or_default()
    }

    /// Neighbours of the post at `index`: (newer, older)
    pub fn neighbours(&self, index: usize) -> (Option<&Post>, Option<&Post>) {
        let newer = index.checked_sub(1).and_then(|i| self.posts.get(i));
        let older = self.posts.get(index + 1);
        (newer, older)
    }
}
