//! Content entity building: one raw document in, one `Post` or `Page` out.

use crate::dates::{parse_timestamp, DateError};
use crate::frontmatter::{parse_frontmatter, FieldError, Frontmatter, FrontmatterError};
use crate::markdown::{first_paragraph, html_to_text, word_count, MarkdownRenderer};
use crate::models::{reading_minutes, Entry, EntryKind, Failure, FailureKind, Page, Post};
use crate::slug::{derive_slug, SlugError};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Site-wide defaults applied while building entities
#[derive(Debug, Clone)]
pub struct SiteDefaults {
    pub default_author: Option<String>,
    /// Offset recorded on timestamps that carry none
    pub site_offset: FixedOffset,
}

impl Default for SiteDefaults {
    fn default() -> Self {
        Self {
            default_author: None,
            site_offset: Utc.fix(),
        }
    }
}

/// Why a single file was excluded. Every variant carries the source path.
#[derive(Error, Debug)]
pub enum EntryError {
    #[error("missing required field `{field}`")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("invalid `{field}` value: {error}")]
    InvalidDate {
        path: PathBuf,
        field: &'static str,
        #[source]
        error: DateError,
    },

    #[error("{error}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        error: FrontmatterError,
    },

    #[error("{error}")]
    Slug {
        path: PathBuf,
        #[source]
        error: SlugError,
    },

    #[error("{error}")]
    InvalidField {
        path: PathBuf,
        #[source]
        error: FieldError,
    },

    #[error("cannot read file: {error}")]
    Unreadable {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl EntryError {
    pub fn path(&self) -> &Path {
        match self {
            EntryError::MissingField { path, .. }
            | EntryError::InvalidDate { path, .. }
            | EntryError::Frontmatter { path, .. }
            | EntryError::Slug { path, .. }
            | EntryError::InvalidField { path, .. }
            | EntryError::Unreadable { path, .. } => path,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            EntryError::MissingField { .. } => FailureKind::MissingRequiredField,
            EntryError::InvalidDate { .. } => FailureKind::InvalidDateFormat,
            EntryError::Frontmatter { .. } => FailureKind::MalformedFrontmatter,
            EntryError::Slug { .. } => FailureKind::SlugDerivation,
            EntryError::InvalidField { .. } => FailureKind::InvalidField,
            EntryError::Unreadable { .. } => FailureKind::Unreadable,
        }
    }

    pub fn into_failure(self) -> Failure {
        Failure {
            path: self.path().to_path_buf(),
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// A discovered source file, read but not yet parsed
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub path: PathBuf,
    /// Path relative to the root it was found under
    pub rel_path: PathBuf,
    pub text: String,
}

impl RawDocument {
    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Fields shared by posts and pages
struct Common {
    title: String,
    slug: String,
    modified: Option<DateTime<FixedOffset>>,
    author: Option<String>,
    draft: bool,
    description: Option<String>,
    cover: Option<String>,
    twitter_creator: Option<String>,
    twitter_site: Option<String>,
}

/// Builds entities from raw documents. Holds no per-file state.
pub struct EntryBuilder<'a> {
    defaults: &'a SiteDefaults,
    renderer: &'a MarkdownRenderer,
}

impl<'a> EntryBuilder<'a> {
    pub fn new(defaults: &'a SiteDefaults, renderer: &'a MarkdownRenderer) -> Self {
        Self { defaults, renderer }
    }

    /// Build a `Post` or `Page` from `doc`.
    pub fn build(&self, doc: &RawDocument, kind: EntryKind) -> Result<Entry, EntryError> {
        let path = &doc.path;
        let origin = doc.rel_path.display().to_string();
        let (fm, body) =
            parse_frontmatter(&doc.text, &origin).map_err(|error| EntryError::Frontmatter {
                path: path.clone(),
                error,
            })?;

        let common = self.common_fields(doc, &fm)?;
        let html = self.renderer.render(&body);
        let excerpt = first_paragraph(&body);

        let entry = match kind {
            EntryKind::Post => {
                let date = self.timestamp(&fm, "date", path)?;
                let tags = normalize_tags(fm.string_list("tags").map_err(invalid(path))?);
                let category = fm
                    .string("category")
                    .map_err(invalid(path))?
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty());
                let words = word_count(&html_to_text(&html));

                Entry::Post(Post {
                    title: common.title,
                    slug: common.slug,
                    date,
                    modified: common.modified,
                    tags,
                    category,
                    author: common.author,
                    draft: common.draft,
                    content: body,
                    html,
                    description: common.description,
                    excerpt,
                    word_count: words,
                    reading_minutes: reading_minutes(words),
                    cover: common.cover,
                    twitter_creator: common.twitter_creator,
                    twitter_site: common.twitter_site,
                    source_path: path.clone(),
                })
            }
            EntryKind::Page => Entry::Page(Page {
                title: common.title,
                slug: common.slug,
                modified: common.modified,
                author: common.author,
                draft: common.draft,
                content: body,
                html,
                description: common.description,
                excerpt,
                cover: common.cover,
                twitter_creator: common.twitter_creator,
                twitter_site: common.twitter_site,
                source_path: path.clone(),
            }),
        };

        Ok(entry)
    }

    fn common_fields(&self, doc: &RawDocument, fm: &Frontmatter) -> Result<Common, EntryError> {
        let path = &doc.path;

        let title = optional_text(fm, "title", path)?.ok_or_else(|| EntryError::MissingField {
            path: path.clone(),
            field: "title",
        })?;

        let slug = derive_slug(&doc.file_name(), &doc.rel_path).map_err(|error| {
            EntryError::Slug {
                path: path.clone(),
                error,
            }
        })?;

        let author =
            optional_text(fm, "author", path)?.or_else(|| self.defaults.default_author.clone());

        Ok(Common {
            title,
            slug,
            modified: self.timestamp(fm, "modified", path)?,
            author,
            draft: fm.boolean("draft").map_err(invalid(path))?.unwrap_or(false),
            description: optional_text(fm, "description", path)?,
            cover: optional_text(fm, "cover", path)?,
            twitter_creator: optional_text(fm, "twitter_creator", path)?,
            twitter_site: optional_text(fm, "twitter_site", path)?,
        })
    }

    fn timestamp(
        &self,
        fm: &Frontmatter,
        field: &'static str,
        path: &Path,
    ) -> Result<Option<DateTime<FixedOffset>>, EntryError> {
        let Some(raw) = optional_text(fm, field, path)? else {
            return Ok(None);
        };
        parse_timestamp(&raw, self.defaults.site_offset)
            .map(Some)
            .map_err(|error| EntryError::InvalidDate {
                path: path.to_path_buf(),
                field,
                error,
            })
    }
}

fn invalid(path: &Path) -> impl Fn(FieldError) -> EntryError + '_ {
    move |error| EntryError::InvalidField {
        path: path.to_path_buf(),
        error,
    }
}

/// A trimmed string field; blank counts as absent.
fn optional_text(fm: &Frontmatter, key: &str, path: &Path) -> Result<Option<String>, EntryError> {
    Ok(fm
        .string(key)
        .map_err(invalid(path))?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Trim, lowercase, drop empties and de-duplicate, keeping first-seen order.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
