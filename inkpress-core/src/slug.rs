//! Slug generation and filename-based slug derivation.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("cannot derive a slug from file name {file_name:?} at {rel_path}")]
    Empty { file_name: String, rel_path: String },
}

static DATE_PREFIX_REGEX: OnceLock<Regex> = OnceLock::new();

fn date_prefix_regex() -> &'static Regex {
    DATE_PREFIX_REGEX.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}-").unwrap())
}

/// Convert a string to a URL-safe slug
///
/// Rules:
/// - Lowercase
/// - Runs of non-alphanumeric characters become a single hyphen
/// - No leading or trailing hyphens
///
/// Unicode letters and digits are kept as-is (lowercased).
///
/// # Examples
///
/// ```
/// use inkpress_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Rust & Safety"), "rust-safety");
/// assert_eq!(slugify("Node.js Tips"), "node-js-tips");
/// ```
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for grapheme in input.graphemes(true) {
        let keep = grapheme
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric());

        if keep {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push_str(&grapheme.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Remove a leading `YYYY-MM-DD-` prefix, if present.
///
/// The prefix is only cosmetic: it never supplies a post's date.
pub fn strip_date_prefix(stem: &str) -> &str {
    match date_prefix_regex().find(stem) {
        Some(m) => &stem[m.end()..],
        None => stem,
    }
}

/// Derive the slug for a content file.
///
/// `file_name` is the bare file name (extension included); `rel_path` is its
/// path relative to the content root and only appears in errors. Uniqueness
/// across the tree is checked later, when the site model is assembled.
pub fn derive_slug(file_name: &str, rel_path: &Path) -> Result<String, SlugError> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let slug = slugify(strip_date_prefix(stem));
    if slug.is_empty() {
        return Err(SlugError::Empty {
            file_name: file_name.to_string(),
            rel_path: rel_path.display().to_string(),
        });
    }

    Ok(slug)
}

/// Slug for a tag or category term, used in listing and feed URLs.
pub fn term_slug(term: &str) -> String {
    let slug = slugify(term);
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}
