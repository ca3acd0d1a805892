//! # inkpress-core
//!
//! Core library for the inkpress blog generator.
//!
//! This crate turns a directory of Markdown files with YAML frontmatter into
//! an in-memory [`SiteModel`]: posts and pages, tag and category indices and
//! a date archive. It also owns the URL layout and the machine-readable
//! outputs (feeds, sitemap, search index) derived from the model.

pub mod config;
pub mod dates;
pub mod entry;
pub mod feed;
pub mod frontmatter;
pub mod markdown;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod scanner;
pub mod search;
pub mod site;
pub mod slug;

pub use config::Config;
pub use entry::{EntryBuilder, EntryError, SiteDefaults};
pub use frontmatter::{parse_frontmatter, Frontmatter, FrontmatterError};
pub use markdown::MarkdownRenderer;
pub use models::{Entry, EntryKind, Failure, FailureKind, Page, Post, SiteModel};
pub use pipeline::{build_site, build_site_with, BuildOutput, PipelineError, PipelineOptions};
pub use search::{build_search_index, SearchEntry};
pub use slug::{derive_slug, slugify};
