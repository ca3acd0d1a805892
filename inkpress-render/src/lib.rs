//! # inkpress-render
//!
//! HTML rendering for inkpress sites.
//!
//! This crate turns routes of an assembled site model into HTML pages
//! using Askama templates.

pub mod templates;
pub mod views;

pub use templates::{
    NavLink, NotFoundTemplate, PageTemplate, PostCard, PostTemplate, SiteContext, TermLink,
};
pub use views::{cloud_font_size, term_cloud, RenderError, SiteRenderer};
