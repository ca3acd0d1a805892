//! Askama template definitions.

use askama::Template;

/// A link in the navigation bar or between posts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub url: String,
    pub title: String,
}

/// A tag or category, linked to its listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermLink {
    pub name: String,
    pub url: String,
}

/// Site-wide values every page needs
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: Option<String>,
    /// Comma-separated, empty when unset
    pub keywords: String,
    /// Normalized absolute base URL, empty when unset
    pub url: String,
    pub with_search: bool,
    /// Copyright year in the footer, from the newest dated post
    pub year: Option<i32>,
    /// Static pages, linked from the navigation
    pub pages: Vec<NavLink>,
}

/// A post as shown in listings and on its own page
#[derive(Debug, Clone)]
pub struct PostCard {
    pub url: String,
    pub title: String,
    /// Human-readable date, e.g. "March 02, 2024"
    pub date: Option<String>,
    /// RFC 3339 date for `<time datetime>`
    pub datetime: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<TermLink>,
    pub category: Option<TermLink>,
    pub reading_minutes: usize,
    pub draft: bool,
}

/// Links between the pages of a paginated listing
#[derive(Debug, Clone)]
pub struct Pager {
    pub current: usize,
    pub total: usize,
    pub newer_url: Option<String>,
    pub older_url: Option<String>,
}

/// One term in a tag or category cloud
#[derive(Debug, Clone)]
pub struct CloudEntry {
    pub name: String,
    pub url: String,
    pub count: usize,
    /// CSS font size, e.g. `1.75em`
    pub font_size: String,
}

#[derive(Debug, Clone)]
pub struct ArchiveMonthView {
    pub label: String,
    pub url: String,
    pub posts: Vec<PostCard>,
}

#[derive(Debug, Clone)]
pub struct ArchiveYearView {
    pub year: i32,
    pub url: String,
    pub months: Vec<ArchiveMonthView>,
}

/// Blog post template
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub site: SiteContext,
    pub page_title: String,
    pub meta_description: String,
    pub canonical: String,

    pub post: PostCard,
    pub author: Option<String>,
    pub cover: Option<String>,
    pub twitter_creator: Option<String>,
    pub twitter_site: Option<String>,
    pub content: String,

    // Previous/next navigation
    pub newer: Option<NavLink>,
    pub older: Option<NavLink>,
}

/// Static page template
#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub site: SiteContext,
    pub page_title: String,
    pub meta_description: String,
    pub canonical: String,

    pub title: String,
    pub cover: Option<String>,
    pub content: String,
}

/// Front page, date archive and term listings
#[derive(Template)]
#[template(path = "listing.html")]
pub struct ListingTemplate {
    pub site: SiteContext,
    pub page_title: String,
    pub meta_description: String,
    pub canonical: String,

    pub heading: Option<String>,
    pub posts: Vec<PostCard>,
    pub pager: Option<Pager>,
    /// Category feed, for category listings
    pub feed_url: Option<String>,
}

/// Full archive grouped by year and month
#[derive(Template)]
#[template(path = "archive.html")]
pub struct ArchiveTemplate {
    pub site: SiteContext,
    pub page_title: String,
    pub meta_description: String,
    pub canonical: String,

    pub years: Vec<ArchiveYearView>,
    pub undated: Vec<PostCard>,
}

/// Tag or category cloud
#[derive(Template)]
#[template(path = "terms.html")]
pub struct TermsTemplate {
    pub site: SiteContext,
    pub page_title: String,
    pub meta_description: String,
    pub canonical: String,

    pub heading: String,
    pub terms: Vec<CloudEntry>,
}

/// Client-side search page
#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub site: SiteContext,
    pub page_title: String,
    pub meta_description: String,
    pub canonical: String,
}

/// 404 error page template
#[derive(Template)]
#[template(path = "404.html")]
pub struct NotFoundTemplate {
    pub site: SiteContext,
    pub page_title: String,
    pub meta_description: String,
    pub canonical: String,
}
