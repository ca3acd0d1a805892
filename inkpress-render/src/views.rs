//! Turns routes of the site model into rendered HTML pages.

use crate::templates::{
    ArchiveMonthView, ArchiveTemplate, ArchiveYearView, CloudEntry, ListingTemplate, NavLink,
    NotFoundTemplate, PageTemplate, Pager, PostCard, PostTemplate, SearchTemplate, SiteContext,
    TermLink, TermsTemplate,
};
use askama::Template;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use inkpress_core::config::Config;
use inkpress_core::dates::site_date;
use inkpress_core::models::{Page, Post, SiteModel};
use inkpress_core::routes::{
    absolute_url, archive_url, category_feed_base, index_url, page_url, paginate, post_url,
    term_url, Route, RouteKind, TermKind,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Characters of excerpt shown in listings when a post has no description
pub const SUMMARY_CHARS: usize = 200;

const MIN_FONT_EM: f64 = 1.0;
const MAX_FONT_EM: f64 = 2.5;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to render {url}: {error}")]
    Template {
        url: String,
        #[source]
        error: askama::Error,
    },

    #[error("Route {url} refers to content missing from the site model")]
    DanglingRoute { url: String },
}

impl SiteContext {
    /// Site context from configuration. The footer year is the newest
    /// post's year; a site without dated posts shows none.
    pub fn from_config(config: &Config, model: &SiteModel) -> Self {
        let offset = model.site_offset();
        let year = model
            .posts()
            .iter()
            .find_map(|p| p.date.as_ref())
            .map(|d| site_date(d, offset).year());

        Self {
            title: config.site.title.clone(),
            subtitle: config.site.subtitle.clone(),
            description: config.site.description.clone(),
            author: config.site.author.clone(),
            keywords: config.site.keywords.join(", "),
            url: config.normalized_site_url(),
            with_search: config.build.with_search,
            year,
            pages: model
                .pages()
                .iter()
                .map(|page| NavLink {
                    url: page_url(page),
                    title: page.title.clone(),
                })
                .collect(),
        }
    }
}

/// Renders any [`Route`] of one site model.
pub struct SiteRenderer<'a> {
    model: &'a SiteModel,
    site: SiteContext,
    posts_per_page: usize,
}

impl<'a> SiteRenderer<'a> {
    pub fn new(model: &'a SiteModel, site: SiteContext, posts_per_page: usize) -> Self {
        Self {
            model,
            site,
            posts_per_page,
        }
    }

    /// Render one route to a complete HTML document
    pub fn render(&self, route: &Route) -> Result<String, RenderError> {
        let url = route.url.as_str();
        let rendered = match &route.kind {
            RouteKind::Post(index) => self.post_page(url, *index)?.render(),
            RouteKind::Page(index) => self.static_page(url, *index)?.render(),
            RouteKind::Index { page, total } => {
                let posts: Vec<&Post> = self.model.posts().iter().collect();
                self.listing(url, None, None, &posts, *page, *total, index_url)
                    .render()
            }
            RouteKind::Archive => self.archive_page(url).render(),
            RouteKind::DateArchive {
                year,
                month,
                day,
                page,
                total,
            } => {
                let (year, month, day) = (*year, *month, *day);
                let posts = self.model.archived(year, month, day);
                let heading = archive_heading(year, month, day);
                self.listing(url, Some(heading), None, &posts, *page, *total, |n| {
                    archive_url(year, month, day, n)
                })
                .render()
            }
            RouteKind::Term {
                kind,
                term,
                page,
                total,
            } => {
                let (posts, heading, feed) = match kind {
                    TermKind::Tag => (
                        self.model.posts_tagged(term),
                        format!("Posts tagged \"{}\"", term),
                        None,
                    ),
                    TermKind::Category => (
                        self.model.posts_in_category(term),
                        format!("Posts in \"{}\"", term),
                        Some(category_feed_base(term)),
                    ),
                };
                let kind = *kind;
                self.listing(url, Some(heading), feed, &posts, *page, *total, |n| {
                    term_url(kind, term, n)
                })
                .render()
            }
            RouteKind::Terms(kind) => self.terms_page(url, *kind).render(),
            RouteKind::Search => SearchTemplate {
                site: self.site.clone(),
                page_title: format!("Search - {}", self.site.title),
                meta_description: self.site.description.clone(),
                canonical: self.canonical(url),
            }
            .render(),
            RouteKind::NotFound => NotFoundTemplate {
                site: self.site.clone(),
                page_title: format!("Page not found - {}", self.site.title),
                meta_description: self.site.description.clone(),
                canonical: self.canonical(url),
            }
            .render(),
        };

        tracing::debug!("Rendered {}", url);
        rendered.map_err(|error| RenderError::Template {
            url: url.to_string(),
            error,
        })
    }

    fn post_page(&self, url: &str, index: usize) -> Result<PostTemplate, RenderError> {
        let post = self.model.posts().get(index).ok_or_else(|| dangling(url))?;
        let (newer, older) = self.model.neighbours(index);
        let offset = self.model.site_offset();
        let link = |p: &Post| NavLink {
            url: post_url(p, offset),
            title: p.title.clone(),
        };

        Ok(PostTemplate {
            site: self.site.clone(),
            page_title: format!("{} - {}", post.title, self.site.title),
            meta_description: post
                .summary(SUMMARY_CHARS)
                .unwrap_or_else(|| self.site.description.clone()),
            canonical: self.canonical(url),
            post: self.card(post),
            author: post.author.clone(),
            cover: post.cover.clone(),
            twitter_creator: post.twitter_creator.clone(),
            twitter_site: post.twitter_site.clone(),
            content: post.html.clone(),
            newer: newer.map(&link),
            older: older.map(&link),
        })
    }

    fn static_page(&self, url: &str, index: usize) -> Result<PageTemplate, RenderError> {
        let page: &Page = self.model.pages().get(index).ok_or_else(|| dangling(url))?;
        Ok(PageTemplate {
            site: self.site.clone(),
            page_title: format!("{} - {}", page.title, self.site.title),
            meta_description: page
                .summary(SUMMARY_CHARS)
                .unwrap_or_else(|| self.site.description.clone()),
            canonical: self.canonical(url),
            title: page.title.clone(),
            cover: page.cover.clone(),
            content: page.html.clone(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn listing(
        &self,
        url: &str,
        heading: Option<String>,
        feed_url: Option<String>,
        posts: &[&Post],
        page: usize,
        total: usize,
        url_for: impl Fn(usize) -> String,
    ) -> ListingTemplate {
        let chunks = paginate(posts, self.posts_per_page);
        let cards: Vec<PostCard> = chunks
            .get(page.saturating_sub(1))
            .map(|chunk| chunk.iter().map(|p| self.card(p)).collect())
            .unwrap_or_default();

        let page_title = match (&heading, page) {
            (Some(h), 1) => format!("{} - {}", h, self.site.title),
            (Some(h), n) => format!("{} (page {}) - {}", h, n, self.site.title),
            (None, 1) => self.site.title.clone(),
            (None, n) => format!("{} (page {})", self.site.title, n),
        };

        let pager = (total > 1).then(|| Pager {
            current: page,
            total,
            newer_url: (page > 1).then(|| url_for(page - 1)),
            older_url: (page < total).then(|| url_for(page + 1)),
        });

        ListingTemplate {
            site: self.site.clone(),
            page_title,
            meta_description: self.site.description.clone(),
            canonical: self.canonical(url),
            heading,
            posts: cards,
            pager,
            feed_url,
        }
    }

    fn archive_page(&self, url: &str) -> ArchiveTemplate {
        let years = self
            .model
            .archive()
            .iter()
            .rev()
            .map(|(&year, bucket)| ArchiveYearView {
                year,
                url: archive_url(year, None, None, 1),
                months: bucket
                    .months
                    .iter()
                    .rev()
                    .map(|(&month, month_bucket)| ArchiveMonthView {
                        label: month_name(year, month),
                        url: archive_url(year, Some(month), None, 1),
                        posts: self
                            .model
                            .resolve(&month_bucket.posts)
                            .map(|p| self.card(p))
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        let undated = self
            .model
            .posts()
            .iter()
            .filter(|p| !p.is_dated())
            .map(|p| self.card(p))
            .collect();

        ArchiveTemplate {
            site: self.site.clone(),
            page_title: format!("Archive - {}", self.site.title),
            meta_description: self.site.description.clone(),
            canonical: self.canonical(url),
            years,
            undated,
        }
    }

    fn terms_page(&self, url: &str, kind: TermKind) -> TermsTemplate {
        let (index, heading) = match kind {
            TermKind::Tag => (self.model.tags(), "Tags"),
            TermKind::Category => (self.model.categories(), "Categories"),
        };

        TermsTemplate {
            site: self.site.clone(),
            page_title: format!("{} - {}", heading, self.site.title),
            meta_description: self.site.description.clone(),
            canonical: self.canonical(url),
            heading: heading.to_string(),
            terms: term_cloud(kind, index),
        }
    }

    fn card(&self, post: &Post) -> PostCard {
        let offset = self.model.site_offset();
        PostCard {
            url: post_url(post, offset),
            title: post.title.clone(),
            date: post.date.as_ref().map(|d| format_date(d, offset)),
            datetime: post.date.as_ref().map(|d| d.to_rfc3339()),
            summary: post.summary(SUMMARY_CHARS),
            tags: post
                .tags
                .iter()
                .map(|t| term_link(TermKind::Tag, t))
                .collect(),
            category: post
                .category
                .as_deref()
                .map(|c| term_link(TermKind::Category, c)),
            reading_minutes: post.reading_minutes,
            draft: post.draft,
        }
    }

    fn canonical(&self, url: &str) -> String {
        absolute_url(&self.site.url, url)
    }
}

fn dangling(url: &str) -> RenderError {
    RenderError::DanglingRoute {
        url: url.to_string(),
    }
}

fn term_link(kind: TermKind, term: &str) -> TermLink {
    TermLink {
        name: term.to_string(),
        url: term_url(kind, term, 1),
    }
}

/// Cloud entries in term order, font size scaled by post count
pub fn term_cloud(kind: TermKind, index: &BTreeMap<String, Vec<usize>>) -> Vec<CloudEntry> {
    let min = index.values().map(Vec::len).min().unwrap_or(0);
    let max = index.values().map(Vec::len).max().unwrap_or(0);

    index
        .iter()
        .map(|(term, bucket)| CloudEntry {
            name: term.clone(),
            url: term_url(kind, term, 1),
            count: bucket.len(),
            font_size: format!("{:.2}em", cloud_font_size(bucket.len(), min, max)),
        })
        .collect()
}

/// Linear interpolation between 1.0em and 2.5em; the midpoint when every
/// term has the same count.
pub fn cloud_font_size(count: usize, min: usize, max: usize) -> f64 {
    if max <= min {
        return (MIN_FONT_EM + MAX_FONT_EM) / 2.0;
    }
    let ratio = (count.saturating_sub(min)) as f64 / (max - min) as f64;
    MIN_FONT_EM + ratio * (MAX_FONT_EM - MIN_FONT_EM)
}

fn format_date(date: &DateTime<FixedOffset>, offset: FixedOffset) -> String {
    date.with_timezone(&offset).format("%B %d, %Y").to_string()
}

fn month_name(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B").to_string())
        .unwrap_or_else(|| format!("{:02}", month))
}

fn archive_heading(year: i32, month: Option<u32>, day: Option<u32>) -> String {
    let date = match (month, day) {
        (Some(m), Some(d)) => NaiveDate::from_ymd_opt(year, m, d).map(|n| n.format("%B %d, %Y")),
        (Some(m), None) => NaiveDate::from_ymd_opt(year, m, 1).map(|n| n.format("%B %Y")),
        (None, _) => None,
    };
    match date {
        Some(formatted) => format!("Posts from {}", formatted),
        None => format!("Posts from {}", year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpress_core::pipeline::{build_site, BuildOutput, PipelineOptions};
    use inkpress_core::routes::site_routes;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn context() -> SiteContext {
        SiteContext {
            title: "Field Notes".to_string(),
            subtitle: String::new(),
            description: "Notes from the field".to_string(),
            author: Some("Jane".to_string()),
            keywords: String::new(),
            url: "https://blog.dev".to_string(),
            with_search: true,
            year: Some(2024),
            pages: vec![NavLink {
                url: "/about.html".to_string(),
                title: "About".to_string(),
            }],
        }
    }

    fn build(dir: &TempDir) -> BuildOutput {
        let content = dir.path().join("posts");
        write(
            &content,
            "first.md",
            "---\ntitle: First <Post>\ndate: 2024-01-01\ntags: [rust]\ncategory: Code\n---\nHello **world**.",
        );
        write(
            &content,
            "second.md",
            "---\ntitle: Second\ndate: 2024-02-01\ntags: [rust, web]\n---\nMore text.",
        );
        write(&content, "third.md", "---\ntitle: Third\ndate: 2024-02-03\n---\nLast.");
        write(&dir.path().join("pages"), "about.md", "---\ntitle: About\n---\nMe.");

        let mut options = PipelineOptions::new(&content);
        options.pages_root = Some(dir.path().join("pages"));
        build_site(&options).unwrap()
    }

    fn render_url(model: &SiteModel, url: &str) -> String {
        let routes = site_routes(model, 2, true);
        let route = routes.iter().find(|r| r.url == url).unwrap();
        SiteRenderer::new(model, context(), 2).render(route).unwrap()
    }

    #[test]
    fn test_post_page() {
        let dir = TempDir::new().unwrap();
        let output = build(&dir);
        let html = render_url(&output.model, "/2024/02/01/second.html");

        assert!(html.contains("<title>Second - Field Notes</title>"));
        assert!(html.contains("<p>More text.</p>"));
        assert!(html.contains("href=\"/2024/02/03/third.html\""));
        assert!(html.contains("href=\"/2024/01/01/first.html\">First &#60;Post&#62; &rarr;"));
        assert!(!html.contains("First <Post>"));
        assert!(html.contains("<link rel=\"canonical\" href=\"https://blog.dev/2024/02/01/second.html\">"));
        assert!(html.contains("<a href=\"/about.html\">About</a>"));
        assert!(html.contains("February 01, 2024"));
    }

    #[test]
    fn test_index_pagination() {
        let dir = TempDir::new().unwrap();
        let output = build(&dir);

        let first = render_url(&output.model, "/index.html");
        assert!(first.contains("Third"));
        assert!(first.contains("Second"));
        assert!(!first.contains("First &#60;Post&#62;"));
        assert!(first.contains("Page 1 of 2"));
        assert!(first.contains("href=\"/page/2.html\""));

        let second = render_url(&output.model, "/page/2.html");
        assert!(second.contains("First &#60;Post&#62;"));
        assert!(second.contains("href=\"/index.html\">&larr; Newer"));
    }

    #[test]
    fn test_term_and_terms_pages() {
        let dir = TempDir::new().unwrap();
        let output = build(&dir);

        let tag = render_url(&output.model, "/tag/rust.html");
        assert!(tag.contains("Posts tagged"));
        assert!(tag.contains("href=\"/2024/02/01/second.html\""));

        let category = render_url(&output.model, "/category/code.html");
        assert!(category.contains("href=\"/category/code/feed.rss\""));

        let tags = render_url(&output.model, "/tags.html");
        assert!(tags.contains("font-size: 2.50em\">rust</a>"));
        assert!(tags.contains("font-size: 1.00em\">web</a>"));
    }

    #[test]
    fn test_archive_and_static_pages() {
        let dir = TempDir::new().unwrap();
        let output = build(&dir);

        let archive = render_url(&output.model, "/archive.html");
        let feb = archive.find("February").unwrap();
        let jan = archive.find("January").unwrap();
        assert!(feb < jan);

        let day = render_url(&output.model, "/2024/02/03/index.html");
        assert!(day.contains("Posts from February 03, 2024"));

        let about = render_url(&output.model, "/about.html");
        assert!(about.contains("<h1>About</h1>"));

        let missing = render_url(&output.model, "/404.html");
        assert!(missing.contains("Page not found"));
        let search = render_url(&output.model, "/search.html");
        assert!(search.contains("/static/search.js"));
    }

    #[test]
    fn test_dangling_route() {
        let dir = TempDir::new().unwrap();
        let output = build(&dir);
        let route = Route {
            url: "/gone.html".to_string(),
            kind: RouteKind::Post(99),
        };
        let err = SiteRenderer::new(&output.model, context(), 2)
            .render(&route)
            .unwrap_err();
        assert!(matches!(err, RenderError::DanglingRoute { .. }));
    }

    #[test]
    fn test_cloud_font_size() {
        assert_eq!(cloud_font_size(3, 3, 3), 1.75);
        assert_eq!(cloud_font_size(1, 1, 5), 1.0);
        assert_eq!(cloud_font_size(5, 1, 5), 2.5);
        insta::assert_snapshot!(format!("{:.2}", cloud_font_size(3, 1, 5)), @"1.75");
    }

    #[test]
    fn test_footer_year_comes_from_content() {
        let dir = TempDir::new().unwrap();
        let output = build(&dir);
        let config =
            Config::from_yaml("site:\n  title: Field Notes\npaths:\n  content: posts\n").unwrap();
        assert_eq!(SiteContext::from_config(&config, &output.model).year, Some(2024));

        let undated = dir.path().join("undated");
        write(&undated, "note.md", "---\ntitle: Note\n---\nBody.");
        let output = build_site(&PipelineOptions::new(&undated)).unwrap();
        let site = SiteContext::from_config(&config, &output.model);
        assert_eq!(site.year, None);

        let routes = site_routes(&output.model, 2, false);
        let html = SiteRenderer::new(&output.model, site, 2)
            .render(&routes[0])
            .unwrap();
        assert!(!html.contains("&copy;"));
    }
}
