//! URL layout of the generated site.
//!
//! Every URL is site-relative and starts with `/`. [`output_path`] maps a
//! URL to the file it is written to.

use crate::dates::site_date;
use crate::feed::escape_xml;
use crate::models::{Page, Post, SiteModel};
use crate::slug::term_slug;
use chrono::{Datelike, FixedOffset};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TAG_DIR: &str = "tag";
pub const CATEGORY_DIR: &str = "category";
pub const SEARCH_URL: &str = "/search.html";

/// Fallback base for absolute URLs when no site URL is configured
pub const FALLBACK_SITE_URL: &str = "https://example.com";

/// `/YYYY/MM/DD/<slug>.html` for dated posts, `/<slug>.html` otherwise.
pub fn post_url(post: &Post, site_offset: FixedOffset) -> String {
    match &post.date {
        Some(date) => {
            let day = site_date(date, site_offset);
            format!(
                "/{:04}/{:02}/{:02}/{}.html",
                day.year(),
                day.month(),
                day.day(),
                post.slug
            )
        }
        None => format!("/{}.html", post.slug),
    }
}

pub fn page_url(page: &Page) -> String {
    format!("/{}.html", page.slug)
}

/// Which term index a listing belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Tag,
    Category,
}

impl TermKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermKind::Tag => "tag",
            TermKind::Category => "category",
        }
    }

    pub fn dir(&self) -> &'static str {
        match self {
            TermKind::Tag => TAG_DIR,
            TermKind::Category => CATEGORY_DIR,
        }
    }

    /// URL of the overview page listing every term
    pub fn overview_url(&self) -> &'static str {
        match self {
            TermKind::Tag => "/tags.html",
            TermKind::Category => "/categories.html",
        }
    }
}

/// Page `n` (1-based) of a term listing: `/tag/rust.html`, `/tag/rust/2.html`
pub fn term_url(kind: TermKind, term: &str, page: usize) -> String {
    let slug = term_slug(term);
    if page <= 1 {
        format!("/{}/{}.html", kind.dir(), slug)
    } else {
        format!("/{}/{}/{}.html", kind.dir(), slug, page)
    }
}

/// Feed base for a category, without extension: `/category/<term>/feed`
pub fn category_feed_base(category: &str) -> String {
    format!("/{}/{}/feed", CATEGORY_DIR, term_slug(category))
}

/// Page `n` of the front page: `/index.html`, `/page/2.html`
pub fn index_url(page: usize) -> String {
    paged_dir_url("", page)
}

/// Page `n` of a date archive. `month`/`day` narrow the bucket.
pub fn archive_url(year: i32, month: Option<u32>, day: Option<u32>, page: usize) -> String {
    let dir = match (month, day) {
        (None, _) => format!("/{:04}", year),
        (Some(m), None) => format!("/{:04}/{:02}", year, m),
        (Some(m), Some(d)) => format!("/{:04}/{:02}/{:02}", year, m, d),
    };
    paged_dir_url(&dir, page)
}

fn paged_dir_url(dir: &str, page: usize) -> String {
    if page <= 1 {
        format!("{}/index.html", dir)
    } else {
        format!("{}/page/{}.html", dir, page)
    }
}

/// Number of listing pages for `total` items. Always at least one;
/// `per_page == 0` means everything on one page.
pub fn page_count(total: usize, per_page: usize) -> usize {
    if per_page == 0 || total == 0 {
        1
    } else {
        total.div_ceil(per_page)
    }
}

/// Split `items` into listing pages. An empty slice yields one empty page.
pub fn paginate<T>(items: &[T], per_page: usize) -> Vec<&[T]> {
    if items.is_empty() || per_page == 0 {
        return vec![items];
    }
    items.chunks(per_page).collect()
}

/// Absolute URL for a site-relative path
pub fn absolute_url(site_url: &str, path: &str) -> String {
    let root = site_url.trim().trim_end_matches('/');
    let root = if root.is_empty() {
        FALLBACK_SITE_URL
    } else {
        root
    };
    format!("{}/{}", root, path.trim_start_matches('/'))
}

/// File path, relative to the output directory, for a site URL
pub fn output_path(url: &str) -> PathBuf {
    url.trim_start_matches('/').split('/').collect()
}

/// What an output page shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// Index into [`SiteModel::posts`]
    Post(usize),
    /// Index into [`SiteModel::pages`]
    Page(usize),
    Index { page: usize, total: usize },
    Archive,
    DateArchive {
        year: i32,
        month: Option<u32>,
        day: Option<u32>,
        page: usize,
        total: usize,
    },
    Term {
        kind: TermKind,
        term: String,
        page: usize,
        total: usize,
    },
    Terms(TermKind),
    Search,
    NotFound,
}

/// One page of the generated site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub url: String,
    pub kind: RouteKind,
}

impl Route {
    fn new(url: String, kind: RouteKind) -> Self {
        Self { url, kind }
    }

    /// Source file for content routes, a short name for generated ones
    pub fn describe(&self, model: &SiteModel) -> String {
        let source = |path: Option<&Path>| match path {
            Some(path) => path.display().to_string(),
            None => "a missing entry".to_string(),
        };
        match &self.kind {
            RouteKind::Post(i) => source(model.posts().get(*i).map(|p| p.source_path.as_path())),
            RouteKind::Page(i) => source(model.pages().get(*i).map(|p| p.source_path.as_path())),
            RouteKind::Index { .. } => "the front page".to_string(),
            RouteKind::Archive => "the archive page".to_string(),
            RouteKind::DateArchive { .. } => "a date archive".to_string(),
            RouteKind::Term { kind, term, .. } => {
                format!("the {} listing for {:?}", kind.as_str(), term)
            }
            RouteKind::Terms(kind) => format!("the {} overview", kind.as_str()),
            RouteKind::Search => "the search page".to_string(),
            RouteKind::NotFound => "the 404 page".to_string(),
        }
    }

    /// Whether the page belongs in `sitemap.xml`
    pub fn in_sitemap(&self) -> bool {
        !matches!(self.kind, RouteKind::Search | RouteKind::NotFound)
    }
}

/// Every HTML page the site consists of, in a stable order.
pub fn site_routes(model: &SiteModel, posts_per_page: usize, with_search: bool) -> Vec<Route> {
    let offset = model.site_offset();
    let mut routes = Vec::new();

    for (i, post) in model.posts().iter().enumerate() {
        routes.push(Route::new(post_url(post, offset), RouteKind::Post(i)));
    }
    for (i, page) in model.pages().iter().enumerate() {
        routes.push(Route::new(page_url(page), RouteKind::Page(i)));
    }

    let total = page_count(model.posts().len(), posts_per_page);
    for page in 1..=total {
        routes.push(Route::new(index_url(page), RouteKind::Index { page, total }));
    }

    routes.push(Route::new("/archive.html".to_string(), RouteKind::Archive));
    for (&year, year_bucket) in model.archive() {
        push_date_archive(&mut routes, year, None, None, year_bucket.posts.len(), posts_per_page);
        for (&month, month_bucket) in &year_bucket.months {
            push_date_archive(
                &mut routes,
                year,
                Some(month),
                None,
                month_bucket.posts.len(),
                posts_per_page,
            );
            for (&day, day_bucket) in &month_bucket.days {
                push_date_archive(
                    &mut routes,
                    year,
                    Some(month),
                    Some(day),
                    day_bucket.len(),
                    posts_per_page,
                );
            }
        }
    }

    for (kind, index) in [
        (TermKind::Tag, model.tags()),
        (TermKind::Category, model.categories()),
    ] {
        routes.push(Route::new(
            kind.overview_url().to_string(),
            RouteKind::Terms(kind),
        ));
        for (term, bucket) in index {
            let total = page_count(bucket.len(), posts_per_page);
            for page in 1..=total {
                routes.push(Route::new(
                    term_url(kind, term, page),
                    RouteKind::Term {
                        kind,
                        term: term.clone(),
                        page,
                        total,
                    },
                ));
            }
        }
    }

    if with_search {
        routes.push(Route::new(SEARCH_URL.to_string(), RouteKind::Search));
    }
    routes.push(Route::new("/404.html".to_string(), RouteKind::NotFound));

    routes
}

/// Two routes that would be written to the same file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConflict {
    pub url: String,
    /// What produces the URL, in route order
    pub sources: Vec<String>,
}

impl fmt::Display for RouteConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is produced by {}", self.url, self.sources.join(", "))
    }
}

#[derive(Debug, Error)]
#[error("{}", describe_conflicts(.0))]
pub struct RouteConflicts(pub Vec<RouteConflict>);

fn describe_conflicts(conflicts: &[RouteConflict]) -> String {
    let mut out = format!("{} output path conflict(s):", conflicts.len());
    for conflict in conflicts {
        out.push_str("\n  ");
        out.push_str(&conflict.to_string());
    }
    out
}

/// Fail when two routes share a URL, e.g. `pages/archive.md` and the
/// generated archive page. Never resolved by letting one overwrite the other.
pub fn check_routes(model: &SiteModel, routes: &[Route]) -> Result<(), RouteConflicts> {
    let mut by_url: BTreeMap<&str, Vec<&Route>> = BTreeMap::new();
    for route in routes {
        by_url.entry(route.url.as_str()).or_default().push(route);
    }

    let conflicts: Vec<RouteConflict> = by_url
        .into_iter()
        .filter(|(_, routes)| routes.len() > 1)
        .map(|(url, routes)| RouteConflict {
            url: url.to_string(),
            sources: routes.iter().map(|r| r.describe(model)).collect(),
        })
        .collect();

    if conflicts.is_empty() {
        Ok(())
    } else {
        for conflict in &conflicts {
            tracing::error!("{}", conflict);
        }
        Err(RouteConflicts(conflicts))
    }
}

fn push_date_archive(
    routes: &mut Vec<Route>,
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    count: usize,
    posts_per_page: usize,
) {
    let total = page_count(count, posts_per_page);
    for page in 1..=total {
        routes.push(Route::new(
            archive_url(year, month, day, page),
            RouteKind::DateArchive {
                year,
                month,
                day,
                page,
                total,
            },
        ));
    }
}

/// Sorted absolute URLs of every sitemap-eligible route
pub fn sitemap_urls(routes: &[Route], site_url: &str) -> Vec<String> {
    let mut urls: Vec<String> = routes
        .iter()
        .filter(|r| r.in_sitemap())
        .map(|r| absolute_url(site_url, &r.url))
        .collect();
    urls.sort();
    urls.dedup();
    urls
}

/// `sitemap.xml` body for already-absolute URLs
pub fn render_sitemap(urls: &[String]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for url in urls {
        xml.push_str(&format!("  <url><loc>{}</loc></url>\n", escape_xml(url)));
    }
    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{parse_offset, parse_timestamp};
    use crate::models::Entry;
    use crate::site::assemble;

    fn post(slug: &str, date: Option<&str>, tags: &[&str]) -> Post {
        Post {
            title: slug.to_string(),
            slug: slug.to_string(),
            date: date.map(|d| parse_timestamp(d, parse_offset("Z").unwrap()).unwrap()),
            modified: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            category: None,
            author: None,
            draft: false,
            content: String::new(),
            html: String::new(),
            description: None,
            excerpt: None,
            word_count: 0,
            reading_minutes: 0,
            cover: None,
            twitter_creator: None,
            twitter_site: None,
            source_path: PathBuf::from(format!("{}.md", slug)),
        }
    }

    fn page(slug: &str) -> Page {
        Page {
            title: slug.to_string(),
            slug: slug.to_string(),
            modified: None,
            author: None,
            draft: false,
            content: String::new(),
            html: String::new(),
            description: None,
            excerpt: None,
            cover: None,
            twitter_creator: None,
            twitter_site: None,
            source_path: PathBuf::from(format!("pages/{}.md", slug)),
        }
    }

    #[test]
    fn test_post_urls() {
        let utc = parse_offset("Z").unwrap();
        assert_eq!(
            post_url(&post("hello", Some("2024-03-02"), &[]), utc),
            "/2024/03/02/hello.html"
        );
        assert_eq!(post_url(&post("hello", None, &[]), utc), "/hello.html");

        let late = post("late", Some("2024-03-02T23:00:00Z"), &[]);
        let tokyo = parse_offset("+09:00").unwrap();
        assert_eq!(post_url(&late, tokyo), "/2024/03/03/late.html");
    }

    #[test]
    fn test_listing_urls() {
        assert_eq!(index_url(1), "/index.html");
        assert_eq!(index_url(3), "/page/3.html");
        assert_eq!(term_url(TermKind::Tag, "Web Dev", 1), "/tag/web-dev.html");
        assert_eq!(term_url(TermKind::Category, "rust", 2), "/category/rust/2.html");
        assert_eq!(term_url(TermKind::Tag, "???", 1), "/tag/unnamed.html");
        assert_eq!(archive_url(2024, None, None, 1), "/2024/index.html");
        assert_eq!(archive_url(2024, Some(3), None, 2), "/2024/03/page/2.html");
        assert_eq!(archive_url(2024, Some(3), Some(9), 1), "/2024/03/09/index.html");
        assert_eq!(category_feed_base("Rust Lang"), "/category/rust-lang/feed");
    }

    #[test]
    fn test_pagination() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(25, 0), 1);

        let items = [1, 2, 3, 4, 5];
        let pages = paginate(&items, 2);
        assert_eq!(pages, vec![&[1, 2][..], &[3, 4][..], &[5][..]]);
        let empty = paginate::<i32>(&[], 2);
        assert_eq!(empty.len(), 1);
        assert!(empty[0].is_empty());
    }

    #[test]
    fn test_absolute_url_and_output_path() {
        assert_eq!(absolute_url("https://blog.dev/", "/a/b.html"), "https://blog.dev/a/b.html");
        assert_eq!(absolute_url("", "/index.html"), "https://example.com/index.html");
        assert_eq!(
            output_path("/2024/03/02/hello.html"),
            PathBuf::from("2024").join("03").join("02").join("hello.html")
        );
    }

    #[test]
    fn test_site_routes_and_sitemap() {
        let entries = vec![
            Entry::Post(post("a", Some("2024-01-01"), &["rust"])),
            Entry::Post(post("b", Some("2024-01-02"), &["rust"])),
            Entry::Post(post("c", Some("2024-02-01"), &[])),
            Entry::Post(post("d", None, &[])),
        ];
        let model = assemble(entries, 0, parse_offset("Z").unwrap()).unwrap();
        let routes = site_routes(&model, 2, true);
        let urls: Vec<&str> = routes.iter().map(|r| r.url.as_str()).collect();

        for expected in [
            "/2024/02/01/c.html",
            "/d.html",
            "/index.html",
            "/page/2.html",
            "/archive.html",
            "/2024/index.html",
            "/2024/page/2.html",
            "/2024/01/index.html",
            "/2024/01/01/index.html",
            "/tags.html",
            "/tag/rust.html",
            "/categories.html",
            "/search.html",
            "/404.html",
        ] {
            assert!(urls.contains(&expected), "missing {}", expected);
        }
        assert!(!urls.contains(&"/page/3.html"));
        assert!(!urls.contains(&"/tag/rust/2.html"));

        let sitemap = sitemap_urls(&routes, "https://blog.dev");
        assert!(sitemap.contains(&"https://blog.dev/index.html".to_string()));
        assert!(!sitemap.iter().any(|u| u.ends_with("search.html")));
        assert!(!sitemap.iter().any(|u| u.ends_with("404.html")));
        let mut sorted = sitemap.clone();
        sorted.sort();
        assert_eq!(sitemap, sorted);

        let xml = render_sitemap(&sitemap);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<url><loc>https://blog.dev/d.html</loc></url>"));
        assert_eq!(xml.matches("<url>").count(), sitemap.len());
    }

    #[test]
    fn test_content_clashing_with_generated_pages() {
        let entries = vec![
            Entry::Post(post("index", None, &[])),
            Entry::Post(post("first", Some("2024-03-02"), &[])),
            Entry::Page(page("archive")),
            Entry::Page(page("about")),
        ];
        let model = assemble(entries, 0, parse_offset("Z").unwrap()).unwrap();
        let routes = site_routes(&model, 10, false);

        let err = check_routes(&model, &routes).unwrap_err();
        let urls: Vec<&str> = err.0.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["/archive.html", "/index.html"]);
        assert_eq!(
            err.0[0].sources,
            vec![
                Path::new("pages/archive.md").display().to_string(),
                "the archive page".to_string()
            ]
        );
        assert!(err.to_string().contains("2 output path conflict(s)"));
    }

    #[test]
    fn test_dated_index_post_clashes_with_day_archive() {
        let entries = vec![Entry::Post(post("index", Some("2024-03-02"), &[]))];
        let model = assemble(entries, 0, parse_offset("Z").unwrap()).unwrap();
        let routes = site_routes(&model, 10, false);

        let err = check_routes(&model, &routes).unwrap_err();
        assert_eq!(err.0[0].url, "/2024/03/02/index.html");
        assert_eq!(err.0[0].sources[1], "a date archive");
    }

    #[test]
    fn test_distinct_routes_pass() {
        let entries = vec![
            Entry::Post(post("hello", Some("2024-03-02"), &["rust"])),
            Entry::Page(page("about")),
        ];
        let model = assemble(entries, 0, parse_offset("Z").unwrap()).unwrap();
        let routes = site_routes(&model, 1, true);
        assert!(check_routes(&model, &routes).is_ok());
    }
}
