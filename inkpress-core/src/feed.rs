//! RSS 2.0 and Atom feed serialization.

use crate::models::{Post, SiteModel};
use crate::routes::{absolute_url, category_feed_base, post_url};
use chrono::{DateTime, FixedOffset};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Site-level feed metadata
#[derive(Debug, Clone)]
pub struct FeedSite {
    pub title: String,
    /// Normalized site URL; empty falls back to the placeholder host
    pub url: String,
    pub author: Option<String>,
}

/// One feed: which posts, under which title, at which URL
#[derive(Debug, Clone)]
pub struct FeedSpec<'a> {
    pub title: String,
    pub description: String,
    /// Site-relative path without extension, e.g. `/feed`
    pub base_path: String,
    pub posts: Vec<&'a Post>,
}

/// A serialized feed ready to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    /// Site-relative URL, e.g. `/feed.rss`
    pub url: String,
    pub xml: String,
}

/// Main feed pair plus one pair per category, newest `posts_per_feed`
/// non-draft posts each (`0` keeps every post).
pub fn site_feeds(model: &SiteModel, site: &FeedSite, posts_per_feed: usize) -> Vec<FeedDocument> {
    let mut specs = vec![FeedSpec {
        title: site.title.clone(),
        description: format!("Latest posts from {}", site.title),
        base_path: "/feed".to_string(),
        posts: newest(model.posts(), posts_per_feed),
    }];
    for category in model.categories().keys() {
        specs.push(FeedSpec {
            title: format!("{} - {}", site.title, category),
            description: format!("Posts in category \"{}\" from {}", category, site.title),
            base_path: category_feed_base(category),
            posts: newest(model.posts_in_category(category), posts_per_feed),
        });
    }

    let offset = model.site_offset();
    let mut documents = Vec::with_capacity(specs.len() * 2);
    for spec in &specs {
        documents.push(FeedDocument {
            url: format!("{}.rss", spec.base_path),
            xml: render_rss(site, spec, offset),
        });
        documents.push(FeedDocument {
            url: format!("{}.atom", spec.base_path),
            xml: render_atom(site, spec, offset),
        });
    }

    tracing::debug!("Serialized {} feeds", documents.len());
    documents
}

/// First `limit` non-draft posts (`0` keeps all)
fn newest<'a>(posts: impl IntoIterator<Item = &'a Post>, limit: usize) -> Vec<&'a Post> {
    let published = posts.into_iter().filter(|p| !p.draft);
    if limit == 0 {
        published.collect()
    } else {
        published.take(limit).collect()
    }
}

/// RSS 2.0 document for `spec`
pub fn render_rss(site: &FeedSite, spec: &FeedSpec<'_>, offset: FixedOffset) -> String {
    let mut items = String::new();
    for post in &spec.posts {
        let link = absolute_url(&site.url, &post_url(post, offset));
        items.push_str("    <item>\n");
        items.push_str(&format!("      <title>{}</title>\n", escape_xml(&post.title)));
        items.push_str(&format!("      <link>{}</link>\n", escape_xml(&link)));
        items.push_str(&format!(
            "      <guid isPermaLink=\"true\">{}</guid>\n",
            escape_xml(&link)
        ));
        items.push_str(&format!(
            "      <description>{}</description>\n",
            escape_xml(&post.html)
        ));
        if let Some(author) = &post.author {
            items.push_str(&format!(
                "      <dc:creator>{}</dc:creator>\n",
                escape_xml(author)
            ));
        }
        for term in post.category.iter().chain(post.tags.iter()) {
            items.push_str(&format!("      <category>{}</category>\n", escape_xml(term)));
        }
        if let Some(date) = &post.date {
            items.push_str(&format!("      <pubDate>{}</pubDate>\n", date.to_rfc2822()));
        }
        items.push_str("    </item>\n");
    }

    let channel_link = absolute_url(&site.url, "/");
    let self_link = absolute_url(&site.url, &format!("{}.rss", spec.base_path));
    let last_build = latest_update(spec)
        .map(|d| format!("    <lastBuildDate>{}</lastBuildDate>\n", d.to_rfc2822()))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="{atom}" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>{title}</title>
    <link>{link}</link>
    <description>{description}</description>
    <atom:link href="{self_link}" rel="self" type="application/rss+xml"/>
{last_build}{items}  </channel>
</rss>
"#,
        atom = ATOM_NS,
        title = escape_xml(&spec.title),
        link = escape_xml(&channel_link),
        description = escape_xml(&spec.description),
        self_link = escape_xml(&self_link),
        last_build = last_build,
        items = items,
    )
}

/// Atom document for `spec`
pub fn render_atom(site: &FeedSite, spec: &FeedSpec<'_>, offset: FixedOffset) -> String {
    let channel_link = absolute_url(&site.url, "/");
    let self_link = absolute_url(&site.url, &format!("{}.atom", spec.base_path));
    let updated = latest_update(spec)
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "1970-01-01T00:00:00+00:00".to_string());

    let mut entries = String::new();
    for post in &spec.posts {
        let link = absolute_url(&site.url, &post_url(post, offset));
        let entry_updated = post
            .modified
            .or(post.date)
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| updated.clone());

        entries.push_str("  <entry>\n");
        entries.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
        entries.push_str(&format!("    <id>{}</id>\n", escape_xml(&link)));
        entries.push_str(&format!(
            "    <link href=\"{}\" rel=\"alternate\"/>\n",
            escape_xml(&link)
        ));
        entries.push_str(&format!("    <updated>{}</updated>\n", entry_updated));
        if let Some(date) = &post.date {
            entries.push_str(&format!("    <published>{}</published>\n", date.to_rfc3339()));
        }
        if let Some(author) = post.author.as_ref().or(site.author.as_ref()) {
            entries.push_str(&format!(
                "    <author><name>{}</name></author>\n",
                escape_xml(author)
            ));
        }
        for term in post.category.iter().chain(post.tags.iter()) {
            entries.push_str(&format!("    <category term=\"{}\"/>\n", escape_xml(term)));
        }
        if let Some(summary) = &post.description {
            entries.push_str(&format!("    <summary>{}</summary>\n", escape_xml(summary)));
        }
        entries.push_str(&format!(
            "    <content type=\"html\">{}</content>\n",
            escape_xml(&post.html)
        ));
        entries.push_str("  </entry>\n");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="{ns}">
  <title>{title}</title>
  <subtitle>{description}</subtitle>
  <id>{id}</id>
  <link href="{link}" rel="alternate"/>
  <link href="{self_link}" rel="self"/>
  <updated>{updated}</updated>
{entries}</feed>
"#,
        ns = ATOM_NS,
        title = escape_xml(&spec.title),
        description = escape_xml(&spec.description),
        id = escape_xml(&channel_link),
        link = escape_xml(&channel_link),
        self_link = escape_xml(&self_link),
        updated = updated,
        entries = entries,
    )
}

/// Most recent `modified`/`date` among the feed's posts
fn latest_update(spec: &FeedSpec<'_>) -> Option<DateTime<FixedOffset>> {
    spec.posts
        .iter()
        .filter_map(|p| match (p.modified, p.date) {
            (Some(m), Some(d)) => Some(m.max(d)),
            (m, d) => m.or(d),
        })
        .max()
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{parse_offset, parse_timestamp};
    use crate::models::Entry;
    use crate::site::assemble;
    use std::path::PathBuf;

    fn post(slug: &str, date: &str, category: Option<&str>) -> Post {
        Post {
            title: format!("{} & more", slug),
            slug: slug.to_string(),
            date: Some(parse_timestamp(date, parse_offset("Z").unwrap()).unwrap()),
            modified: None,
            tags: vec!["rust".to_string()],
            category: category.map(str::to_string),
            author: Some("Jane".to_string()),
            draft: false,
            content: String::new(),
            html: format!("<p>Body of {}</p>", slug),
            description: None,
            excerpt: None,
            word_count: 2,
            reading_minutes: 1,
            cover: None,
            twitter_creator: None,
            twitter_site: None,
            source_path: PathBuf::from(format!("{}.md", slug)),
        }
    }

    fn site() -> FeedSite {
        FeedSite {
            title: "Field Notes".to_string(),
            url: "https://blog.dev".to_string(),
            author: None,
        }
    }

    fn model() -> SiteModel {
        let entries = vec![
            Entry::Post(post("one", "2024-01-01", Some("code"))),
            Entry::Post(post("two", "2024-02-01", None)),
            Entry::Post(post("three", "2024-03-01", Some("code"))),
        ];
        assemble(entries, 0, parse_offset("Z").unwrap()).unwrap()
    }

    #[test]
    fn test_feed_set() {
        let feeds = site_feeds(&model(), &site(), 20);
        let urls: Vec<&str> = feeds.iter().map(|f| f.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "/feed.rss",
                "/feed.atom",
                "/category/code/feed.rss",
                "/category/code/feed.atom"
            ]
        );
        assert!(!feeds[2].xml.contains("two &amp; more"));
        assert!(feeds[2].xml.contains("three &amp; more"));
    }

    #[test]
    fn test_rss_items_are_bounded_and_ordered() {
        let feeds = site_feeds(&model(), &site(), 2);
        let rss = &feeds[0].xml;
        assert_eq!(rss.matches("<item>").count(), 2);
        let three = rss.find("three &amp; more").unwrap();
        let two = rss.find("two &amp; more").unwrap();
        assert!(three < two);
        assert!(!rss.contains("one &amp; more"));
        assert!(rss.contains("<link>https://blog.dev/2024/03/01/three.html</link>"));
        assert!(rss.contains("Mar 2024 00:00:00 +0000</pubDate>"));
        assert!(rss.contains("&lt;p&gt;Body of three&lt;/p&gt;"));
        assert!(rss.contains("<category>code</category>"));
    }

    #[test]
    fn test_atom_document() {
        let feeds = site_feeds(&model(), &site(), 20);
        let atom = &feeds[1].xml;
        assert!(atom.contains("<feed xmlns=\"http://www.w3.org/2005/Atom\">"));
        assert!(atom.contains("<updated>2024-03-01T00:00:00+00:00</updated>"));
        assert!(atom.contains("<id>https://blog.dev/2024/02/01/two.html</id>"));
        assert!(atom.contains("<author><name>Jane</name></author>"));
        assert_eq!(atom.matches("<entry>").count(), 3);
    }

    #[test]
    fn test_escape_xml() {
        insta::assert_snapshot!(escape_xml("<a href=\"x\">Tom & Jerry's</a>"), @"&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&apos;s&lt;/a&gt;");
    }
}
