//! Open external links in a new tab.

use super::text::html_escape;
use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};

/// Rewrites links that leave the site into raw `<a>` tags carrying
/// `target="_blank"` and `rel="noopener noreferrer"`.
#[derive(Debug)]
pub struct ExternalLinkTransformer {
    site_host: Option<String>,
}

impl ExternalLinkTransformer {
    pub fn new(site_url: Option<&str>) -> Self {
        Self {
            site_host: site_url.and_then(host_of).map(|h| h.to_ascii_lowercase()),
        }
    }

    pub fn transform(&self, events: Vec<Event<'static>>) -> Vec<Event<'static>> {
        let mut out = Vec::with_capacity(events.len());
        let mut rewritten: Vec<bool> = Vec::new();

        for event in events {
            match event {
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    let external =
                        !matches!(link_type, LinkType::Email) && self.is_external(&dest_url);
                    rewritten.push(external);
                    if external {
                        let mut open = format!(
                            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\"",
                            html_escape(&dest_url)
                        );
                        if !title.is_empty() {
                            open.push_str(&format!(" title=\"{}\"", html_escape(&title)));
                        }
                        open.push('>');
                        out.push(Event::InlineHtml(CowStr::Boxed(open.into_boxed_str())));
                    } else {
                        out.push(Event::Start(Tag::Link {
                            link_type,
                            dest_url,
                            title,
                            id,
                        }));
                    }
                }
                Event::End(TagEnd::Link) => {
                    if rewritten.pop().unwrap_or(false) {
                        out.push(Event::InlineHtml(CowStr::Borrowed("</a>")));
                    } else {
                        out.push(Event::End(TagEnd::Link));
                    }
                }
                other => out.push(other),
            }
        }

        out
    }

    /// Links with a scheme are external unless they point at the site's own
    /// host (with or without `www.`).
    pub fn is_external(&self, href: &str) -> bool {
        if href.is_empty() || href.starts_with('/') || href.starts_with('#') {
            return false;
        }
        if !has_scheme(href) {
            return false;
        }

        match (&self.site_host, host_of(href)) {
            (Some(site), Some(host)) => {
                let host = host.to_ascii_lowercase();
                host != *site && host != format!("www.{}", site)
            }
            _ => true,
        }
    }
}

fn has_scheme(href: &str) -> bool {
    match href.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn host_of(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..end];
    (!host.is_empty()).then_some(host)
}
