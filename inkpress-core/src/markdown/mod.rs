//! Markdown rendering with the blog's extensions.

pub mod admonitions;
pub mod links;
pub mod text;

use crate::slug::slugify;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;

pub use admonitions::AdmonitionTransformer;
pub use links::ExternalLinkTransformer;
pub use text::{first_paragraph, html_escape, html_to_text, truncate_words, word_count};

/// Markdown renderer with custom extensions
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
    site_url: Option<String>,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        // `> [!NOTE]` style alerts
        options.insert(Options::ENABLE_GFM);

        Self {
            options,
            site_url: None,
        }
    }

    /// Treat links to `site_url`'s host as internal
    pub fn with_site_url(mut self, site_url: &str) -> Self {
        let trimmed = site_url.trim();
        self.site_url = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub(crate) fn options(&self) -> Options {
        self.options
    }

    /// Convert markdown to HTML with all custom transforms
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let events: Vec<Event<'static>> = parser.map(Event::into_static).collect();

        let events = AdmonitionTransformer::new().transform(events);
        let events = ExternalLinkTransformer::new(self.site_url.as_deref()).transform(events);
        let events = attach_heading_ids(events);
        let events = add_heading_anchors(events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Give every heading without an explicit `{#id}` a slug id, suffixing
/// repeats with `-1`, `-2`, ...
fn attach_heading_ids(events: Vec<Event<'static>>) -> Vec<Event<'static>> {
    let mut used: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(events.len());
    let mut pending: Option<(usize, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                if let Some(explicit) = &id {
                    *used.entry(explicit.to_string()).or_insert(0) += 1;
                } else {
                    pending = Some((result.len(), String::new()));
                }
                result.push(Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }));
            }
            Event::Text(ref text) | Event::Code(ref text) => {
                if let Some((_, title)) = pending.as_mut() {
                    title.push_str(text);
                }
                result.push(event);
            }
            Event::End(TagEnd::Heading(level)) => {
                if let Some((index, title)) = pending.take() {
                    let id = unique_id(&mut used, &title);
                    if let Event::Start(Tag::Heading { id: slot, .. }) = &mut result[index] {
                        *slot = Some(CowStr::Boxed(id.into_boxed_str()));
                    }
                }
                result.push(Event::End(TagEnd::Heading(level)));
            }
            other => result.push(other),
        }
    }

    result
}

fn unique_id(used: &mut HashMap<String, usize>, title: &str) -> String {
    let base = match slugify(title) {
        s if s.is_empty() => "section".to_string(),
        s => s,
    };
    // `used` maps every emitted id to the next suffix to try for it
    let mut suffix = used.get(&base).copied().unwrap_or(0);
    let id = loop {
        let candidate = if suffix == 0 {
            base.clone()
        } else {
            format!("{}-{}", base, suffix)
        };
        suffix += 1;
        if !used.contains_key(&candidate) {
            break candidate;
        }
    };
    used.insert(base, suffix);
    used.entry(id.clone()).or_insert(1);
    id
}

fn add_heading_anchors(events: Vec<Event<'static>>) -> Vec<Event<'static>> {
    let mut result = Vec::with_capacity(events.len());
    let mut current_id: Option<String> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                current_id = id.as_ref().map(|s| s.to_string());
                result.push(Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }));
            }
            Event::End(TagEnd::Heading(level)) => {
                if let Some(id) = current_id.take() {
                    let anchor = format!(
                        "<a class=\"heading-anchor\" href=\"#{}\" aria-label=\"Link to heading\">#</a>",
                        html_escape(&id)
                    );
                    result.push(Event::Html(CowStr::Boxed(anchor.into_boxed_str())));
                }
                result.push(Event::End(TagEnd::Heading(level)));
            }
            other => result.push(other),
        }
    }

    result
}
