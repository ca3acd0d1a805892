//! GitHub-style alerts rendered as admonition blocks.
//!
//! `> [!WARNING]` followed by quoted text becomes
//! `<div class="admonition admonition-warning">` with a title row and a
//! content div. Plain block quotes are left alone.

use pulldown_cmark::{BlockQuoteKind, CowStr, Event, Tag, TagEnd};

#[derive(Debug, Default)]
pub struct AdmonitionTransformer;

impl AdmonitionTransformer {
    pub fn new() -> Self {
        Self
    }

    pub fn transform(&self, events: Vec<Event<'static>>) -> Vec<Event<'static>> {
        let mut out = Vec::with_capacity(events.len());
        // One entry per open block quote: its end tag and whether it was rewritten
        let mut open: Vec<(TagEnd, bool)> = Vec::new();

        for event in events {
            match event {
                Event::Start(tag @ Tag::BlockQuote(_)) => {
                    let end = tag.to_end();
                    match &tag {
                        Tag::BlockQuote(Some(kind)) => {
                            out.push(html(render_open(*kind)));
                            open.push((end, true));
                        }
                        _ => {
                            open.push((end, false));
                            out.push(Event::Start(tag));
                        }
                    }
                }
                Event::End(end) if open.last().is_some_and(|(e, _)| *e == end) => {
                    match open.pop() {
                        Some((_, true)) => out.push(html("</div></div>\n".to_string())),
                        _ => out.push(Event::End(end)),
                    }
                }
                other => out.push(other),
            }
        }

        out
    }
}

fn html(s: String) -> Event<'static> {
    Event::Html(CowStr::Boxed(s.into_boxed_str()))
}

/// CSS suffix and display title for an alert kind
pub fn kind_names(kind: BlockQuoteKind) -> (&'static str, &'static str) {
    match kind {
        BlockQuoteKind::Note => ("note", "Note"),
        BlockQuoteKind::Tip => ("tip", "Tip"),
        BlockQuoteKind::Important => ("important", "Important"),
        BlockQuoteKind::Warning => ("warning", "Warning"),
        BlockQuoteKind::Caution => ("caution", "Caution"),
    }
}

fn render_open(kind: BlockQuoteKind) -> String {
    let (class, title) = kind_names(kind);
    format!(
        "<div class=\"admonition admonition-{}\">\n<p class=\"admonition-title\">{}</p>\n<div class=\"admonition-content\">\n",
        class, title
    )
}
