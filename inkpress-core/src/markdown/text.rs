//! Plain-text helpers shared by entity building, feeds and search.

use super::MarkdownRenderer;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use unicode_segmentation::UnicodeSegmentation;

pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Strip tags from rendered HTML, decode the common entities and collapse
/// whitespace. Tags become spaces so adjacent blocks do not run together.
pub fn html_to_text(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                result.push(' ');
            }
            '>' if in_tag => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    // &amp; last so "&amp;lt;" stays "&lt;"
    result
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plain text of the first top-level paragraph with any text in it.
///
/// Paragraphs inside block quotes, admonitions, lists, tables and footnote
/// definitions are skipped.
pub fn first_paragraph(markdown: &str) -> Option<String> {
    let parser = Parser::new_ext(markdown, MarkdownRenderer::new().options());
    let mut containers: Vec<TagEnd> = Vec::new();
    let mut current: Option<String> = None;

    for event in parser {
        match event {
            Event::Start(tag) if is_container(&tag) => containers.push(tag.to_end()),
            Event::End(end) if containers.last() == Some(&end) => {
                containers.pop();
            }
            Event::Start(Tag::Paragraph) if containers.is_empty() => {
                current = Some(String::new());
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(buf) = current.as_mut() {
                    buf.push(' ');
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if let Some(buf) = current.take() {
                    let text = buf.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
            _ => {}
        }
    }

    None
}

fn is_container(tag: &Tag) -> bool {
    matches!(
        tag,
        Tag::BlockQuote(_)
            | Tag::List(_)
            | Tag::Item
            | Tag::Table(_)
            | Tag::FootnoteDefinition(_)
    )
}

/// Truncate to at most `max_chars` characters, cutting at the last word
/// boundary and appending `...`. Short text is returned unchanged.
pub fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    let cut = match truncated.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => &truncated[..pos],
        _ => truncated.as_str(),
    };
    format!("{}...", cut.trim_end_matches(|c: char| c.is_whitespace() || c == ','))
}

/// Number of Unicode words in `text`.
pub fn word_count(text: &str) -> usize {
    text.unicode_words().count()
}
