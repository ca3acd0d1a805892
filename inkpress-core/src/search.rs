//! Client-side search index (`search_index.json`).

use crate::markdown::html_to_text;
use crate::models::SiteModel;
use crate::routes::post_url;
use serde::{Deserialize, Serialize};

/// One searchable post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub title: String,
    /// Site-relative post URL
    pub url: String,
    /// `YYYY-MM-DD` in the site timezone, empty for undated posts
    pub date: String,
    /// Tag-stripped post body
    pub content: String,
}

/// Index every non-draft post, in model order
pub fn build_search_index(model: &SiteModel) -> Vec<SearchEntry> {
    let offset = model.site_offset();
    model
        .posts()
        .iter()
        .filter(|post| !post.draft)
        .map(|post| SearchEntry {
            title: post.title.clone(),
            url: post_url(post, offset),
            date: post
                .date
                .map(|d| d.with_timezone(&offset).format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            content: html_to_text(&post.html),
        })
        .collect()
}

/// Compact JSON array for the search page
pub fn search_index_json(model: &SiteModel) -> Result<String, serde_json::Error> {
    serde_json::to_string(&build_search_index(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_offset;
    use crate::pipeline::{build_site, PipelineOptions};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_search_index() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("hello.md"),
            "---\ntitle: Hello\ndate: 2024-01-15T23:30:00Z\n---\nSome **bold** text & more.",
        )
        .unwrap();
        fs::write(dir.path().join("undated.md"), "---\ntitle: Undated\n---\nPlain.").unwrap();
        fs::write(
            dir.path().join("draft.md"),
            "---\ntitle: Draft\ndraft: true\n---\nSecret.",
        )
        .unwrap();

        let mut options = PipelineOptions::new(dir.path());
        options.include_drafts = true;
        options.defaults.site_offset = parse_offset("+01:00").unwrap();
        let output = build_site(&options).unwrap();

        let index = build_search_index(&output.model);
        assert_eq!(
            index,
            vec![
                SearchEntry {
                    title: "Hello".into(),
                    url: "/2024/01/16/hello.html".into(),
                    date: "2024-01-16".into(),
                    content: "Some bold text & more.".into(),
                },
                SearchEntry {
                    title: "Undated".into(),
                    url: "/undated.html".into(),
                    date: String::new(),
                    content: "Plain.".into(),
                },
            ]
        );

        let json = search_index_json(&output.model).unwrap();
        assert!(json.starts_with("[{\"title\":\"Hello\""));
    }
}
