//! Check command: run the pipeline and report, without rendering output.

use super::load_config;
use anyhow::{bail, Context, Result};
use inkpress_core::models::Failure;
use inkpress_core::routes::{check_routes, site_routes};
use inkpress_core::{build_site, Config};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CheckSummary<'a> {
    discovered: usize,
    posts: usize,
    pages: usize,
    published: usize,
    drafts: usize,
    tags: usize,
    categories: usize,
    failures: &'a [Failure],
}

/// `inkpress check`. Fails when any file was skipped.
pub fn check_site(config_path: &Path, include_drafts: bool, json: bool) -> Result<()> {
    let mut config: Config = load_config(config_path)?;
    if include_drafts {
        config.build.include_drafts = true;
    }

    let options = config
        .pipeline_options()
        .context("Invalid configuration")?;
    let output = build_site(&options).context("Failed to build site for checking")?;
    let model = &output.model;
    let routes = site_routes(model, config.build.posts_per_page, config.build.with_search);
    check_routes(model, &routes).context("Generated pages would overwrite each other")?;

    let summary = CheckSummary {
        discovered: output.discovered,
        posts: model.posts().len(),
        pages: model.pages().len(),
        published: model.published_count(),
        drafts: model.draft_count(),
        tags: model.tags().len(),
        categories: model.categories().len(),
        failures: &output.failures,
    };

    if json {
        let payload = serde_json::to_string_pretty(&summary)?;
        println!("{}", payload);
    } else {
        println!(
            "Check complete: {} files, {} posts ({} published, {} drafts), {} pages, {} tags, {} categories",
            summary.discovered,
            summary.posts,
            summary.published,
            summary.drafts,
            summary.pages,
            summary.tags,
            summary.categories
        );
        for failure in &output.failures {
            println!("- {}", failure);
        }
    }

    if !output.failures.is_empty() {
        bail!("{} file(s) failed to build", output.failures.len());
    }
    Ok(())
}
