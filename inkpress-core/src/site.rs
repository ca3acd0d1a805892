//! Site model assembly: ordering, collision detection and indices.

use crate::dates::site_date;
use crate::models::{Archive, Entry, Page, Post, SiteModel};
use crate::pipeline::{PipelineError, SlugCollision};
use chrono::{Datelike, FixedOffset};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Newest first, undated last, ties broken by slug.
pub fn compare_posts(a: &Post, b: &Post) -> Ordering {
    match (&a.date, &b.date) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.slug.cmp(&b.slug))
}

/// Assemble the site model from every built entity.
///
/// `draft_count` is the number of drafts the scanner built, kept or not.
/// Slug collisions between any two entities are fatal.
pub fn assemble(
    entries: Vec<Entry>,
    draft_count: usize,
    site_offset: FixedOffset,
) -> Result<SiteModel, PipelineError> {
    check_collisions(&entries)?;

    let mut posts = Vec::new();
    let mut pages = Vec::new();
    for entry in entries {
        match entry {
            Entry::Post(post) => posts.push(post),
            Entry::Page(page) => pages.push(page),
        }
    }

    posts.sort_by(compare_posts);
    pages.sort_by(|a: &Page, b: &Page| a.slug.cmp(&b.slug));

    let mut tags: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut categories: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut archive = Archive::new();

    for (index, post) in posts.iter().enumerate() {
        for tag in &post.tags {
            tags.entry(tag.clone()).or_default().push(index);
        }
        if let Some(category) = &post.category {
            categories.entry(category.clone()).or_default().push(index);
        }
        if let Some(date) = &post.date {
            let day = site_date(date, site_offset);
            let year = archive.entry(day.year()).or_default();
            year.posts.push(index);
            let month = year.months.entry(day.month()).or_default();
            month.posts.push(index);
            month.days.entry(day.day()).or_default().push(index);
        }
    }

    let published_count = posts.iter().filter(|p| !p.draft).count();

    tracing::info!(
        "Assembled site: {} posts, {} pages, {} tags, {} categories, {} archive years",
        posts.len(),
        pages.len(),
        tags.len(),
        categories.len(),
        archive.len()
    );

    Ok(SiteModel {
        posts,
        pages,
        tags,
        categories,
        archive,
        draft_count,
        published_count,
        site_offset,
    })
}

fn check_collisions(entries: &[Entry]) -> Result<(), PipelineError> {
    let mut by_slug: BTreeMap<&str, Vec<PathBuf>> = BTreeMap::new();
    for entry in entries {
        by_slug
            .entry(entry.slug())
            .or_default()
            .push(entry.source_path().to_path_buf());
    }

    let collisions: Vec<SlugCollision> = by_slug
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(slug, mut paths)| {
            paths.sort();
            SlugCollision {
                slug: slug.to_string(),
                paths,
            }
        })
        .collect();

    if collisions.is_empty() {
        Ok(())
    } else {
        for collision in &collisions {
            tracing::error!("{}", collision);
        }
        Err(PipelineError::SlugCollisions(collisions))
    }
}
