//! Init command implementation.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = include_str!("../../../inkpress.yml.example");

/// Initialize a new inkpress site
pub fn init_project(path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    write_config(root)?;
    scaffold_content(root)?;

    println!("✓ inkpress initialized in {:?}", root);
    println!("  - Edit inkpress.yml to customize site metadata");
    println!("  - Write posts in posts/ and pages in pages/");
    println!("  - Run `inkpress serve` to preview");
    Ok(())
}

fn write_config(root: &Path) -> Result<()> {
    let config_path = root.join("inkpress.yml");
    if config_path.exists() {
        println!("inkpress.yml already exists at {:?}", config_path);
        return Ok(());
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Created {:?}", config_path);
    Ok(())
}

fn scaffold_content(root: &Path) -> Result<()> {
    let posts = root.join("posts");
    let pages = root.join("pages");
    for dir in [&posts, &pages] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    write_if_missing(&posts.join("2025-01-01-hello-world.md"), SAMPLE_POST)?;
    write_if_missing(&pages.join("about.md"), SAMPLE_PAGE)?;
    Ok(())
}

fn write_if_missing(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    println!("Created {:?}", path);
    Ok(())
}

const SAMPLE_POST: &str = r#"---
title: Hello, world
date: 2025-01-01 09:00
category: meta
tags: [inkpress, intro]
description: The first post on this blog
---

Welcome to your new blog. Edit `inkpress.yml` to update site metadata, then run:

```bash
inkpress build
inkpress serve
```

> [!TIP]
> Name files `YYYY-MM-DD-slug.md`; the date prefix is dropped from the URL.
"#;

const SAMPLE_PAGE: &str = r#"---
title: About
---

Tell readers who you are.
"#;
