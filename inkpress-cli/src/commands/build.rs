//! Build command implementation.

use super::load_config;
use anyhow::{bail, Context, Result};
use include_dir::{include_dir, Dir};
use inkpress_core::feed::{site_feeds, FeedSite};
use inkpress_core::models::{Failure, SiteModel};
use inkpress_core::routes::{check_routes, output_path, render_sitemap, site_routes, sitemap_urls};
use inkpress_core::search::search_index_json;
use inkpress_core::{build_site_with, BuildOutput, Config, MarkdownRenderer};
use inkpress_render::{SiteContext, SiteRenderer};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Embed static assets (CSS, search script) at compile time so they are
// available after cargo install
static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../static");

/// Output subdirectory for stylesheet, scripts and custom static files
const STATIC_DIR: &str = "static";

/// `<content>/attachments/**` is published under `/attachments/`
const ATTACHMENTS_DIR: &str = "attachments";

/// `<content>/extras/**` is published at the output root (CNAME, robots.txt)
const EXTRAS_DIR: &str = "extras";

/// Command-line settings that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub include_drafts: bool,
    pub output: Option<PathBuf>,
}

impl BuildOverrides {
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if self.include_drafts {
            config.build.include_drafts = true;
        }
        if let Some(output) = &self.output {
            // Relative to the working directory, not the config file
            let output = if output.is_absolute() {
                output.clone()
            } else {
                std::env::current_dir()
                    .context("Failed to resolve the working directory")?
                    .join(output)
            };
            config.set_output_dir(output);
        }
        Ok(())
    }
}

/// What one build produced
#[derive(Debug)]
pub struct BuildReport {
    pub output: BuildOutput,
    pub files_written: usize,
    pub output_dir: PathBuf,
}

/// `inkpress build`
pub fn build_command(config_path: &Path, overrides: BuildOverrides, strict: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config)?;

    let report = build_with_config(&config, strict)?;
    let model = &report.output.model;

    println!(
        "✓ Built {} posts and {} pages ({} files) into {}",
        model.posts().len(),
        model.pages().len(),
        report.files_written,
        report.output_dir.display()
    );
    if !report.output.failures.is_empty() {
        println!(
            "  {} file(s) skipped; see warnings above",
            report.output.failures.len()
        );
    }
    Ok(())
}

/// Run the pipeline, render every output file in memory, then write the
/// site. Nothing is written when the pipeline or rendering fails, or when
/// `strict` is set and any file was skipped.
pub fn build_with_config(config: &Config, strict: bool) -> Result<BuildReport> {
    tracing::info!("Building site: {}", config.site.title);

    let options = config
        .pipeline_options()
        .context("Invalid configuration")?;
    let renderer = MarkdownRenderer::new().with_site_url(&config.site.url);
    let output = build_site_with(&options, &renderer).context("Failed to build site")?;

    print_failures(&output.failures);
    if strict && !output.failures.is_empty() {
        bail!(
            "{} file(s) failed to build; nothing was written (--strict)",
            output.failures.len()
        );
    }

    let files = render_site(config, &output.model)?;

    let output_dir = config.output_dir();
    if config.build.clean_first {
        clean_output_dir(config, &output_dir)?;
    }
    fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

    for (rel, contents) in &files {
        let target = output_dir.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        fs::write(&target, contents).with_context(|| format!("Failed to write {:?}", target))?;
    }
    copy_assets(config, &output_dir)?;
    copy_content_files(config, &output_dir)?;

    tracing::info!("✓ Output written to {:?}", output_dir);

    Ok(BuildReport {
        output,
        files_written: files.len(),
        output_dir,
    })
}

fn print_failures(failures: &[Failure]) {
    for failure in failures {
        println!("warning: {}", failure);
    }
}

/// Every generated file as (path relative to the output dir, contents)
pub fn render_site(config: &Config, model: &SiteModel) -> Result<Vec<(PathBuf, String)>> {
    let posts_per_page = config.build.posts_per_page;
    let routes = site_routes(model, posts_per_page, config.build.with_search);
    check_routes(model, &routes).context("Generated pages would overwrite each other")?;

    let renderer = SiteRenderer::new(
        model,
        SiteContext::from_config(config, model),
        posts_per_page,
    );
    let mut files = Vec::with_capacity(routes.len() + 8);
    for route in &routes {
        let html = renderer
            .render(route)
            .with_context(|| format!("Failed to render {}", route.url))?;
        files.push((output_path(&route.url), html));
    }

    let feed_site = FeedSite {
        title: config.site.title.clone(),
        url: config.normalized_site_url(),
        author: config.site.author.clone(),
    };
    for feed in site_feeds(model, &feed_site, config.build.posts_per_feed) {
        files.push((output_path(&feed.url), feed.xml));
    }

    if config.build.with_search {
        let json = search_index_json(model).context("Failed to serialize search index")?;
        files.push((PathBuf::from("search_index.json"), json));
    }

    if config.build.with_sitemap {
        let urls = sitemap_urls(&routes, &config.normalized_site_url());
        files.push((PathBuf::from("sitemap.xml"), render_sitemap(&urls)));
    }

    tracing::info!("Rendered {} pages", routes.len());
    Ok(files)
}

/// Remove a previous build. Refuses to delete a directory that holds the
/// site's own sources.
fn clean_output_dir(config: &Config, output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        return Ok(());
    }

    let sources = std::iter::once(config.content_dir())
        .chain(config.pages_dir())
        .chain(config.static_dir());
    for source in sources {
        if source.starts_with(output_dir) {
            bail!(
                "Refusing to clean {:?}: it contains the source directory {:?}",
                output_dir,
                source
            );
        }
    }

    fs::remove_dir_all(output_dir)
        .with_context(|| format!("Failed to clean existing {:?}", output_dir))?;
    tracing::info!("Cleaned {:?}", output_dir);
    Ok(())
}

/// Copy bundled assets, then the site's own static files on top
fn copy_assets(config: &Config, output_dir: &Path) -> Result<()> {
    let static_out = output_dir.join(STATIC_DIR);
    extract_embedded_static(&static_out)?;
    tracing::debug!("Copied assets from embedded static bundle");

    if let Some(custom) = config.static_dir() {
        if custom.exists() {
            copy_dir(&custom, &static_out)?;
            tracing::info!("Copied static files from {:?}", custom);
        } else {
            tracing::warn!("Configured static path {:?} does not exist", custom);
        }
    }
    Ok(())
}

/// Copy attachments, then extras. Extras go last so they may replace
/// generated files.
fn copy_content_files(config: &Config, output_dir: &Path) -> Result<()> {
    let content = config.content_dir();

    let attachments = content.join(ATTACHMENTS_DIR);
    if attachments.is_dir() {
        let copied = copy_dir(&attachments, &output_dir.join(ATTACHMENTS_DIR))?;
        tracing::info!("Copied {} attachment(s) from {:?}", copied.files, attachments);
    } else {
        tracing::debug!("No attachments directory in {:?}", content);
    }

    let extras = content.join(EXTRAS_DIR);
    if extras.is_dir() {
        let copied = copy_dir(&extras, output_dir)?;
        for path in &copied.replaced {
            tracing::info!("Overriding existing file: {}", path.display());
        }
        tracing::info!("Copied {} extra file(s) from {:?}", copied.files, extras);
    }
    Ok(())
}

/// Outcome of [`copy_dir`]
#[derive(Debug, Default)]
struct Copied {
    files: usize,
    /// Paths, relative to the destination, that already existed
    replaced: Vec<PathBuf>,
}

fn copy_dir(src: &Path, dest: &Path) -> Result<Copied> {
    let mut copied = Copied::default();
    for entry in WalkDir::new(src)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(relative);
        if target.exists() {
            copied.replaced.push(relative.to_path_buf());
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)
            .with_context(|| format!("Failed to copy {:?} to {:?}", entry.path(), target))?;
        copied.files += 1;
    }
    Ok(copied)
}

fn extract_embedded_static(dest: &Path) -> Result<()> {
    for entry in STATIC_ASSETS.entries() {
        extract_entry(entry, dest)?;
    }
    Ok(())
}

fn extract_entry(entry: &include_dir::DirEntry, dest: &Path) -> Result<()> {
    match entry {
        include_dir::DirEntry::Dir(dir) => {
            for sub_entry in dir.entries() {
                extract_entry(sub_entry, dest)?;
            }
        }
        include_dir::DirEntry::File(file) => {
            let target = dest.join(file.path());
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, file.contents())
                .with_context(|| format!("Failed to write embedded static file to {:?}", target))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site(dir: &Path, extra: &str) -> Config {
        fs::create_dir_all(dir.join("posts")).unwrap();
        fs::write(
            dir.join("posts/hello.md"),
            "---\ntitle: Hello\ndate: 2024-03-02\ncategory: Notes\ntags: [rust]\n---\nHi [there](https://rust-lang.org).",
        )
        .unwrap();
        let config_path = dir.join("inkpress.yml");
        fs::write(
            &config_path,
            format!(
                "site:\n  title: Test\n  url: https://blog.dev\npaths:\n  content: posts\n  output: public\n{}",
                extra
            ),
        )
        .unwrap();
        Config::from_file(&config_path).unwrap()
    }

    #[test]
    fn test_render_site_file_set() {
        let dir = TempDir::new().unwrap();
        let config = site(
            dir.path(),
            "build:\n  with_search: true\n  with_sitemap: true\n",
        );
        let output = build_site_with(
            &config.pipeline_options().unwrap(),
            &MarkdownRenderer::new(),
        )
        .unwrap();

        let files = render_site(&config, &output.model).unwrap();
        let paths: Vec<PathBuf> = files.iter().map(|(p, _)| p.clone()).collect();
        for expected in [
            "index.html",
            "2024/03/02/hello.html",
            "tag/rust.html",
            "category/notes.html",
            "category/notes/feed.rss",
            "feed.atom",
            "search.html",
            "search_index.json",
            "sitemap.xml",
            "404.html",
        ] {
            let expected: PathBuf = expected.split('/').collect();
            assert!(paths.contains(&expected), "missing {:?}", expected);
        }
    }

    #[test]
    fn test_build_writes_output_and_assets() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path(), "");
        let report = build_with_config(&config, false).unwrap();

        let public = dir.path().join("public");
        assert_eq!(report.output_dir, public);
        let post = fs::read_to_string(public.join("2024/03/02/hello.html")).unwrap();
        assert!(post.contains("target=\"_blank\""));
        assert!(public.join("static/style.css").exists());
        assert!(!public.join("sitemap.xml").exists());
        assert!(!public.join("search.html").exists());
    }

    #[test]
    fn test_clean_refuses_to_delete_sources() {
        let dir = TempDir::new().unwrap();
        let mut config = site(dir.path(), "build:\n  clean_first: true\n");
        config.set_output_dir(PathBuf::from("."));
        let err = build_with_config(&config, false).unwrap_err();
        assert!(err.to_string().contains("Refusing to clean"));
        assert!(dir.path().join("posts/hello.md").exists());
    }

    #[test]
    fn test_strict_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path(), "");
        fs::write(dir.path().join("posts/broken.md"), "---\ndate: 2024-01-01\n---\n").unwrap();

        assert!(build_with_config(&config, true).is_err());
        assert!(!dir.path().join("public").exists());

        let report = build_with_config(&config, false).unwrap();
        assert_eq!(report.output.failures.len(), 1);
    }

    #[test]
    fn test_content_clashing_with_generated_pages_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path(), "  pages: pages\n");
        fs::write(dir.path().join("posts/index.md"), "---\ntitle: Home\n---\nMine").unwrap();
        fs::create_dir_all(dir.path().join("pages")).unwrap();
        fs::write(dir.path().join("pages/archive.md"), "---\ntitle: Old\n---\nMine").unwrap();

        let err = build_with_config(&config, false).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("/index.html is produced by"));
        assert!(message.contains("archive.md"));
        assert!(message.contains("the archive page"));
        assert!(!dir.path().join("public").exists());
    }

    #[test]
    fn test_attachments_and_extras_are_copied() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path(), "");
        let posts = dir.path().join("posts");
        fs::create_dir_all(posts.join("attachments/2024")).unwrap();
        fs::write(posts.join("attachments/2024/cat.png"), "png").unwrap();
        fs::create_dir_all(posts.join("extras/.well-known")).unwrap();
        fs::write(posts.join("extras/CNAME"), "blog.dev").unwrap();
        fs::write(posts.join("extras/.well-known/security.txt"), "contact").unwrap();
        fs::write(posts.join("extras/404.html"), "custom missing page").unwrap();

        let report = build_with_config(&config, false).unwrap();
        assert!(report.output.failures.is_empty());

        let public = dir.path().join("public");
        assert_eq!(
            fs::read_to_string(public.join("attachments/2024/cat.png")).unwrap(),
            "png"
        );
        assert_eq!(fs::read_to_string(public.join("CNAME")).unwrap(), "blog.dev");
        assert!(public.join(".well-known/security.txt").exists());
        assert_eq!(
            fs::read_to_string(public.join("404.html")).unwrap(),
            "custom missing page"
        );
        assert!(!public.join("extras").exists());
    }

    #[test]
    fn test_copy_dir_reports_replaced_files() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(src.join("robots.txt"), "new").unwrap();
        fs::write(src.join("nested/a.txt"), "a").unwrap();
        fs::write(dest.join("robots.txt"), "old").unwrap();

        let copied = copy_dir(&src, &dest).unwrap();
        assert_eq!(copied.files, 2);
        assert_eq!(copied.replaced, vec![PathBuf::from("robots.txt")]);
        assert_eq!(fs::read_to_string(dest.join("robots.txt")).unwrap(), "new");
    }
}
