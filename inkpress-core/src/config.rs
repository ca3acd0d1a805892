//! Configuration parsing and management.

use crate::dates::{parse_offset, DateError};
use crate::entry::SiteDefaults;
use crate::pipeline::PipelineOptions;
use chrono::FixedOffset;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file names, searched in order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["inkpress.yml", "inkpress.yaml"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid build.timezone: {0}")]
    Timezone(#[from] DateError),
}

/// Main configuration struct matching the inkpress.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    pub paths: PathsConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub server: ServerConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub subtitle: String,

    #[serde(default)]
    pub description: String,

    /// Absolute base URL, e.g. `https://example.com`
    #[serde(default)]
    pub url: String,

    /// Default author for posts that do not name one
    #[serde(default)]
    pub author: Option<String>,

    #[serde(default, deserialize_with = "deserialize_keywords")]
    pub keywords: Vec<String>,
}

fn default_title() -> String {
    String::from("My Blog")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: String::new(),
            description: String::new(),
            url: String::new(),
            author: None,
            keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the chronological post tree
    pub content: PathBuf,

    /// Root of the static page tree
    #[serde(default)]
    pub pages: Option<PathBuf>,

    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Extra files copied verbatim into the output's `static/` directory
    #[serde(default, rename = "static")]
    pub static_files: Option<PathBuf>,
}

fn default_output() -> PathBuf {
    PathBuf::from("output")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub include_drafts: bool,

    #[serde(default = "default_posts_per_feed")]
    pub posts_per_feed: usize,

    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: usize,

    /// Fixed UTC offset used for naive timestamps and archive bucketing
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub with_search: bool,

    #[serde(default)]
    pub with_sitemap: bool,

    #[serde(default)]
    pub clean_first: bool,
}

fn default_posts_per_feed() -> usize {
    20
}

fn default_posts_per_page() -> usize {
    10
}

fn default_timezone() -> String {
    String::from("Z")
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            include_drafts: false,
            posts_per_feed: default_posts_per_feed(),
            posts_per_page: default_posts_per_page(),
            timezone: default_timezone(),
            with_search: false,
            with_sitemap: false,
            clean_first: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Keywords may be a YAML list or one comma-separated string.
fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    let raw: Vec<String> = match value {
        serde_yaml::Value::String(s) => s.split(',').map(str::to_string).collect(),
        serde_yaml::Value::Sequence(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_yaml::Value::String(s) => Some(s),
                serde_yaml::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(raw
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect())
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse configuration from YAML text. Relative paths stay relative to
    /// the working directory.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.site_offset()?;
        Ok(config)
    }

    /// Look for one of the default config files in `dir`
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Get the post content directory, resolved relative to config file
    pub fn content_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.content)
    }

    /// Get the static page directory, if configured
    pub fn pages_dir(&self) -> Option<PathBuf> {
        self.paths.pages.as_ref().map(|p| self.resolve_path(p))
    }

    /// Get the custom static directory, if configured
    pub fn static_dir(&self) -> Option<PathBuf> {
        self.paths.static_files.as_ref().map(|p| self.resolve_path(p))
    }

    /// Get the output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Override the output directory (e.g. from the command line)
    pub fn set_output_dir(&mut self, output: PathBuf) {
        self.paths.output = output;
    }

    /// Configured timezone as a fixed offset
    pub fn site_offset(&self) -> Result<FixedOffset, ConfigError> {
        Ok(parse_offset(&self.build.timezone)?)
    }

    /// Site URL without a trailing slash (empty when unset)
    pub fn normalized_site_url(&self) -> String {
        normalize_site_url(&self.site.url)
    }

    /// The immutable value threaded through scanning and entity building
    pub fn pipeline_options(&self) -> Result<PipelineOptions, ConfigError> {
        Ok(PipelineOptions {
            content_root: self.content_dir(),
            pages_root: self.pages_dir(),
            include_drafts: self.build.include_drafts,
            defaults: SiteDefaults {
                default_author: self.site.author.clone(),
                site_offset: self.site_offset()?,
            },
        })
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.config_path.as_ref().and_then(|p| p.parent()) {
            Some(parent) => parent.join(path),
            None => path.to_path_buf(),
        }
    }
}

/// Strip trailing slashes from a site URL
pub fn normalize_site_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
