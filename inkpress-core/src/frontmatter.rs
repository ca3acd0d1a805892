//! Frontmatter splitting and decoding.
//!
//! A document may open with a `---` line, a YAML mapping, and a closing
//! `---` line. The mapping is decoded into a schemaless [`Frontmatter`];
//! typed extraction happens field by field through the accessors below so
//! that each field has exactly one failure mode.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

const DELIMITER: &str = "---";

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("{origin}: frontmatter block is never closed")]
    Unterminated { origin: String },

    #[error("{origin}: invalid YAML in frontmatter: {error}")]
    Yaml {
        origin: String,
        #[source]
        error: serde_yaml::Error,
    },

    #[error("{origin}: frontmatter must be a mapping")]
    NotAMapping { origin: String },
}

/// A frontmatter field holds a value of the wrong shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field `{field}` must be {expected}")]
pub struct FieldError {
    pub field: String,
    pub expected: &'static str,
}

impl FieldError {
    fn new(field: &str, expected: &'static str) -> Self {
        Self {
            field: field.to_string(),
            expected,
        }
    }
}

/// Decoded frontmatter: string keys to arbitrary YAML values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    fields: Mapping,
}

impl Frontmatter {
    pub fn from_mapping(fields: Mapping) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Raw value for `key`. Explicit `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.fields.get(key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    /// A scalar field rendered as a string. Numbers and booleans are
    /// accepted and stringified; sequences and mappings are rejected.
    pub fn string(&self, key: &str) -> Result<Option<String>, FieldError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => scalar_to_string(value)
                .map(Some)
                .ok_or_else(|| FieldError::new(key, "a string")),
        }
    }

    /// A boolean field. YAML booleans plus the strings `true`/`false`/`yes`/`no`.
    pub fn boolean(&self, key: &str) -> Result<Option<bool>, FieldError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(Some(true)),
                "false" | "no" => Ok(Some(false)),
                _ => Err(FieldError::new(key, "a boolean")),
            },
            Some(_) => Err(FieldError::new(key, "a boolean")),
        }
    }

    /// A list field given either as a YAML sequence of scalars or as one
    /// comma-separated string. Items are returned untrimmed and unfiltered.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, FieldError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(s.split(',').map(str::to_string).collect()),
            Some(Value::Sequence(items)) => items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| {
                    scalar_to_string(item)
                        .ok_or_else(|| FieldError::new(key, "a list of strings"))
                })
                .collect(),
            Some(value) => scalar_to_string(value)
                .map(|s| vec![s])
                .ok_or_else(|| FieldError::new(key, "a list of strings")),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Split a raw document into frontmatter and body.
///
/// `origin` names the document in errors (usually its path).
///
/// # Example
///
/// ```
/// use inkpress_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntitle: My Post\ndate: 2025-01-01\n---\n# Hello World\n";
///
/// let (fm, body) = parse_frontmatter(content, "post.md").unwrap();
/// assert_eq!(fm.string("title").unwrap().as_deref(), Some("My Post"));
/// assert_eq!(fm.string("date").unwrap().as_deref(), Some("2025-01-01"));
/// assert!(body.trim().starts_with("# Hello World"));
/// ```
pub fn parse_frontmatter(
    content: &str,
    origin: &str,
) -> Result<(Frontmatter, String), FrontmatterError> {
    let text = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = text.split_inclusive('\n');

    let Some(first) = lines.next().filter(|line| is_delimiter(line)) else {
        return Ok((Frontmatter::default(), content.to_string()));
    };

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if is_delimiter(line) {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            let frontmatter = decode_mapping(yaml, origin)?;
            return Ok((frontmatter, body.to_string()));
        }
        offset += line.len();
    }

    Err(FrontmatterError::Unterminated {
        origin: origin.to_string(),
    })
}

fn decode_mapping(yaml: &str, origin: &str) -> Result<Frontmatter, FrontmatterError> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    let value: Value = serde_yaml::from_str(yaml).map_err(|error| FrontmatterError::Yaml {
        origin: origin.to_string(),
        error,
    })?;

    match value {
        Value::Mapping(fields) => Ok(Frontmatter::from_mapping(fields)),
        Value::Null => Ok(Frontmatter::default()),
        _ => Err(FrontmatterError::NotAMapping {
            origin: origin.to_string(),
        }),
    }
}
