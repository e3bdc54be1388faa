//! Mime-type groups: decide whether a document is eligible for conversion.
//!
//! A group is a name ("pdf", "word", "openoffice", …) mapped to a list of
//! patterns. A pattern without `*` must equal the mime type exactly; a
//! pattern with `*` matches any sequence in that position, so
//! `application/vnd.oasis.opendocument.*` covers every ODF flavour.
//! Patterns are compiled once when the registry is built.

use crate::error::DocViewError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Mime type of PDF documents.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Group name that identifies sources which need no PDF conversion.
pub const PDF_GROUP: &str = "pdf";

static DEFAULT_REGISTRY: Lazy<MimeRegistry> = Lazy::new(|| {
    let table: &[(&str, &[&str])] = &[
        (PDF_GROUP, &[PDF_MIME_TYPE]),
        (
            "word",
            &[
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.*",
                "application/vnd.ms-word.*",
            ],
        ),
        (
            "excel",
            &[
                "application/vnd.ms-excel",
                "application/vnd.ms-excel.*",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.*",
            ],
        ),
        (
            "powerpoint",
            &[
                "application/vnd.ms-powerpoint",
                "application/vnd.ms-powerpoint.*",
                "application/vnd.openxmlformats-officedocument.presentationml.*",
            ],
        ),
        (
            "openoffice",
            &[
                "application/vnd.oasis.opendocument.*",
                "application/vnd.sun.xml.*",
            ],
        ),
        ("rtf", &["application/rtf", "text/rtf"]),
        ("text", &["text/plain"]),
    ];
    let mut registry = MimeRegistry::empty();
    for (group, patterns) in table {
        for pattern in *patterns {
            registry.push_compiled(group, MimePattern::compile_infallible(pattern));
        }
    }
    registry
});

/// A single compiled pattern.
#[derive(Debug, Clone)]
enum MimePattern {
    Exact(String),
    Glob { source: String, regex: Regex },
}

impl MimePattern {
    fn compile(pattern: &str) -> Result<Self, DocViewError> {
        if !pattern.contains('*') {
            return Ok(MimePattern::Exact(pattern.to_string()));
        }
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$")).map_err(|e| {
            DocViewError::InvalidConfig(format!("mime pattern '{pattern}': {e}"))
        })?;
        Ok(MimePattern::Glob {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Built-in patterns are escaped before compiling, so this cannot fail.
    fn compile_infallible(pattern: &str) -> Self {
        Self::compile(pattern).unwrap_or_else(|_| MimePattern::Exact(pattern.to_string()))
    }

    fn matches(&self, mime_type: &str) -> bool {
        match self {
            MimePattern::Exact(p) => p == mime_type,
            MimePattern::Glob { regex, .. } => regex.is_match(mime_type),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            MimePattern::Exact(p) => p,
            MimePattern::Glob { source, .. } => source,
        }
    }
}

/// Named sets of mime-type patterns.
#[derive(Debug, Clone, Default)]
pub struct MimeRegistry {
    groups: BTreeMap<String, Vec<MimePattern>>,
}

impl MimeRegistry {
    /// A registry with no groups; every lookup is false.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table (pdf, word, excel, powerpoint, openoffice, rtf, text).
    pub fn with_defaults() -> Self {
        DEFAULT_REGISTRY.clone()
    }

    /// Build a registry from `group → patterns`.
    pub fn from_map<I, G, P>(groups: I) -> Result<Self, DocViewError>
    where
        I: IntoIterator<Item = (G, Vec<P>)>,
        G: Into<String>,
        P: AsRef<str>,
    {
        let mut registry = Self::empty();
        for (group, patterns) in groups {
            let group = group.into();
            for pattern in patterns {
                registry.push_compiled(&group, MimePattern::compile(pattern.as_ref())?);
            }
        }
        Ok(registry)
    }

    /// Parse a JSON object of the form `{ "pdf": ["application/pdf"], … }`.
    pub fn from_json(json: &str) -> Result<Self, DocViewError> {
        let map: BTreeMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| DocViewError::InvalidConfig(format!("mime groups JSON: {e}")))?;
        Self::from_map(map)
    }

    /// Add (or extend) a group.
    pub fn register(&mut self, group: &str, pattern: &str) -> Result<(), DocViewError> {
        self.push_compiled(group, MimePattern::compile(pattern)?);
        Ok(())
    }

    fn push_compiled(&mut self, group: &str, pattern: MimePattern) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .push(pattern);
    }

    /// Patterns registered for a group, if any.
    pub fn patterns(&self, group: &str) -> Option<Vec<&str>> {
        self.groups
            .get(group)
            .map(|ps| ps.iter().map(MimePattern::as_str).collect())
    }

    /// Does `mime_type` belong to any of `groups`?
    ///
    /// Returns false for a missing mime type, unknown groups, or no match.
    pub fn belongs_to_group<'g>(
        &self,
        mime_type: Option<&str>,
        groups: impl Into<GroupNames<'g>>,
    ) -> bool {
        let Some(mime_type) = mime_type else {
            return false;
        };
        groups.into().iter().any(|group| {
            self.groups
                .get(group)
                .is_some_and(|patterns| patterns.iter().any(|p| p.matches(mime_type)))
        })
    }

    /// Shorthand for membership in the `pdf` group.
    pub fn is_pdf(&self, mime_type: Option<&str>) -> bool {
        self.belongs_to_group(mime_type, PDF_GROUP)
    }
}

/// A list of group names, given either as a list or as a
/// comma/space-separated string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNames<'a>(Vec<std::borrow::Cow<'a, str>>);

impl<'a> GroupNames<'a> {
    /// Split `"pdf, word openoffice"` into its names.
    pub fn parse(spec: &'a str) -> Self {
        GroupNames(
            spec.split([',', ' '])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(std::borrow::Cow::Borrowed)
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.as_ref())
    }
}

impl<'a> From<&'a str> for GroupNames<'a> {
    fn from(spec: &'a str) -> Self {
        GroupNames::parse(spec)
    }
}

impl<'a> From<&'a [&'a str]> for GroupNames<'a> {
    fn from(names: &'a [&'a str]) -> Self {
        GroupNames(names.iter().map(|s| std::borrow::Cow::Borrowed(*s)).collect())
    }
}

impl<'a> From<&'a [String]> for GroupNames<'a> {
    fn from(names: &'a [String]) -> Self {
        GroupNames(names.iter().map(|s| std::borrow::Cow::Borrowed(s.as_str())).collect())
    }
}

impl<'a> From<&'a Vec<String>> for GroupNames<'a> {
    fn from(names: &'a Vec<String>) -> Self {
        GroupNames::from(names.as_slice())
    }
}

/// Guess a mime type from a file extension.
pub fn mime_from_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => PDF_MIME_TYPE,

        // Microsoft Office
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",

        // OpenDocument
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "odg" => "application/vnd.oasis.opendocument.graphics",

        // Other documents
        "rtf" => "application/rtf",
        "txt" => "text/plain",

        // Renditions
        "swf" => "application/x-shockwave-flash",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",

        _ => "application/octet-stream",
    }
}

/// Guess a mime type from a file path.
pub fn mime_from_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map(mime_from_extension)
        .unwrap_or("application/octet-stream")
}
