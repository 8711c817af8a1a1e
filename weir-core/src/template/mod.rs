use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Resource holding the decoded endpoint request.
pub const INPUT_RESOURCE: &str = "input";
/// Resource holding the active error context inside an error path.
pub const ERROR_RESOURCE: &str = "error";
/// Resource addressing the current iteration scope of a child store.
pub const STACK_RESOURCE: &str = "stack";

/// Resources that may never be claimed as a node id and never create
/// dependency edges.
pub const RESERVED_RESOURCES: [&str; 3] = [INPUT_RESOURCE, ERROR_RESOURCE, STACK_RESOURCE];

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_]+$").expect("valid regex"));
static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\.\-_]+$").expect("valid regex"));

pub fn is_reserved(resource: &str) -> bool {
    RESERVED_RESOURCES.contains(&resource)
}

/// Sub-map of a resource frame a reference reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[default]
    Body,
    Header,
    Error,
}

/// A `(resource, path)` pointer at another property's runtime value.
///
/// The textual form is `{{ resource:dotted.path }}`; a section may be
/// addressed as `{{ resource.header:key }}`. The surrounding braces are
/// optional so references can be written bare inside manifests.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    pub resource: String,
    pub section: Section,
    pub path: String,
}

impl Reference {
    pub fn new(resource: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            section: Section::Body,
            path: path.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.section {
            Section::Body => write!(f, "{}:{}", self.resource, self.path),
            Section::Header => write!(f, "{}.header:{}", self.resource, self.path),
            Section::Error => write!(f, "{}.error:{}", self.resource, self.path),
        }
    }
}

impl TryFrom<String> for Reference {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, TemplateError> {
        parse(&value)
    }
}

impl From<Reference> for String {
    fn from(reference: Reference) -> String {
        format!("{{{{ {reference} }}}}")
    }
}

/// Parse a reference expression, with or without the surrounding braces.
pub fn parse(input: &str) -> Result<Reference, TemplateError> {
    let trimmed = input.trim();
    let inner = match trimmed.strip_prefix("{{") {
        Some(rest) => rest
            .strip_suffix("}}")
            .ok_or(TemplateError::UnclosedExpression)?,
        None => {
            if trimmed.ends_with("}}") {
                return Err(TemplateError::UnclosedExpression);
            }
            trimmed
        }
    };

    let inner = inner.trim();
    let (resource_part, path) = inner
        .split_once(':')
        .ok_or_else(|| TemplateError::MissingSeparator(inner.to_string()))?;

    let (resource, section) = match resource_part.split_once('.') {
        None => (resource_part, Section::Body),
        Some((resource, "header")) => (resource, Section::Header),
        Some((resource, "error")) => (resource, Section::Error),
        Some((_, section)) => return Err(TemplateError::InvalidSection(section.to_string())),
    };

    if resource.is_empty() {
        return Err(TemplateError::EmptyResource);
    }
    if !NAME_RE.is_match(resource) {
        return Err(TemplateError::InvalidName(resource.to_string()));
    }
    if path.is_empty() {
        return Err(TemplateError::EmptyPath);
    }
    if !PATH_RE.is_match(path) {
        return Err(TemplateError::InvalidName(path.to_string()));
    }

    Ok(Reference {
        resource: resource.to_string(),
        section,
        path: path.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed template expression (missing '}}}}')")]
    UnclosedExpression,
    #[error("reference '{0}' is missing the ':' separator")]
    MissingSeparator(String),
    #[error("reference resource must not be empty")]
    EmptyResource,
    #[error("reference path must not be empty")]
    EmptyPath,
    #[error("invalid name segment: {0}")]
    InvalidName(String),
    #[error("unknown resource section: {0}")]
    InvalidSection(String),
}
