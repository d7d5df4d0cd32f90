// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Placeholder Name Grammar
//!
//! Deployment manifests reference secrets through `((name))` placeholders.
//! This module owns the syntax of those placeholders and of the variable
//! names inside them:
//!
//! - a loose scan that finds every `((...))` token in arbitrary text
//!   (line breaks included), followed by
//! - strict validation of the extracted name.
//!
//! The two phases stay separate on purpose: a malformed token found by the
//! scan must surface as a visible [`NameSyntaxError`] instead of being
//! silently skipped by a stricter pattern.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Placeholder detection, name validation and namespace qualification

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static FULL_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\(([^()]+)\)\)$").expect("full placeholder pattern is valid"));

static EMBEDDED_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\([^()]*\)\)").expect("embedded placeholder pattern is valid"));

/// Legacy escape marker accepted as the first character of a placeholder body.
const BANG: char = '!';

/// Variable name syntax violations, one variant per rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameSyntaxError {
    #[error("'{0}' is not a placeholder, expected the form '((name))'")]
    NotAPlaceholder(String),

    #[error("Variable name must not be empty")]
    Empty,

    #[error("Variable name '{0}' must not end with a forward slash")]
    TrailingSlash(String),

    #[error("Variable name '{0}' must not contain two consecutive forward slashes")]
    DoubleSlash(String),

    #[error("Variable name '{0}' must not contain a dot before the last forward slash")]
    DotBeforeSlash(String),

    #[error("Variable name '{0}' must not have a segment that starts or ends with a dot")]
    SegmentDot(String),

    #[error("Variable name '{0}' must not contain two consecutive dots")]
    ConsecutiveDots(String),

    #[error("Variable name '{0}' may only contain '!' as its first character")]
    MisplacedBang(String),

    #[error("Variable name '{0}' must only contain alphanumeric, underscore, dash, dot or forward slash characters")]
    BadCharacter(String),
}

/// Raised when names must be absolute but some are not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RelativeNamesError {
    pub names: Vec<String>,
}

impl std::fmt::Display for RelativeNamesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let quoted: Vec<String> = self.names.iter().map(|n| format!("'{n}'")).collect();
        write!(
            f,
            "Relative paths are not allowed in this context. The following must be be switched to use absolute paths: {}",
            quoted.join(", ")
        )
    }
}

/// True iff `value` is exactly one `((...))` token with a non-empty body.
pub fn is_full_placeholder(value: &str) -> bool {
    FULL_PLACEHOLDER.is_match(value)
}

/// Every `((...))` token found anywhere in `text`, in order of appearance.
pub fn extract_placeholders(text: &str) -> Vec<String> {
    EMBEDDED_PLACEHOLDER
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Strip the delimiters and an optional leading `!`, then validate the name.
pub fn extract_name(placeholder: &str) -> Result<String, NameSyntaxError> {
    let body = placeholder
        .strip_prefix("((")
        .and_then(|rest| rest.strip_suffix("))"))
        .ok_or_else(|| NameSyntaxError::NotAPlaceholder(placeholder.to_string()))?;

    let name = body.strip_prefix(BANG).unwrap_or(body);
    validate_name(name)?;
    Ok(name.to_string())
}

/// Validate a bare variable name, reporting the first violated rule.
pub fn validate_name(name: &str) -> Result<(), NameSyntaxError> {
    let owned = || name.to_string();

    if name.is_empty() {
        return Err(NameSyntaxError::Empty);
    }
    if name.ends_with('/') {
        return Err(NameSyntaxError::TrailingSlash(owned()));
    }
    if name.contains("//") {
        return Err(NameSyntaxError::DoubleSlash(owned()));
    }
    if let Some(last_slash) = name.rfind('/') {
        if name[..last_slash].contains('.') {
            return Err(NameSyntaxError::DotBeforeSlash(owned()));
        }
    }
    if name
        .split('/')
        .any(|segment| segment.starts_with('.') || segment.ends_with('.'))
    {
        return Err(NameSyntaxError::SegmentDot(owned()));
    }
    if name.contains("..") {
        return Err(NameSyntaxError::ConsecutiveDots(owned()));
    }
    if name.contains(BANG) {
        return Err(NameSyntaxError::MisplacedBang(owned()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/' | '.'))
    {
        return Err(NameSyntaxError::BadCharacter(owned()));
    }

    Ok(())
}

pub fn is_absolute(name: &str) -> bool {
    name.starts_with('/')
}

/// Namespace a relative name under `/director/deployment/`.
pub fn qualify(name: &str, director: &str, deployment: &str) -> String {
    if is_absolute(name) {
        name.to_string()
    } else {
        format!("/{director}/{deployment}/{name}")
    }
}

/// Fail with every relative name listed once, in order of first appearance.
pub fn require_absolute<S: AsRef<str>>(names: &[S]) -> Result<(), RelativeNamesError> {
    let mut relative: Vec<String> = Vec::new();
    for name in names.iter().map(AsRef::as_ref) {
        if !is_absolute(name) && !relative.iter().any(|seen| seen == name) {
            relative.push(name.to_string());
        }
    }

    if relative.is_empty() {
        Ok(())
    } else {
        Err(RelativeNamesError { names: relative })
    }
}

/// A validated name split into the stored variable name and the dot-path
/// used to index into its structured value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderName {
    pub base: String,
    pub keys: Vec<String>,
}

impl PlaceholderName {
    /// Split `name` at the dots of its final segment. Expects a name that
    /// already passed [`validate_name`].
    pub fn parse(name: &str) -> Self {
        let (prefix, last) = match name.rfind('/') {
            Some(idx) => name.split_at(idx + 1),
            None => ("", name),
        };

        let mut parts = last.split('.');
        let head = parts.next().unwrap_or_default();

        Self {
            base: format!("{prefix}{head}"),
            keys: parts.map(str::to_string).collect(),
        }
    }

    /// Parse the placeholder token itself (`((name.key))`).
    pub fn from_placeholder(placeholder: &str) -> Result<Self, NameSyntaxError> {
        extract_name(placeholder).map(|name| Self::parse(&name))
    }
}
