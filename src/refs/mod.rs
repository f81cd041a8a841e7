//! Parsing of user-supplied references: pasted web URLs and bare IDs.

pub mod kinds;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{BcqError, Result};

static CARD_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(\d+)/buckets/(\d+)/card_tables/(cards|columns|lists|steps)/(\d+)(?:/.*)?$")
        .unwrap()
});
static RECORDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\d+)/buckets/(\d+)/([^/]+)/(\d+)(?:/.*)?$").unwrap());
static TYPE_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\d+)/buckets/(\d+)/([^/]+)/?$").unwrap());
static BUCKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\d+)/buckets/(\d+)/?$").unwrap());
static PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\d+)/projects/(\d+)/?$").unwrap());
static ACCOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/(\d+)/?$").unwrap());
static COMMENT_FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__recording_(\d+)").unwrap());

/// The normalized form of a pasted URL.
///
/// `project_id`, `recording_id` and `comment_id` are zero when absent. A
/// non-zero `recording_id` always comes with a non-zero `project_id`, and a
/// non-zero `comment_id` with a non-zero `recording_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CanonicalReference {
    pub account_id: String,
    pub project_id: i64,
    /// Canonical recording type (`Todo`, `Card`, `project`), empty for a
    /// bucket-only or account-only URL.
    pub recording_type: String,
    /// The raw path segment the type came from (`todos`, `cards`).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub segment: String,
    pub recording_id: i64,
    pub comment_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// A bare numeric ID with no account or project context.
    Id(i64),
    Url(CanonicalReference),
}

impl CanonicalReference {
    pub fn has_recording(&self) -> bool {
        self.recording_id != 0
    }

    pub fn has_project(&self) -> bool {
        self.project_id != 0
    }

    /// The singular slug for the referenced type (`todo`, `column`).
    pub fn singular_type(&self) -> String {
        if self.segment.is_empty() {
            return kinds::singular_for_canonical(&self.recording_type)
                .map(String::from)
                .unwrap_or_else(|| self.recording_type.clone());
        }
        kinds::singular_type(&self.segment)
    }

    /// One-line human description, e.g. `Todo #1 in project #2, comment #3`.
    pub fn summary(&self) -> String {
        let singular = self.singular_type();
        let label = capitalize(&singular);

        if self.has_recording() {
            let mut s = format!("{} #{} in project #{}", label, self.recording_id, self.project_id);
            if self.comment_id != 0 {
                s.push_str(&format!(", comment #{}", self.comment_id));
            }
            s
        } else if self.has_project() {
            if self.recording_type == "project" || self.recording_type.is_empty() {
                format!("Project #{}", self.project_id)
            } else {
                format!("{} list in project #{}", label, self.project_id)
            }
        } else {
            format!("Account #{}", self.account_id)
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_id(input: &str, digits: &str) -> Result<i64> {
    digits
        .parse::<i64>()
        .map_err(|_| BcqError::parse(input, format!("ID out of range: {}", digits)))
}

/// Quick check for whether `input` looks like a web URL rather than an ID or name.
pub fn is_url(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.starts_with("https://") || trimmed.starts_with("http://")
}

/// Parse a URL or bare numeric ID into a [`Reference`].
///
/// Never guesses: any path shape outside the known grammar is an error,
/// including `/buckets/{id}/{segment}` where the segment is not a known
/// resource type list.
pub fn parse(input: &str) -> Result<Reference> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(BcqError::parse(input, "empty reference"));
    }
    if is_numeric(raw) {
        return Ok(Reference::Id(parse_id(input, raw)?));
    }

    let path_and_rest = strip_origin(raw).ok_or_else(|| BcqError::parse(input, "not a URL"))?;

    let (before_fragment, fragment) = match path_and_rest.split_once('#') {
        Some((before, frag)) => (before, Some(frag)),
        None => (path_and_rest, None),
    };
    let path = before_fragment
        .split_once('?')
        .map(|(p, _)| p)
        .unwrap_or(before_fragment);

    let mut reference = match_path(input, path)?;
    if reference.has_recording() && !reference.has_project() {
        return Err(BcqError::parse(input, "recording without a project"));
    }

    if reference.has_recording() {
        if let Some(fragment) = fragment {
            reference.comment_id = parse_fragment(input, fragment)?;
        }
    }
    Ok(Reference::Url(reference))
}

/// Parse, requiring a URL. Bare IDs are rejected.
pub fn parse_url(input: &str) -> Result<CanonicalReference> {
    match parse(input)? {
        Reference::Url(r) => Ok(r),
        Reference::Id(_) => Err(BcqError::parse(input, "expected a URL, got a bare ID")),
    }
}

/// Remove `scheme://host` (or a scheme-less `host`) and return the path onward.
fn strip_origin(raw: &str) -> Option<&str> {
    if raw.starts_with('/') {
        return Some(raw);
    }

    let after_scheme = match raw.split_once("://") {
        Some((scheme, rest)) => {
            if !scheme.eq_ignore_ascii_case("https") && !scheme.eq_ignore_ascii_case("http") {
                return None;
            }
            rest
        }
        None => raw,
    };

    let host_end = after_scheme
        .find(&['/', '?', '#'][..])
        .unwrap_or(after_scheme.len());
    let host = &after_scheme[..host_end];
    if host.is_empty() || (!raw.contains("://") && !host.contains('.')) {
        return None;
    }
    Some(&after_scheme[host_end..])
}

fn match_path(input: &str, path: &str) -> Result<CanonicalReference> {
    if let Some(c) = CARD_TABLE_RE.captures(path) {
        let segment = &c[3];
        return Ok(CanonicalReference {
            account_id: c[1].to_string(),
            project_id: parse_id(input, &c[2])?,
            recording_type: kinds::canonical_type(segment),
            segment: segment.to_string(),
            recording_id: parse_id(input, &c[4])?,
            comment_id: 0,
        });
    }

    if let Some(c) = RECORDING_RE.captures(path) {
        let segment = &c[3];
        return Ok(CanonicalReference {
            account_id: c[1].to_string(),
            project_id: parse_id(input, &c[2])?,
            recording_type: kinds::canonical_type(segment),
            segment: segment.to_string(),
            recording_id: parse_id(input, &c[4])?,
            comment_id: 0,
        });
    }

    if let Some(c) = BUCKET_RE.captures(path) {
        return Ok(CanonicalReference {
            account_id: c[1].to_string(),
            project_id: parse_id(input, &c[2])?,
            ..Default::default()
        });
    }

    if let Some(c) = TYPE_LIST_RE.captures(path) {
        let segment = &c[3];
        if !kinds::is_known(segment) {
            return Err(BcqError::parse(
                input,
                format!("unrecognized resource type '{}' without an ID", segment),
            ));
        }
        return Ok(CanonicalReference {
            account_id: c[1].to_string(),
            project_id: parse_id(input, &c[2])?,
            recording_type: kinds::canonical_type(segment),
            segment: segment.to_string(),
            ..Default::default()
        });
    }

    if let Some(c) = PROJECT_RE.captures(path) {
        return Ok(CanonicalReference {
            account_id: c[1].to_string(),
            project_id: parse_id(input, &c[2])?,
            recording_type: "project".into(),
            ..Default::default()
        });
    }

    if let Some(c) = ACCOUNT_RE.captures(path) {
        return Ok(CanonicalReference {
            account_id: c[1].to_string(),
            ..Default::default()
        });
    }

    Err(BcqError::parse(input, format!("unrecognized path {}", path)))
}

/// `#__recording_99` and `#99` carry a comment ID; other anchors are ignored.
fn parse_fragment(input: &str, fragment: &str) -> Result<i64> {
    if let Some(c) = COMMENT_FRAGMENT_RE.captures(fragment) {
        return parse_id(input, &c[1]);
    }
    if is_numeric(fragment) {
        return parse_id(input, fragment);
    }
    Ok(0)
}

/// The most specific ID in `arg`: recording, else project, else account.
/// Non-URL input is returned unchanged.
pub fn extract_id(arg: &str) -> String {
    match parse(arg) {
        Ok(Reference::Url(r)) if r.has_recording() => r.recording_id.to_string(),
        Ok(Reference::Url(r)) if r.has_project() => r.project_id.to_string(),
        Ok(Reference::Url(r)) => r.account_id,
        _ => arg.to_string(),
    }
}

pub fn extract_project_id(arg: &str) -> String {
    match parse(arg) {
        Ok(Reference::Url(r)) if r.has_project() => r.project_id.to_string(),
        _ => arg.to_string(),
    }
}

/// Returns `(recording_id, project_id)`; the project is `None` when `arg`
/// carries no project context.
pub fn extract_with_project(arg: &str) -> (String, Option<String>) {
    match parse(arg) {
        Ok(Reference::Url(r)) if r.has_recording() => (
            r.recording_id.to_string(),
            Some(r.project_id.to_string()),
        ),
        Ok(Reference::Url(r)) if r.has_project() => (String::new(), Some(r.project_id.to_string())),
        _ => (arg.to_string(), None),
    }
}

/// Like [`extract_with_project`] but prefers the comment ID from the fragment.
pub fn extract_comment_with_project(arg: &str) -> (String, Option<String>) {
    match parse(arg) {
        Ok(Reference::Url(r)) if r.comment_id != 0 => {
            (r.comment_id.to_string(), Some(r.project_id.to_string()))
        }
        _ => extract_with_project(arg),
    }
}
