//! Shell completion candidates drawn from the cache alone. Nothing here
//! touches the network; an empty cache just yields fewer candidates.

use std::cmp::Ordering;

use serde::Serialize;

use super::{Cache, CachedProject};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub value: String,
    pub description: String,
}

impl Candidate {
    fn new(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: description.into(),
        }
    }
}

/// Projects whose name contains `prefix` (case-insensitive), ranked: HQ
/// first, then bookmarked, then most recently updated, then by name.
pub fn project_candidates(cache: &Cache, prefix: &str) -> Vec<Candidate> {
    let needle = prefix.to_lowercase();
    let mut ranked: Vec<&CachedProject> = cache
        .projects
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect();
    ranked.sort_by(|a, b| rank_projects(a, b));

    ranked
        .into_iter()
        .map(|p| Candidate::new(p.id.to_string(), p.name.clone()))
        .collect()
}

fn rank_projects(a: &CachedProject, b: &CachedProject) -> Ordering {
    let is_hq = |p: &CachedProject| p.purpose.as_deref() == Some("hq");
    is_hq(b)
        .cmp(&is_hq(a))
        .then_with(|| b.bookmarked.cmp(&a.bookmarked))
        // Newest first; projects with no timestamp sort after dated ones.
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

/// `me` when it matches, then people sorted by name whose name contains
/// `prefix` or whose email starts with it.
pub fn people_candidates(cache: &Cache, prefix: &str) -> Vec<Candidate> {
    let needle = prefix.to_lowercase();
    let mut candidates = Vec::new();
    if "me".starts_with(&needle) {
        candidates.push(Candidate::new("me", "Current authenticated user"));
    }

    let mut people: Vec<_> = cache
        .people
        .iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.email_address.to_lowercase().starts_with(&needle)
        })
        .collect();
    people.sort_by_key(|p| p.name.to_lowercase());

    candidates.extend(people.into_iter().map(|p| {
        let description = if p.email_address.is_empty() {
            p.name.clone()
        } else {
            format!("{} <{}>", p.name, p.email_address)
        };
        Candidate::new(p.id.to_string(), description)
    }));
    candidates
}
