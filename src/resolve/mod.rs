//! Turning user-typed project and person references into IDs.
//!
//! A token is tried as a numeric ID, then `me` (people only), then as a name
//! or email fragment against the completion cache. When the cache has
//! nothing for the collection the remote service is asked directly, and the
//! answer is written back to the cache for next time.

pub mod dock;

use serde::Serialize;
use tracing::debug;

use crate::api::Remote;
use crate::cache::hint::CacheHint;
use crate::cache::{CachedPerson, CachedProject, Store};
use crate::error::{BcqError, Result};

/// One row of a disambiguation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerItem {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    Selected(usize),
    Cancelled,
    /// No prompt surface (not a terminal, or the caller opted out).
    Unavailable,
}

/// Interactive disambiguation, supplied by the caller. Blocks until the
/// user answers.
pub trait Prompter: Send + Sync {
    fn pick(&self, title: &str, items: &[PickerItem]) -> Result<PickOutcome>;
}

/// Never prompts; ambiguous tokens become `Ambiguous` errors.
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn pick(&self, _title: &str, _items: &[PickerItem]) -> Result<PickOutcome> {
        Ok(PickOutcome::Unavailable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedSource {
    Id,
    Me,
    Cache,
    Live,
    Prompt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub id: String,
    pub name: String,
    pub source: ResolvedSource,
}

trait Candidate {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
    fn detail(&self) -> String {
        String::new()
    }
}

impl Candidate for CachedProject {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Candidate for CachedPerson {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn detail(&self) -> String {
        self.email_address.clone()
    }
}

/// Names used in messages for one kind of record.
struct Noun {
    resource: &'static str,
    singular: &'static str,
    plural: &'static str,
}

const PROJECT: Noun = Noun {
    resource: "Project",
    singular: "project",
    plural: "projects",
};

const PERSON: Noun = Noun {
    resource: "Person",
    singular: "person",
    plural: "people",
};

pub struct Resolver<'a> {
    store: &'a Store,
    remote: &'a dyn Remote,
    prompter: &'a dyn Prompter,
    current_user_id: Option<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a Store, remote: &'a dyn Remote) -> Self {
        Self {
            store,
            remote,
            prompter: &NonInteractive,
            current_user_id: None,
        }
    }

    pub fn with_prompter(mut self, prompter: &'a dyn Prompter) -> Self {
        self.prompter = prompter;
        self
    }

    /// The authenticated identity's user ID, used for `me`.
    pub fn with_current_user(mut self, user_id: Option<String>) -> Self {
        self.current_user_id = user_id.filter(|id| !id.is_empty());
        self
    }

    pub async fn resolve_project(&self, token: &str) -> Result<Resolved> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BcqError::Usage("Project name or ID required".into()));
        }
        if is_numeric(token) {
            return Ok(by_id(token));
        }

        let (projects, source) = self.projects().await?;
        self.select(&PROJECT, token, &projects, source)
    }

    pub async fn resolve_person(&self, token: &str) -> Result<Resolved> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BcqError::Usage("Person name, email or ID required".into()));
        }
        if is_numeric(token) {
            return Ok(by_id(token));
        }
        if token.eq_ignore_ascii_case("me") {
            return self.resolve_me();
        }

        let (people, source) = self.people().await?;
        if let Some(p) = people
            .iter()
            .find(|p| !p.email_address.is_empty() && p.email_address.eq_ignore_ascii_case(token))
        {
            debug!(token, id = p.id, "person matched by email");
            return Ok(found(p, source));
        }
        self.select(&PERSON, token, &people, source)
    }

    /// A configured user ID wins. Otherwise the identity cached by the
    /// accounts refresh is matched to a cached person by email, then name.
    fn resolve_me(&self) -> Result<Resolved> {
        // An unreadable cache does not block a configured `me`.
        let cache = self.store.load().ok();
        let people = cache.as_ref().map(|c| c.people.as_slice()).unwrap_or_default();

        if let Some(user_id) = self.current_user_id.clone() {
            let name = people
                .iter()
                .find(|p| p.id.to_string() == user_id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "me".to_string());
            return Ok(Resolved {
                id: user_id,
                name,
                source: ResolvedSource::Me,
            });
        }

        let identity = cache
            .as_ref()
            .and_then(|c| c.identity.as_ref())
            .ok_or_else(|| {
                BcqError::Auth(
                    "User ID not available; run `bcq accounts` or set account.user_id".into(),
                )
            })?;
        let person = people
            .iter()
            .find(|p| {
                !identity.email_address.is_empty()
                    && p.email_address.eq_ignore_ascii_case(&identity.email_address)
            })
            .or_else(|| {
                people
                    .iter()
                    .find(|p| !identity.name.is_empty() && p.name == identity.name)
            })
            .ok_or_else(|| {
                BcqError::Auth(format!(
                    "{} is not among the cached people; \
                     run `bcq completion refresh` or set account.user_id",
                    identity.name
                ))
            })?;

        debug!(id = person.id, "me matched to cached identity");
        Ok(Resolved {
            id: person.id.to_string(),
            name: person.name.clone(),
            source: ResolvedSource::Me,
        })
    }

    async fn projects(&self) -> Result<(Vec<CachedProject>, ResolvedSource)> {
        let cache = self.store.load()?;
        if !cache.projects.is_empty() {
            return Ok((cache.projects, ResolvedSource::Cache));
        }

        debug!("no cached projects, asking the service");
        let live = self.remote.list_projects().await?;
        CacheHint::new(self.store).projects(&live);
        Ok((live.iter().map(CachedProject::from).collect(), ResolvedSource::Live))
    }

    async fn people(&self) -> Result<(Vec<CachedPerson>, ResolvedSource)> {
        let cache = self.store.load()?;
        if !cache.people.is_empty() {
            return Ok((cache.people, ResolvedSource::Cache));
        }

        debug!("no cached people, asking the service");
        let live = self.remote.list_people().await?;
        CacheHint::new(self.store).people(&live);
        Ok((live.iter().map(CachedPerson::from).collect(), ResolvedSource::Live))
    }

    fn select<T: Candidate>(
        &self,
        noun: &Noun,
        token: &str,
        items: &[T],
        source: ResolvedSource,
    ) -> Result<Resolved> {
        let matches = match_name(token, items);
        match matches.as_slice() {
            [one] => {
                debug!(token, id = one.id(), ?source, "{} resolved", noun.singular);
                Ok(found(*one, source))
            }
            [] => Err(not_found(noun, token, items)),
            many => self.disambiguate(noun, token, many),
        }
    }

    fn disambiguate<T: Candidate>(&self, noun: &Noun, token: &str, matches: &[&T]) -> Result<Resolved> {
        let items: Vec<PickerItem> = matches
            .iter()
            .map(|m| PickerItem {
                id: m.id().to_string(),
                title: m.name().to_string(),
                description: m.detail(),
            })
            .collect();
        let title = format!("Multiple {} match \"{}\"", noun.plural, token);

        match self.prompter.pick(&title, &items)? {
            PickOutcome::Selected(i) => matches
                .get(i)
                .map(|m| found(*m, ResolvedSource::Prompt))
                .ok_or_else(|| BcqError::Usage(format!("Selection {} is out of range", i))),
            PickOutcome::Cancelled => Err(BcqError::Usage("Selection cancelled".into())),
            PickOutcome::Unavailable => Err(BcqError::Ambiguous {
                message: format!(
                    "Ambiguous {}: \"{}\" matches {} {}",
                    noun.singular,
                    token,
                    matches.len(),
                    noun.plural
                ),
                hint: candidate_hint(matches.iter().map(|m| (m.name(), m.id()))),
            }),
        }
    }
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn by_id(token: &str) -> Resolved {
    Resolved {
        id: token.to_string(),
        name: String::new(),
        source: ResolvedSource::Id,
    }
}

fn found<T: Candidate>(item: &T, source: ResolvedSource) -> Resolved {
    Resolved {
        id: item.id().to_string(),
        name: item.name().to_string(),
        source,
    }
}

/// `Specify ID directly. Available:` followed by one `  - Name (ID: n)` line
/// per candidate.
pub(crate) fn candidate_hint<'n>(candidates: impl Iterator<Item = (&'n str, i64)>) -> String {
    let mut hint = String::from("Specify ID directly. Available:");
    for (name, id) in candidates {
        hint.push_str(&format!("\n  - {} (ID: {})", name, id));
    }
    hint
}

/// Exact name, then case-insensitive equality, then case-insensitive
/// substring. The first phase with any hit wins.
fn match_name<'i, T: Candidate>(token: &str, items: &'i [T]) -> Vec<&'i T> {
    let exact: Vec<&T> = items.iter().filter(|i| i.name() == token).collect();
    if !exact.is_empty() {
        return exact;
    }

    let lower = token.to_lowercase();
    let folded: Vec<&T> = items
        .iter()
        .filter(|i| i.name().to_lowercase() == lower)
        .collect();
    if !folded.is_empty() {
        return folded;
    }

    items
        .iter()
        .filter(|i| i.name().to_lowercase().contains(&lower))
        .collect()
}

fn not_found<T: Candidate>(noun: &Noun, token: &str, items: &[T]) -> BcqError {
    let suggestions = suggest(token, items);
    if suggestions.is_empty() {
        BcqError::not_found(noun.resource, token)
    } else {
        BcqError::not_found_hint(
            noun.resource,
            token,
            format!("Did you mean: {}", suggestions.join(", ")),
        )
    }
}

/// Up to three names sharing a two-character prefix with `token`, or
/// containing one of its words.
fn suggest<T: Candidate>(token: &str, items: &[T]) -> Vec<String> {
    let lower = token.to_lowercase();
    items
        .iter()
        .filter(|item| {
            let name = item.name().to_lowercase();
            let common = name
                .chars()
                .zip(lower.chars())
                .take_while(|(a, b)| a == b)
                .count();
            common >= 2
                || lower
                    .split_whitespace()
                    .any(|word| word.chars().count() >= 2 && name.contains(word))
        })
        .take(3)
        .map(|item| item.name().to_string())
        .collect()
}
