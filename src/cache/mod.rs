//! File-backed completion cache of projects, people and accounts.
//!
//! The three collections are written independently, each with its own
//! timestamp. A collection whose timestamp is `None` has never been
//! populated; a collection refreshed to an empty list still gets one.

pub mod complete;
pub mod hint;
pub mod refresh;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::types::{Account, Identity, Person, Project};
use crate::error::{BcqError, Result};

pub const CACHE_VERSION: u32 = 1;
pub const CACHE_FILE_NAME: &str = "completion.json";
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Ranking fields are optional so caches written before they existed
/// still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProject {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bookmarked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPerson {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAccount {
    pub id: i64,
    pub name: String,
}

/// The signed-in identity from launchpad. Its ID is a launchpad ID, not a
/// person ID; `me` is matched against cached people by email or name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedIdentity {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email_address: String,
}

impl From<&Project> for CachedProject {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            purpose: p.purpose.clone().filter(|purpose| !purpose.is_empty()),
            bookmarked: p.bookmarked,
            updated_at: p.updated_at,
        }
    }
}

impl From<&Person> for CachedPerson {
    fn from(p: &Person) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            email_address: p.email_address.clone().unwrap_or_default(),
        }
    }
}

impl From<&Identity> for CachedIdentity {
    fn from(i: &Identity) -> Self {
        let name = format!("{} {}", i.first_name, i.last_name).trim().to_string();
        Self {
            id: i.id,
            name,
            email_address: i.email_address.clone().unwrap_or_default(),
        }
    }
}

impl From<&Account> for CachedAccount {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cache {
    #[serde(default)]
    pub projects: Vec<CachedProject>,
    #[serde(default)]
    pub people: Vec<CachedPerson>,
    #[serde(default)]
    pub accounts: Vec<CachedAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<CachedIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects_updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub people_updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u32,
}

impl Cache {
    fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            ..Default::default()
        }
    }

    /// Oldest of the projects/people timestamps, `None` if either is unset.
    pub fn oldest_projects_people(&self) -> Option<DateTime<Utc>> {
        let projects = self.projects_updated_at?;
        let people = self.people_updated_at?;
        Some(projects.min(people))
    }

    /// Projects and people are refreshed together and judged together.
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match self.oldest_projects_people() {
            Some(oldest) => older_than(oldest, max_age, now),
            None => true,
        }
    }

    /// Accounts refresh on identity lookups, so they age on their own.
    pub fn accounts_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match self.accounts_updated_at {
            Some(at) => older_than(at, max_age, now),
            None => true,
        }
    }
}

fn older_than(at: DateTime<Utc>, max_age: Duration, now: DateTime<Utc>) -> bool {
    // Timestamps from the future (clock skew) count as fresh.
    (now - at)
        .to_std()
        .map(|age| age > max_age)
        .unwrap_or(false)
}

/// Snapshot of the cache for `completion status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub path: PathBuf,
    pub projects: usize,
    pub people: usize,
    pub accounts: usize,
    pub projects_updated_at: Option<DateTime<Utc>>,
    pub people_updated_at: Option<DateTime<Utc>>,
    pub accounts_updated_at: Option<DateTime<Utc>>,
    pub age_secs: Option<i64>,
    pub stale: bool,
    pub accounts_stale: bool,
}

pub struct Store {
    dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// A store at [`Store::default_dir`].
    pub fn from_env() -> Self {
        Self::new(Self::default_dir())
    }

    /// `BCQ_CACHE_DIR`, then `BASECAMP_CACHE_DIR`, then `$XDG_CACHE_HOME/bcq`,
    /// then the platform cache directory. Config files are never consulted:
    /// shell completion runs before any config is loaded.
    pub fn default_dir() -> PathBuf {
        ["BCQ_CACHE_DIR", "BASECAMP_CACHE_DIR"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("XDG_CACHE_HOME")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(|xdg| PathBuf::from(xdg).join("bcq"))
            })
            .or_else(|| directories::BaseDirs::new().map(|dirs| dirs.cache_dir().join("bcq")))
            .unwrap_or_else(|| PathBuf::from(".bcq-cache"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    /// Read the cache. A missing file is an empty cache; an unreadable or
    /// undecodable one is a `Store` error.
    pub fn load(&self) -> Result<Cache> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load_unlocked()
    }

    fn load_unlocked(&self) -> Result<Cache> {
        let path = self.path();
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Cache::empty()),
            Err(e) => return Err(BcqError::store(path, e)),
        };
        serde_json::from_slice(&data).map_err(|e| BcqError::store(path, e))
    }

    /// Write via a temp file in the same directory and rename over the
    /// target, so readers see either the old or the new file.
    fn save_unlocked(&self, cache: &mut Cache) -> Result<()> {
        let path = self.path();
        cache.version = CACHE_VERSION;

        std::fs::create_dir_all(&self.dir).map_err(|e| BcqError::store(&path, e))?;
        let data = serde_json::to_vec_pretty(cache).map_err(|e| BcqError::store(&path, e))?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| BcqError::store(&path, e))?;
        tmp.write_all(&data)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| BcqError::store(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| BcqError::store(&path, e.error))?;

        debug!(path = %path.display(), "completion cache written");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Cache)) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut cache = match self.load_unlocked() {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "replacing unreadable completion cache");
                Cache::empty()
            }
        };
        apply(&mut cache);
        self.save_unlocked(&mut cache)
    }

    /// Replace the projects collection and stamp it; people and accounts
    /// are left exactly as they were on disk.
    pub fn update_projects(&self, projects: Vec<CachedProject>) -> Result<()> {
        self.update(|cache| {
            cache.projects = projects;
            cache.projects_updated_at = Some(Utc::now());
        })
    }

    pub fn update_people(&self, people: Vec<CachedPerson>) -> Result<()> {
        self.update(|cache| {
            cache.people = people;
            cache.people_updated_at = Some(Utc::now());
        })
    }

    pub fn update_accounts(&self, accounts: Vec<CachedAccount>) -> Result<()> {
        self.update(|cache| {
            cache.accounts = accounts;
            cache.accounts_updated_at = Some(Utc::now());
        })
    }

    /// Accounts plus the identity they were listed for, in one write.
    pub fn update_authorization(
        &self,
        accounts: Vec<CachedAccount>,
        identity: CachedIdentity,
    ) -> Result<()> {
        self.update(|cache| {
            cache.accounts = accounts;
            cache.identity = Some(identity);
            cache.accounts_updated_at = Some(Utc::now());
        })
    }

    /// True when projects/people are missing or older than `max_age`, or the
    /// cache cannot be read. Accounts are not considered.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        match self.load() {
            Ok(cache) => cache.is_stale(max_age, Utc::now()),
            Err(_) => true,
        }
    }

    pub fn status(&self, max_age: Duration) -> Result<CacheStatus> {
        let cache = self.load()?;
        let now = Utc::now();
        Ok(CacheStatus {
            path: self.path(),
            projects: cache.projects.len(),
            people: cache.people.len(),
            accounts: cache.accounts.len(),
            projects_updated_at: cache.projects_updated_at,
            people_updated_at: cache.people_updated_at,
            accounts_updated_at: cache.accounts_updated_at,
            age_secs: cache
                .oldest_projects_people()
                .map(|oldest| (now - oldest).num_seconds().max(0)),
            stale: cache.is_stale(max_age, now),
            accounts_stale: cache.accounts_stale(max_age, now),
        })
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BcqError::store(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn project(id: i64, name: &str) -> CachedProject {
        CachedProject {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    fn person(id: i64, name: &str) -> CachedPerson {
        CachedPerson {
            id,
            name: name.into(),
            email_address: format!("{}@example.com", name.to_lowercase()),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path().join("nested"));
        let cache = store.load().unwrap();
        assert!(cache.projects.is_empty());
        assert!(cache.people.is_empty());
        assert!(cache.accounts.is_empty());
        assert_eq!(cache.projects_updated_at, None);
        assert_eq!(cache.people_updated_at, None);
        assert_eq!(cache.accounts_updated_at, None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        std::fs::write(store.path(), "{not json").unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, BcqError::Store { .. }));
    }

    #[test]
    fn record_missing_required_field_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        std::fs::write(store.path(), r#"{"projects":[{"name":"no id"}]}"#).unwrap();
        assert!(store.load().is_err());
    }

    #[test]
    fn update_projects_leaves_other_collections_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        store.update_people(vec![person(1, "Ann")]).unwrap();
        store
            .update_accounts(vec![CachedAccount {
                id: 9,
                name: "Acme".into(),
            }])
            .unwrap();
        let before = store.load().unwrap();

        let projects = vec![project(10, "Launch"), project(11, "Ops")];
        store.update_projects(projects.clone()).unwrap();
        let after = store.load().unwrap();

        assert_eq!(after.projects, projects);
        assert!(after.projects_updated_at.is_some());
        assert_eq!(after.people, before.people);
        assert_eq!(after.people_updated_at, before.people_updated_at);
        assert_eq!(after.accounts, before.accounts);
        assert_eq!(after.accounts_updated_at, before.accounts_updated_at);
    }

    #[test]
    fn untouched_collections_serialize_identically() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        store.update_people(vec![person(1, "Ann")]).unwrap();
        let before = serde_json::to_value(store.load().unwrap()).unwrap();

        store.update_projects(vec![project(1, "P")]).unwrap();
        let after = serde_json::to_value(store.load().unwrap()).unwrap();

        assert_eq!(after["people"], before["people"]);
        assert_eq!(after["people_updated_at"], before["people_updated_at"]);
        assert!(after.get("accounts_updated_at").is_none());
    }

    #[test]
    fn empty_refresh_still_stamps_collection() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        store.update_projects(vec![]).unwrap();
        let cache = store.load().unwrap();
        assert!(cache.projects.is_empty());
        assert!(cache.projects_updated_at.is_some());
        assert_eq!(cache.people_updated_at, None);
    }

    #[test]
    fn fresh_store_is_stale() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        assert!(store.is_stale(DEFAULT_MAX_AGE));
    }

    #[test]
    fn staleness_needs_both_projects_and_people() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        store.update_projects(vec![project(1, "P")]).unwrap();
        assert!(store.is_stale(DEFAULT_MAX_AGE));
        store.update_people(vec![]).unwrap();
        assert!(!store.is_stale(DEFAULT_MAX_AGE));
    }

    #[test]
    fn staleness_uses_oldest_timestamp() {
        let now = Utc::now();
        let cache = Cache {
            projects_updated_at: Some(now - TimeDelta::minutes(5)),
            people_updated_at: Some(now - TimeDelta::hours(2)),
            ..Cache::empty()
        };
        assert!(cache.is_stale(DEFAULT_MAX_AGE, now));
        assert!(!cache.is_stale(Duration::from_secs(3 * 3600), now));
    }

    #[test]
    fn accounts_do_not_affect_joint_staleness() {
        let now = Utc::now();
        let cache = Cache {
            projects_updated_at: Some(now),
            people_updated_at: Some(now),
            ..Cache::empty()
        };
        assert!(!cache.is_stale(DEFAULT_MAX_AGE, now));
        assert!(cache.accounts_stale(DEFAULT_MAX_AGE, now));
    }

    #[test]
    fn future_timestamps_are_fresh() {
        let now = Utc::now();
        let cache = Cache {
            projects_updated_at: Some(now + TimeDelta::hours(1)),
            people_updated_at: Some(now + TimeDelta::hours(1)),
            ..Cache::empty()
        };
        assert!(!cache.is_stale(DEFAULT_MAX_AGE, now));
    }

    #[test]
    fn update_replaces_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        std::fs::write(store.path(), "garbage").unwrap();
        store.update_projects(vec![project(1, "P")]).unwrap();
        assert_eq!(store.load().unwrap().projects.len(), 1);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        store.update_projects(vec![project(1, "P")]).unwrap();
        store.update_people(vec![person(2, "Bo")]).unwrap();
        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn file_uses_documented_field_names() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        store.update_people(vec![person(1, "Ann")]).unwrap();
        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["people"][0]["email_address"], "ann@example.com");
        assert!(raw["people_updated_at"].is_string());
        assert_eq!(raw["version"], CACHE_VERSION);
    }

    #[test]
    fn status_reports_counts_and_path() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        store.update_projects(vec![project(1, "P")]).unwrap();
        store.update_people(vec![person(1, "Ann"), person(2, "Bo")]).unwrap();

        let status = store.status(DEFAULT_MAX_AGE).unwrap();
        assert_eq!(status.path, store.path());
        assert_eq!(status.projects, 1);
        assert_eq!(status.people, 2);
        assert_eq!(status.accounts, 0);
        assert!(!status.stale);
        assert!(status.accounts_stale);
        assert!(status.age_secs.is_some());
    }

    #[test]
    fn clear_removes_file_and_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        store.update_projects(vec![project(1, "P")]).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn projects_written_before_ranking_fields_still_load() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        std::fs::write(store.path(), r#"{"projects":[{"id":1,"name":"Old"}],"version":1}"#)
            .unwrap();
        let cache = store.load().unwrap();
        assert_eq!(cache.projects, vec![project(1, "Old")]);
        assert_eq!(cache.identity, None);
    }

    #[test]
    fn project_ranking_fields_survive_a_write() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        let api = Project {
            id: 4,
            name: "HQ".into(),
            purpose: Some("hq".into()),
            bookmarked: true,
            updated_at: Some(Utc::now()),
            dock: vec![],
        };
        let cached = CachedProject::from(&api);
        store.update_projects(vec![cached.clone()]).unwrap();
        assert_eq!(store.load().unwrap().projects, vec![cached]);
    }

    #[test]
    fn authorization_write_stores_identity_with_accounts() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        store.update_people(vec![person(1, "Ann")]).unwrap();
        let identity = CachedIdentity::from(&Identity {
            id: 900,
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            email_address: Some("ann@example.com".into()),
        });
        store
            .update_authorization(
                vec![CachedAccount {
                    id: 9,
                    name: "Acme".into(),
                }],
                identity,
            )
            .unwrap();

        let cache = store.load().unwrap();
        let identity = cache.identity.unwrap();
        assert_eq!(identity.name, "Ann Lee");
        assert_eq!(identity.email_address, "ann@example.com");
        assert_eq!(cache.accounts.len(), 1);
        assert!(cache.accounts_updated_at.is_some());
        assert_eq!(cache.people.len(), 1);
    }

    #[test]
    fn converts_api_records() {
        let p = Person {
            id: 3,
            name: "Ann".into(),
            email_address: None,
            personable_type: None,
        };
        let cached = CachedPerson::from(&p);
        assert_eq!(cached.email_address, "");
    }
}
