use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Cache, CachedAccount, CachedIdentity, CachedPerson, CachedProject, Store};
use crate::api::Remote;
use crate::error::{BcqError, Result};

pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of [`Refresher::refresh_all`]. Each half is independent: one
/// failing never rolls back or blocks the other.
#[derive(Debug, Default)]
pub struct RefreshResult {
    pub projects_count: usize,
    pub people_count: usize,
    pub projects_err: Option<BcqError>,
    pub people_err: Option<BcqError>,
}

impl RefreshResult {
    pub fn has_error(&self) -> bool {
        self.projects_err.is_some() || self.people_err.is_some()
    }

    /// Exactly one half failed.
    pub fn is_partial(&self) -> bool {
        self.projects_err.is_some() != self.people_err.is_some()
    }

    /// A combined error, only when both halves failed. A single failure is
    /// a partial success; see [`RefreshResult::warning`].
    pub fn error(&self) -> Option<BcqError> {
        match (&self.projects_err, &self.people_err) {
            (Some(projects), Some(people)) => Some(BcqError::RefreshFailed {
                projects: projects.to_string(),
                people: people.to_string(),
            }),
            _ => None,
        }
    }

    pub fn warning(&self) -> Option<String> {
        if !self.is_partial() {
            return None;
        }
        match (&self.projects_err, &self.people_err) {
            (Some(e), None) => Some(format!("projects: {}", e)),
            (None, Some(e)) => Some(format!("people: {}", e)),
            _ => None,
        }
    }

    /// Command output, built from what is actually on disk after the refresh
    /// (stale data kept for a failed half is counted).
    pub fn report(&self, cache: &Cache, store: &Store) -> RefreshReport {
        let projects = cache.projects.len();
        let people = cache.people.len();
        let warning = self.warning();
        let summary = match &warning {
            Some(w) => format!(
                "Cached {} projects, {} people (warning: {})",
                projects, people, w
            ),
            None => format!("Cached {} projects and {} people", projects, people),
        };
        RefreshReport {
            projects,
            people,
            projects_refreshed: self.projects_err.is_none(),
            people_refreshed: self.people_err.is_none(),
            projects_error: self.projects_err.as_ref().map(|e| e.to_string()),
            people_error: self.people_err.as_ref().map(|e| e.to_string()),
            warning,
            cache_path: store.path().display().to_string(),
            summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub projects: usize,
    pub people: usize,
    pub projects_refreshed: bool,
    pub people_refreshed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub people_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub cache_path: String,
    pub summary: String,
}

#[derive(Clone)]
pub struct Refresher {
    store: Arc<Store>,
    remote: Arc<dyn Remote>,
    timeout: Option<Duration>,
    refreshing: Arc<AtomicBool>,
}

impl Refresher {
    pub fn new(store: Arc<Store>, remote: Arc<dyn Remote>) -> Self {
        Self {
            store,
            remote,
            timeout: None,
            refreshing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Per-fetch deadline. Expiry surfaces as `Timeout` on that half only.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fetch projects and people concurrently and store each half that
    /// succeeds. A failed half leaves its cached data and timestamp alone.
    pub async fn refresh_all(&self, cancel: &CancellationToken) -> RefreshResult {
        let (projects, people) = futures::future::join(
            guarded(cancel, self.timeout, self.remote.list_projects()),
            guarded(cancel, self.timeout, self.remote.list_people()),
        )
        .await;

        let mut result = RefreshResult::default();

        match projects {
            Ok(projects) => {
                let records: Vec<CachedProject> = projects.iter().map(CachedProject::from).collect();
                let count = records.len();
                match self.store.update_projects(records) {
                    Ok(()) => result.projects_count = count,
                    Err(e) => result.projects_err = Some(e),
                }
            }
            Err(e) => result.projects_err = Some(e),
        }

        match people {
            Ok(people) => {
                let records: Vec<CachedPerson> = people.iter().map(CachedPerson::from).collect();
                let count = records.len();
                match self.store.update_people(records) {
                    Ok(()) => result.people_count = count,
                    Err(e) => result.people_err = Some(e),
                }
            }
            Err(e) => result.people_err = Some(e),
        }

        if let Some(w) = result.warning() {
            warn!(warning = %w, "completion refresh partially failed");
        }
        debug!(
            projects = result.projects_count,
            people = result.people_count,
            "completion refresh finished"
        );
        result
    }

    /// The identity-lookup path: refresh accounts and the signed-in
    /// identity only.
    pub async fn refresh_accounts(&self, cancel: &CancellationToken) -> Result<usize> {
        let auth = guarded(cancel, self.timeout, self.remote.authorization()).await?;
        let identity = CachedIdentity::from(&auth.identity);
        let records: Vec<CachedAccount> = auth
            .basecamp_accounts()
            .iter()
            .map(CachedAccount::from)
            .collect();
        let count = records.len();
        self.store.update_authorization(records, identity)?;
        Ok(count)
    }

    /// Start a detached refresh when projects/people are stale and none is
    /// already running. Returns the task handle if one was started.
    pub fn refresh_if_stale(&self, max_age: Duration) -> Option<JoinHandle<()>> {
        if !self.store.is_stale(max_age) {
            return None;
        }
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        let in_flight = InFlight(self.refreshing.clone());
        let this = match self.timeout {
            Some(_) => self.clone(),
            None => self.clone().with_timeout(DEFAULT_REFRESH_TIMEOUT),
        };
        Some(tokio::spawn(async move {
            let _in_flight = in_flight;
            let result = this.refresh_all(&CancellationToken::new()).await;
            if let Some(e) = result.error() {
                warn!(error = %e, "background completion refresh failed");
            }
        }))
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }
}

/// Clears the in-flight flag when dropped, so a task that panics or is
/// dropped unpolled does not block later refreshes.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Run `fut` until it finishes, `cancel` fires, or `timeout` elapses.
async fn guarded<T>(
    cancel: &CancellationToken,
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    let bounded = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| BcqError::Timeout)?,
            None => fut.await,
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BcqError::Cancelled),
        res = bounded => res,
    }
}
