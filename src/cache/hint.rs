//! Opportunistic cache writes from commands whose real job is something else.
//!
//! A hint is always safe to skip and never changes the outcome of the
//! command that issues it: failures are logged and dropped.

use tracing::{debug, warn};

use super::{CachedAccount, CachedPerson, CachedProject, Store};
use crate::api::types::{Account, Person, Project};

pub struct CacheHint<'a> {
    store: &'a Store,
}

impl<'a> CacheHint<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// A full project listing was fetched; remember it.
    pub fn projects(&self, projects: &[Project]) {
        let records: Vec<CachedProject> = projects.iter().map(CachedProject::from).collect();
        let count = records.len();
        match self.store.update_projects(records) {
            Ok(()) => debug!(count, "cache hint: projects"),
            Err(e) => warn!(error = %e, "cache hint: could not store projects"),
        }
    }

    pub fn people(&self, people: &[Person]) {
        let records: Vec<CachedPerson> = people.iter().map(CachedPerson::from).collect();
        let count = records.len();
        match self.store.update_people(records) {
            Ok(()) => debug!(count, "cache hint: people"),
            Err(e) => warn!(error = %e, "cache hint: could not store people"),
        }
    }

    pub fn accounts(&self, accounts: &[Account]) {
        let records: Vec<CachedAccount> = accounts.iter().map(CachedAccount::from).collect();
        let count = records.len();
        match self.store.update_accounts(records) {
            Ok(()) => debug!(count, "cache hint: accounts"),
            Err(e) => warn!(error = %e, "cache hint: could not store accounts"),
        }
    }
}
