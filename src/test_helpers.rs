use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::types::{Account, Authorization, DockTool, Identity, Person, Project};
use crate::api::Remote;
use crate::error::{BcqError, Result};
use crate::resolve::{PickOutcome, PickerItem, Prompter};

pub fn api_project(id: i64, name: &str) -> Project {
    Project {
        id,
        name: name.into(),
        purpose: None,
        bookmarked: false,
        updated_at: None,
        dock: vec![],
    }
}

pub fn api_person(id: i64, name: &str, email: &str) -> Person {
    Person {
        id,
        name: name.into(),
        email_address: Some(email.into()),
        personable_type: Some("User".into()),
    }
}

pub fn dock_tool(id: i64, name: &str, title: &str) -> DockTool {
    DockTool {
        id,
        name: name.into(),
        title: title.into(),
        enabled: true,
    }
}

/// In-memory `Remote`. A `None` collection answers with a 500.
#[derive(Default)]
pub struct FakeRemote {
    pub projects: Option<Vec<Project>>,
    pub people: Option<Vec<Person>>,
    pub accounts: Option<Vec<Account>>,
    /// Identity returned alongside `accounts`; a blank one when unset.
    pub identity: Option<Identity>,
    pub docks: HashMap<String, Vec<DockTool>>,
    /// `list_people` never completes; used to exercise cancellation.
    pub hang_people: bool,
    pub calls: AtomicUsize,
}

impl FakeRemote {
    pub fn with_projects(mut self, projects: Vec<Project>) -> Self {
        self.projects = Some(projects);
        self
    }

    pub fn with_people(mut self, people: Vec<Person>) -> Self {
        self.people = Some(people);
        self
    }

    pub fn with_dock(mut self, project_id: &str, dock: Vec<DockTool>) -> Self {
        self.docks.insert(project_id.to_string(), dock);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer<T: Clone>(&self, data: &Option<Vec<T>>) -> Result<Vec<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        data.clone().ok_or_else(|| BcqError::Api {
            status: 500,
            message: "fake failure".into(),
        })
    }
}

#[async_trait]
impl Remote for FakeRemote {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.answer(&self.projects)
    }

    async fn list_people(&self) -> Result<Vec<Person>> {
        if self.hang_people {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
        }
        self.answer(&self.people)
    }

    async fn get_project_dock(&self, project_id: &str) -> Result<Vec<DockTool>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.docks
            .get(project_id)
            .cloned()
            .ok_or_else(|| BcqError::not_found("Project", project_id))
    }

    async fn authorization(&self) -> Result<Authorization> {
        Ok(Authorization {
            identity: self.identity.clone().unwrap_or_default(),
            accounts: self.answer(&self.accounts)?,
        })
    }
}

/// Answers every prompt with a fixed outcome and records what it was shown.
pub struct ScriptedPrompter {
    outcome: PickOutcome,
    pub shown: Mutex<Vec<Vec<PickerItem>>>,
}

impl ScriptedPrompter {
    pub fn new(outcome: PickOutcome) -> Self {
        Self {
            outcome,
            shown: Mutex::new(Vec::new()),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn pick(&self, _title: &str, items: &[PickerItem]) -> Result<PickOutcome> {
        self.shown.lock().unwrap().push(items.to_vec());
        Ok(self.outcome)
    }
}
