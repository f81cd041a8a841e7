use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A project (bucket) as returned by `GET /projects.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub bookmarked: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dock: Vec<DockTool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub personable_type: Option<String>,
}

/// One entry of a project's dock. `name` is the tool type slug
/// (`todoset`, `chat`, `message_board`, ...), `title` the label users see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DockTool {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub enabled: bool,
}

/// An account the authenticated identity can reach, from launchpad.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Authorization {
    pub identity: Identity,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

impl Authorization {
    /// Only Basecamp 3/4 accounts are addressable through the project API.
    pub fn basecamp_accounts(self) -> Vec<Account> {
        self.accounts
            .into_iter()
            .filter(|a| {
                a.product
                    .as_deref()
                    .map(|p| p == "bc3" || p == "bc4")
                    .unwrap_or(true)
            })
            .collect()
    }
}
