use std::fmt;

use tracing::debug;

use super::candidate_hint;
use crate::api::types::DockTool;
use crate::api::Remote;
use crate::error::{BcqError, Result};

/// Tools a project dock can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DockToolKind {
    Campfire,
    MessageBoard,
    Todoset,
    Schedule,
    Vault,
    Inbox,
    Questionnaire,
    CardTable,
}

impl DockToolKind {
    pub const ALL: [DockToolKind; 8] = [
        Self::Campfire,
        Self::MessageBoard,
        Self::Todoset,
        Self::Schedule,
        Self::Vault,
        Self::Inbox,
        Self::Questionnaire,
        Self::CardTable,
    ];

    /// The `name` the service gives this tool in a dock listing.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Campfire => "chat",
            Self::MessageBoard => "message_board",
            Self::Todoset => "todoset",
            Self::Schedule => "schedule",
            Self::Vault => "vault",
            Self::Inbox => "inbox",
            Self::Questionnaire => "questionnaire",
            Self::CardTable => "kanban_board",
        }
    }

    pub fn friendly(self) -> &'static str {
        match self {
            Self::Campfire => "campfire",
            Self::MessageBoard => "message board",
            Self::Todoset => "todoset",
            Self::Schedule => "schedule",
            Self::Vault => "docs & files",
            Self::Inbox => "email forward",
            Self::Questionnaire => "automatic check-in",
            Self::CardTable => "card table",
        }
    }

    /// Accepts dock slugs plus the words people type for them.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "chat" | "campfire" | "campfires" | "chats" => Self::Campfire,
            "message_board" | "messages" | "board" => Self::MessageBoard,
            "todoset" | "todos" | "todolists" => Self::Todoset,
            "schedule" => Self::Schedule,
            "vault" | "docs" | "files" => Self::Vault,
            "inbox" | "forwards" => Self::Inbox,
            "questionnaire" | "checkins" | "check_ins" => Self::Questionnaire,
            "kanban_board" | "card_table" | "card_tables" | "cards" => Self::CardTable,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for DockToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.friendly())
    }
}

/// Pick one tool of type `tool` from a project's dock.
///
/// An explicit ID wins without looking at the dock. Otherwise the dock is
/// fetched live and only enabled entries are considered. Several matches
/// are never resolved here, even with a terminal attached: the caller gets
/// an `Ambiguous` error naming each candidate and must pass an ID.
pub async fn resolve_dock_tool(
    remote: &dyn Remote,
    project_id: &str,
    tool: &str,
    explicit_id: Option<&str>,
) -> Result<String> {
    if let Some(id) = explicit_id.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }

    let kind = DockToolKind::from_name(tool);
    let slug = kind.map(DockToolKind::slug).unwrap_or(tool);
    let friendly = kind.map(DockToolKind::friendly).unwrap_or(tool);

    let dock = remote.get_project_dock(project_id).await?;
    let matches: Vec<&DockTool> = dock
        .iter()
        .filter(|t| t.enabled && (t.name == slug || t.name == tool))
        .collect();
    debug!(project_id, slug, matches = matches.len(), "dock lookup");

    match matches.as_slice() {
        [] => Err(BcqError::not_found_hint(
            friendly,
            project_id,
            format!("Project has no {}", friendly),
        )),
        [one] => Ok(one.id.to_string()),
        many => Err(BcqError::Ambiguous {
            message: format!("Project has {} {}s", many.len(), friendly),
            hint: candidate_hint(many.iter().map(|t| {
                let title = if t.title.is_empty() { friendly } else { t.title.as_str() };
                (title, t.id)
            })),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{dock_tool, FakeRemote};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn explicit_id_skips_the_dock() {
        let remote = FakeRemote::default();
        let id = resolve_dock_tool(&remote, "1", "campfire", Some("99"))
            .await
            .unwrap();
        assert_eq!(id, "99");
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn single_match_returns_its_id() {
        let remote = FakeRemote::default().with_dock(
            "1",
            vec![
                dock_tool(10, "chat", "Campfire"),
                dock_tool(11, "todoset", "To-dos"),
            ],
        );
        let id = resolve_dock_tool(&remote, "1", "campfire", None).await.unwrap();
        assert_eq!(id, "10");
    }

    #[tokio::test]
    async fn two_matches_are_ambiguous_and_list_both() {
        let remote = FakeRemote::default().with_dock(
            "1",
            vec![
                dock_tool(10, "campfire", "Team Chat"),
                dock_tool(12, "campfire", "Client Chat"),
            ],
        );
        let err = resolve_dock_tool(&remote, "1", "campfire", None)
            .await
            .unwrap_err();

        assert!(matches!(err, BcqError::Ambiguous { .. }));
        assert_eq!(err.to_string(), "Project has 2 campfires");
        let hint = err.hint().unwrap();
        assert!(hint.contains("Team Chat (ID: 10)"));
        assert!(hint.contains("Client Chat (ID: 12)"));
    }

    #[tokio::test]
    async fn no_match_is_not_found_with_hint() {
        let remote = FakeRemote::default().with_dock("1", vec![dock_tool(11, "todoset", "To-dos")]);
        let err = resolve_dock_tool(&remote, "1", "message_board", None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.hint().as_deref(), Some("Project has no message board"));
    }

    #[tokio::test]
    async fn disabled_tools_are_ignored() {
        let mut disabled = dock_tool(10, "chat", "Old Chat");
        disabled.enabled = false;
        let remote = FakeRemote::default()
            .with_dock("1", vec![disabled, dock_tool(12, "chat", "Chat")]);

        let id = resolve_dock_tool(&remote, "1", "chat", None).await.unwrap();
        assert_eq!(id, "12");
    }

    #[tokio::test]
    async fn unknown_project_propagates_not_found() {
        let remote = FakeRemote::default();
        let err = resolve_dock_tool(&remote, "404", "schedule", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn kind_names_round_trip_through_slugs() {
        for kind in DockToolKind::ALL {
            assert_eq!(DockToolKind::from_name(kind.slug()), Some(kind));
        }
        assert_eq!(DockToolKind::from_name("Card-Table"), Some(DockToolKind::CardTable));
        assert_eq!(DockToolKind::from_name("wiki"), None);
    }
}
