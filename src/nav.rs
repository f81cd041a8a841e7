//! Deep links: a pasted URL becomes the view the terminal client opens and
//! the scope it opens it in.

use serde::Serialize;

use crate::error::{BcqError, Result};
use crate::refs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewTarget {
    Projects,
    Dock,
    Todos,
    Campfire,
    Hey,
    Cards,
    Messages,
    Search,
    MyStuff,
    People,
    Detail,
    Schedule,
    DocsFiles,
    Checkins,
    Forwards,
    Pulse,
    Assignments,
    Pings,
    Compose,
    Home,
    Activity,
}

impl ViewTarget {
    const NAMED: [(&'static str, ViewTarget); 21] = [
        ("projects", Self::Projects),
        ("dock", Self::Dock),
        ("todos", Self::Todos),
        ("campfire", Self::Campfire),
        ("hey", Self::Hey),
        ("cards", Self::Cards),
        ("messages", Self::Messages),
        ("search", Self::Search),
        ("my_stuff", Self::MyStuff),
        ("people", Self::People),
        ("detail", Self::Detail),
        ("schedule", Self::Schedule),
        ("docs_files", Self::DocsFiles),
        ("checkins", Self::Checkins),
        ("forwards", Self::Forwards),
        ("pulse", Self::Pulse),
        ("assignments", Self::Assignments),
        ("pings", Self::Pings),
        ("compose", Self::Compose),
        ("home", Self::Home),
        ("activity", Self::Activity),
    ];

    pub fn as_str(self) -> &'static str {
        Self::NAMED
            .iter()
            .find(|(_, target)| *target == self)
            .map(|(name, _)| *name)
            .unwrap_or("home")
    }

    /// Look up a view by its internal name. Unknown names land on `Home`.
    pub fn from_name(name: &str) -> Self {
        Self::NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, target)| *target)
            .unwrap_or(Self::Home)
    }

    /// The view that shows a dock tool, keyed by the tool's dock slug.
    pub fn from_tool_name(name: &str) -> Option<Self> {
        Some(match name {
            "todoset" => Self::Todos,
            "chat" => Self::Campfire,
            "message_board" => Self::Messages,
            "kanban_board" => Self::Cards,
            "schedule" => Self::Schedule,
            "vault" => Self::DocsFiles,
            "questionnaire" => Self::Checkins,
            "inbox" => Self::Forwards,
            _ => return None,
        })
    }

    /// Views that are not tied to a single project.
    pub fn is_global(self) -> bool {
        matches!(
            self,
            Self::Home
                | Self::Hey
                | Self::Pulse
                | Self::Assignments
                | Self::Pings
                | Self::Projects
                | Self::Search
                | Self::Activity
        )
    }
}

/// Where in the account/project/tool/recording hierarchy a view is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub account_name: String,
    pub project_id: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tool_type: String,
    pub tool_id: i64,
    pub recording_id: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub recording_type: String,
}

/// Map a URL to a view. Recordings open in `Detail`, bare projects in
/// `Dock`; anything else is an error rather than a silent `Home`.
pub fn resolve(url: &str) -> Result<(ViewTarget, Scope)> {
    let reference = refs::parse_url(url)?;
    let mut scope = Scope {
        account_id: reference.account_id.clone(),
        project_id: reference.project_id,
        ..Scope::default()
    };

    if reference.has_recording() {
        scope.recording_id = reference.recording_id;
        scope.recording_type = reference.recording_type;
        return Ok((ViewTarget::Detail, scope));
    }

    if reference.has_project()
        && (reference.recording_type.is_empty() || reference.recording_type == "project")
    {
        return Ok((ViewTarget::Dock, scope));
    }

    Err(BcqError::parse(url, "no project or recording to open"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recording_opens_detail() {
        let (target, scope) =
            resolve("https://3.basecamp.com/99/buckets/42/messages/7").unwrap();
        assert_eq!(target, ViewTarget::Detail);
        assert_eq!(scope.account_id, "99");
        assert_eq!(scope.project_id, 42);
        assert_eq!(scope.recording_id, 7);
        assert_eq!(scope.recording_type, "Message");
    }

    #[test]
    fn forward_opens_detail_with_forward_type() {
        let (target, scope) = resolve("https://3.basecamp.com/1/buckets/2/forwards/3").unwrap();
        assert_eq!(target, ViewTarget::Detail);
        assert_eq!(scope.recording_type, "Forward");
        assert_eq!(scope.recording_id, 3);
    }

    #[test]
    fn campfire_line_opens_detail_with_line_type() {
        let (target, scope) = resolve("https://3.basecamp.com/1/buckets/2/lines/4").unwrap();
        assert_eq!(target, ViewTarget::Detail);
        assert_eq!(scope.recording_type, "Campfire::Line");
        assert_eq!(scope.recording_id, 4);
    }

    #[test]
    fn card_opens_detail_with_card_type() {
        let (target, scope) =
            resolve("https://3.basecamp.com/99/buckets/42/card_tables/cards/7").unwrap();
        assert_eq!(target, ViewTarget::Detail);
        assert_eq!(scope.recording_type, "Card");
    }

    #[test]
    fn bucket_opens_dock() {
        for url in [
            "https://3.basecamp.com/12345/buckets/67890",
            "https://3.basecamp.com/12345/buckets/67890/",
            "https://3.basecamp.com/12345/buckets/67890?foo=bar",
            "https://basecamp.com/12345/buckets/67890",
        ] {
            let (target, scope) = resolve(url).unwrap();
            assert_eq!(target, ViewTarget::Dock, "{}", url);
            assert_eq!(scope.project_id, 67890);
            assert_eq!(scope.recording_id, 0);
        }
    }

    #[test]
    fn projects_path_opens_dock() {
        let (target, scope) = resolve("https://3.basecamp.com/99/projects/42").unwrap();
        assert_eq!(target, ViewTarget::Dock);
        assert_eq!(scope.project_id, 42);
    }

    #[test]
    fn unknown_bucket_segment_is_rejected() {
        assert!(resolve("https://3.basecamp.com/99/buckets/42/foobar").is_err());
    }

    #[test]
    fn type_list_is_rejected() {
        assert!(resolve("https://3.basecamp.com/99/buckets/42/todos").is_err());
    }

    #[test]
    fn account_only_and_garbage_are_rejected() {
        assert!(resolve("https://3.basecamp.com/99").is_err());
        assert!(resolve("not-a-url").is_err());
        assert!(resolve("https://example.com/projects/123").is_err());
        assert!(resolve("42").is_err());
    }

    #[test]
    fn dock_slugs_map_to_tool_views() {
        assert_eq!(ViewTarget::from_tool_name("chat"), Some(ViewTarget::Campfire));
        assert_eq!(ViewTarget::from_tool_name("kanban_board"), Some(ViewTarget::Cards));
        assert_eq!(ViewTarget::from_tool_name("wiki"), None);
    }

    #[test]
    fn unknown_internal_name_falls_back_to_home() {
        assert_eq!(ViewTarget::from_name("dock"), ViewTarget::Dock);
        assert_eq!(ViewTarget::from_name("nonsense"), ViewTarget::Home);
        assert_eq!(ViewTarget::Detail.as_str(), "detail");
    }

    #[test]
    fn global_views() {
        assert!(ViewTarget::Home.is_global());
        assert!(ViewTarget::Projects.is_global());
        assert!(!ViewTarget::Dock.is_global());
        assert!(!ViewTarget::Detail.is_global());
    }
}
