//! Static mapping from URL path segments to resource type names.
//!
//! Two spellings exist: the *canonical* recording type the detail view and
//! the API use (`Todo`, `Kanban::Column`), and the *singular* slug used in
//! command lines (`todo`, `column`). Unknown segments pass through verbatim
//! in both, since the service adds resource types faster than clients learn
//! their names.

/// (path segment, canonical recording type, singular slug)
const KINDS: &[(&str, &str, &str)] = &[
    ("todos", "Todo", "todo"),
    ("todolists", "Todolist", "todolist"),
    ("todosets", "Todoset", "todoset"),
    ("messages", "Message", "message"),
    ("message_boards", "Message::Board", "message_board"),
    ("documents", "Document", "document"),
    ("comments", "Comment", "comment"),
    ("uploads", "Upload", "upload"),
    ("vaults", "Vault", "vault"),
    ("cards", "Card", "card"),
    ("columns", "Kanban::Column", "column"),
    ("lists", "Kanban::Column", "column"),
    ("steps", "Kanban::Step", "step"),
    ("card_tables", "Kanban::Board", "card_table"),
    ("chats", "Chat::Transcript", "campfire"),
    ("campfires", "Chat::Transcript", "campfire"),
    ("lines", "Campfire::Line", "line"),
    ("schedules", "Schedule", "schedule"),
    ("schedule_entries", "Schedule::Entry", "schedule_entry"),
    ("questionnaires", "Questionnaire", "questionnaire"),
    ("questions", "Question", "question"),
    ("question_answers", "Question::Answer", "question_answer"),
    ("inboxes", "Inbox", "inbox"),
    ("forwards", "Forward", "forward"),
];

fn lookup(segment: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    KINDS.iter().find(|(seg, _, _)| *seg == segment)
}

/// Whether the segment names a resource type this client knows.
pub fn is_known(segment: &str) -> bool {
    lookup(segment).is_some()
}

/// `todos` -> `Todo`, `columns` -> `Kanban::Column`; unknown segments verbatim.
pub fn canonical_type(segment: &str) -> String {
    match lookup(segment) {
        Some((_, canonical, _)) => (*canonical).to_string(),
        None => segment.to_string(),
    }
}

/// `todos` -> `todo`, `chats` -> `campfire`; unknown segments verbatim.
pub fn singular_type(segment: &str) -> String {
    match lookup(segment) {
        Some((_, _, singular)) => (*singular).to_string(),
        None => segment.to_string(),
    }
}

/// Inverse of [`canonical_type`], used to pick a label for a parsed reference.
pub fn singular_for_canonical(canonical: &str) -> Option<&'static str> {
    KINDS
        .iter()
        .find(|(_, c, _)| *c == canonical)
        .map(|(_, _, singular)| *singular)
}
