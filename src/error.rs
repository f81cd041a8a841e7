use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum BcqError {
    #[error("Not a recognized reference: {input} ({reason})")]
    Parse { input: String, reason: String },
    #[error("{resource} not found: {identifier}")]
    NotFound {
        resource: String,
        identifier: String,
        hint: Option<String>,
    },
    #[error("{message}")]
    Ambiguous { message: String, hint: String },
    #[error("Authentication required: {0}")]
    Auth(String),
    #[error("Rate limited")]
    RateLimited { retry_after: Option<u64> },
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Operation timed out")]
    Timeout,
    #[error("Cache error at {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: Box<BcqError>,
    },
    #[error("Refresh failed: projects: {projects}; people: {people}")]
    RefreshFailed { projects: String, people: String },
    #[error("{0}")]
    Usage(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BcqError>;

/// Machine-readable error class, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Usage,
    NotFound,
    Ambiguous,
    AuthRequired,
    RateLimit,
    Network,
    ApiError,
    Cache,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Usage => "usage",
            Self::NotFound => "not_found",
            Self::Ambiguous => "ambiguous",
            Self::AuthRequired => "auth_required",
            Self::RateLimit => "rate_limit",
            Self::Network => "network",
            Self::ApiError => "api_error",
            Self::Cache => "cache",
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Self::Usage => 2,
            Self::NotFound => 3,
            Self::AuthRequired => 4,
            Self::RateLimit => 5,
            Self::Network => 6,
            Self::ApiError => 7,
            Self::Ambiguous => 8,
            Self::Cache => 9,
        }
    }
}

impl BcqError {
    pub fn not_found(resource: &str, identifier: &str) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            identifier: identifier.to_string(),
            hint: None,
        }
    }

    pub fn not_found_hint(resource: &str, identifier: &str, hint: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            identifier: identifier.to_string(),
            hint: Some(hint.into()),
        }
    }

    pub fn parse(input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn store(path: impl Into<PathBuf>, source: impl Into<BcqError>) -> Self {
        Self::Store {
            path: path.into(),
            source: Box::new(source.into()),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { .. } | Self::Usage(_) | Self::Config(_) => ErrorCode::Usage,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Ambiguous { .. } => ErrorCode::Ambiguous,
            Self::Auth(_) => ErrorCode::AuthRequired,
            Self::RateLimited { .. } => ErrorCode::RateLimit,
            Self::Http(_) | Self::Cancelled | Self::Timeout => ErrorCode::Network,
            Self::Store { .. } | Self::Io(_) => ErrorCode::Cache,
            Self::Api { .. } | Self::Json(_) | Self::RefreshFailed { .. } => ErrorCode::ApiError,
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Parse { .. } => Some(
                "Expected a URL like https://3.basecamp.com/{account}/buckets/{project}/{type}/{id} or a numeric ID"
                    .into(),
            ),
            Self::NotFound { hint, .. } => hint.clone(),
            Self::Ambiguous { hint, .. } => Some(hint.clone()),
            Self::Auth(_) => Some("Run: bcq auth login".into()),
            Self::RateLimited { retry_after } => Some(match retry_after {
                Some(secs) => format!("Try again in {} seconds", secs),
                None => "Try again later".into(),
            }),
            Self::Store { path, .. } => Some(format!(
                "Delete {} and run: bcq completion refresh",
                path.display()
            )),
            Self::RefreshFailed { .. } => {
                Some("Previously cached data was kept; run the refresh again later".into())
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Api { status, .. } => *status == 404,
            _ => false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Http(_) | Self::Timeout
        ) || matches!(self, Self::Api { status, .. } if *status >= 500)
    }

    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }
}

/// JSON shape the command layer prints for a failed command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub ok: bool,
    pub error: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&BcqError> for ErrorReport {
    fn from(e: &BcqError) -> Self {
        Self {
            ok: false,
            error: e.to_string(),
            code: e.code(),
            hint: e.hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_status_and_message() {
        let err = BcqError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "API error (500): boom");
        assert_eq!(err.code(), ErrorCode::ApiError);
        assert!(err.is_retryable());
    }

    #[test]
    fn not_found_carries_hint() {
        let err = BcqError::not_found_hint("campfire", "42", "Project has no campfire");
        assert_eq!(err.to_string(), "campfire not found: 42");
        assert_eq!(err.hint().as_deref(), Some("Project has no campfire"));
        assert!(err.is_not_found());
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn api_404_counts_as_not_found() {
        let err = BcqError::Api {
            status: 404,
            message: "".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn store_error_is_distinct_from_resolution_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = BcqError::store("/tmp/completion.json", json_err);
        assert_eq!(err.code(), ErrorCode::Cache);
        assert!(err.to_string().contains("/tmp/completion.json"));
        assert!(err.hint().unwrap().contains("completion refresh"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BcqError = io_err.into();
        assert!(matches!(err, BcqError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn rate_limit_hint_mentions_retry_after() {
        let err = BcqError::RateLimited {
            retry_after: Some(12),
        };
        assert_eq!(err.hint().as_deref(), Some("Try again in 12 seconds"));
        assert_eq!(err.code().as_str(), "rate_limit");
    }

    #[test]
    fn cancellation_is_a_network_class_error() {
        assert_eq!(BcqError::Cancelled.code(), ErrorCode::Network);
        assert!(!BcqError::Cancelled.is_retryable());
    }

    #[test]
    fn report_serializes_code_and_hint() {
        let err = BcqError::Ambiguous {
            message: "Ambiguous person".into(),
            hint: "Specify ID directly".into(),
        };
        let report = ErrorReport::from(&err);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["code"], "ambiguous");
        assert_eq!(json["hint"], "Specify ID directly");
    }

    #[test]
    fn report_omits_missing_hint() {
        let report = ErrorReport::from(&BcqError::Usage("bad".into()));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("hint").is_none());
    }
}
