//! Route handlers and the notices they hand back to the operator.

pub mod dashboard;
pub mod health;
pub mod login;
pub mod orders;
pub(crate) mod render;

use crate::orders::Status;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Document ids are generated by the store; anything outside this alphabet
/// never reaches it.
pub fn valid_document_id(id: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9._-]{1,128}$").is_ok_and(|re| re.is_match(id))
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeIcon {
    Success,
    Error,
    Warning,
}

impl NoticeIcon {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Confirmation or error message shown after an action.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub text: String,
    pub icon: NoticeIcon,
}

impl Notice {
    fn new(title: &str, text: &str, icon: NoticeIcon) -> Self {
        Self {
            title: title.to_string(),
            text: text.to_string(),
            icon,
        }
    }

    #[must_use]
    pub fn status_changed(status: Status) -> Self {
        let title = if status == Status::Dispatch {
            "Dispatch"
        } else {
            "Success"
        };
        Self::new(
            title,
            &format!("The order is now {status}."),
            NoticeIcon::Success,
        )
    }

    #[must_use]
    pub fn status_failed() -> Self {
        Self::new("Error!", "Failed to change status", NoticeIcon::Error)
    }

    #[must_use]
    pub fn deleted() -> Self {
        Self::new("Deleted", "Your order has been deleted", NoticeIcon::Success)
    }

    #[must_use]
    pub fn delete_failed() -> Self {
        Self::new("Error!", "Failed to delete order", NoticeIcon::Error)
    }

    #[must_use]
    pub fn confirm_delete() -> Self {
        Self::new(
            "Are you sure?",
            "You won't be able to revert this!",
            NoticeIcon::Warning,
        )
    }

    #[must_use]
    pub fn load_failed() -> Self {
        Self::new("Error!", "Failed to load orders", NoticeIcon::Error)
    }

    #[must_use]
    pub fn invalid_id() -> Self {
        Self::new("Error!", "Invalid order id", NoticeIcon::Error)
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self::new("Error!", "Service is shutting down", NoticeIcon::Error)
    }
}

/// Notices carried across the post/redirect/get cycle of the HTML dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeCode {
    StatusPending,
    StatusSuccess,
    StatusDispatch,
    StatusError,
    Deleted,
    DeleteError,
    LoadError,
    InvalidId,
}

impl NoticeCode {
    pub const ALL: [Self; 8] = [
        Self::StatusPending,
        Self::StatusSuccess,
        Self::StatusDispatch,
        Self::StatusError,
        Self::Deleted,
        Self::DeleteError,
        Self::LoadError,
        Self::InvalidId,
    ];

    /// Unknown codes are ignored rather than rejected; they only come from
    /// a redirect this service issued or from a hand-edited URL.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.as_str() == code)
    }

    #[must_use]
    pub const fn status_changed(status: Status) -> Self {
        match status {
            Status::Pending => Self::StatusPending,
            Status::Success => Self::StatusSuccess,
            Status::Dispatch => Self::StatusDispatch,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StatusPending => "status-pending",
            Self::StatusSuccess => "status-success",
            Self::StatusDispatch => "status-dispatch",
            Self::StatusError => "status-error",
            Self::Deleted => "deleted",
            Self::DeleteError => "delete-error",
            Self::LoadError => "load-error",
            Self::InvalidId => "invalid-id",
        }
    }

    #[must_use]
    pub fn notice(self) -> Notice {
        match self {
            Self::StatusPending => Notice::status_changed(Status::Pending),
            Self::StatusSuccess => Notice::status_changed(Status::Success),
            Self::StatusDispatch => Notice::status_changed(Status::Dispatch),
            Self::StatusError => Notice::status_failed(),
            Self::Deleted => Notice::deleted(),
            Self::DeleteError => Notice::delete_failed(),
            Self::LoadError => Notice::load_failed(),
            Self::InvalidId => Notice::invalid_id(),
        }
    }
}
