//! # Domain Models
//!
//! These structs represent the core entities of the bill-board.
//! We use UUID v7 for time-ordered, globally unique identification; the
//! opaque identifier of a stored image file is a v4 UUID assigned by the
//! image lifecycle manager and is never derived from user input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A category entries are filed under (e.g. "For sale", "Wanted").
///
/// Categories are managed by users holding the `Manage` privilege. At least
/// one category must exist before any entry can be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A single classified-ad-like post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Every entry belongs to exactly one category.
    pub category_id: Uuid,
    /// Account of the author. `None` once the author account was deleted.
    pub author: Option<String>,
    /// A hidden entry is readable only by its author or a moderator.
    pub visible: bool,
    /// A closed entry accepts no further writes except from moderators.
    pub closed: bool,
    pub created_at: DateTime<Utc>,
    /// Touched by content edits only, never by visibility or lock toggles.
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Checks if the author is valid, i.e. the account was not deleted.
    pub fn has_valid_author(&self) -> bool {
        self.author.is_some()
    }

    /// Returns a displayable author. Performs an exists check.
    pub fn author_display(&self) -> &str {
        self.author.as_deref().unwrap_or("?")
    }

    /// True if the given actor is the author of this entry. An orphaned
    /// entry (deleted author account) matches no actor.
    pub fn authored_by(&self, actor: &Actor) -> bool {
        self.author.as_deref() == Some(actor.account.as_str())
    }
}

/// A comment below an entry. Comments are immutable after creation and are
/// removed together with their entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryComment {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub time: DateTime<Utc>,
}

impl EntryComment {
    pub fn author_display(&self) -> &str {
        self.author.as_deref().unwrap_or("?")
    }
}

/// An image attached to an entry.
///
/// `image_id` names the canonical PNG file in the file store. The backing
/// file must exist whenever `image_id` is set; the image lifecycle manager
/// is the only component allowed to create or remove either side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryImage {
    pub id: Uuid,
    pub entry_id: Uuid,
    /// Opaque store identifier, assigned at store time. `None` only for
    /// legacy rows that still carry their bytes inline.
    pub image_id: Option<String>,
    /// Original filename, kept for display purposes only.
    pub image_name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub time: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Inline bytes of a pre-migration row. Cleared by the image migration.
    #[serde(skip_serializing)]
    pub legacy_data: Option<Vec<u8>>,
}

impl EntryImage {
    pub fn author_display(&self) -> &str {
        self.author.as_deref().unwrap_or("?")
    }
}

/// The acting identity of a request, supplied by the identity provider.
/// Authorship comparisons use the `account` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub account: String,
    pub display: String,
}

impl Actor {
    pub fn new(account: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            display: display.into(),
        }
    }
}

/// Payload handed to the notification collaborator. Delivery is
/// fire-and-forget from the bill-board's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Account of the recipient.
    pub recipient: String,
    pub message: String,
    pub icon: String,
    /// Application-relative link to the affected entry.
    pub link: String,
}
