//! # Authorization / Visibility Engine
//!
//! Pure decision functions over (entry, actor, privilege set). No I/O, all
//! inputs explicit: whether categories exist is resolved by the caller and
//! passed in. Passing `None` for entry/actor is the collection-level
//! capability probe ("may this feature be used at all").

use bb_core::models::{Actor, Entry};
use bb_core::privilege::PrivilegeSet;

/// A moderator holds `Moderate` or `Manage`.
pub fn is_moderator(privileges: &PrivilegeSet) -> bool {
    privileges.is_moderator()
}

/// Who may see an entry: everyone while it is visible; only the author and
/// moderators once it is hidden.
pub fn can_view(entry: Option<&Entry>, actor: Option<&Actor>, privileges: &PrivilegeSet) -> bool {
    let Some(entry) = entry else {
        return true;
    };

    if entry.visible {
        return true;
    }

    if let Some(actor) = actor {
        if entry.authored_by(actor) {
            return true;
        }
    }

    // moderators may see hidden entries of other users
    privileges.is_moderator()
}

/// Who may create entries: holders of `Create`, and moderators.
pub fn can_add(actor: Option<&Actor>, privileges: &PrivilegeSet) -> bool {
    if actor.is_none() {
        return true;
    }

    privileges.create || privileges.is_moderator()
}

/// Who may edit an entry. Without a category to assign nobody can; a closed
/// entry is writable by moderators only; otherwise the author (while holding
/// `Create`) and moderators may edit.
pub fn can_edit(
    entry: Option<&Entry>,
    actor: Option<&Actor>,
    privileges: &PrivilegeSet,
    has_categories: bool,
) -> bool {
    if entry.is_none() && actor.is_none() {
        return true;
    }

    if !has_categories {
        return false;
    }

    if let Some(entry) = entry {
        if entry.closed && !privileges.is_moderator() {
            return false;
        }
    }

    if let (Some(entry), Some(actor)) = (entry, actor) {
        if entry.authored_by(actor) && privileges.create {
            return true;
        }
    }

    privileges.is_moderator()
}

/// Deletion follows the edit rule exactly.
pub fn can_delete(
    entry: Option<&Entry>,
    actor: Option<&Actor>,
    privileges: &PrivilegeSet,
    has_categories: bool,
) -> bool {
    can_edit(entry, actor, privileges, has_categories)
}

/// True if the actor wrote the entry. An orphaned entry matches nobody.
pub fn is_author(entry: &Entry, actor: &Actor) -> bool {
    entry.authored_by(actor)
}

/// Batch show/hide rule: the author or a moderator may toggle visibility.
pub fn can_toggle_visibility(entry: &Entry, actor: &Actor, privileges: &PrivilegeSet) -> bool {
    if privileges.is_moderator() {
        return true;
    }

    entry.authored_by(actor)
}
