//! # Listing / Filter Presets
//!
//! Named visibility filters for the entry list. Each preset composes the
//! base visibility rule with an actor-scoped refinement and declares which
//! batch action makes no sense in its scope (nothing hidden to un-hide in
//! "Entries I created", nothing visible to hide among hidden entries).

use crate::moderation::BatchVisibilityAction;
use bb_core::models::{Actor, Entry};
use bb_core::privilege::PrivilegeSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryFilter {
    /// Everything visible under the general rules. The default.
    #[default]
    AllEntries,
    /// Visible entries of the acting user.
    CreatedEntries,
    /// Hidden entries of the acting user.
    MyHiddenEntries,
    /// Hidden entries of other users. Moderators only.
    HiddenEntriesOtherUsers,
}

impl EntryFilter {
    /// The moderator-only preset is not offered to regular users.
    pub fn available_to(&self, privileges: &PrivilegeSet) -> bool {
        match self {
            EntryFilter::HiddenEntriesOtherUsers => privileges.is_moderator(),
            _ => true,
        }
    }

    /// Per-entry predicate of the preset.
    pub fn allows(&self, entry: &Entry, actor: &Actor) -> bool {
        match self {
            EntryFilter::AllEntries => entry.visible,
            EntryFilter::CreatedEntries => entry.authored_by(actor) && entry.visible,
            EntryFilter::MyHiddenEntries => entry.authored_by(actor) && !entry.visible,
            EntryFilter::HiddenEntriesOtherUsers => !entry.authored_by(actor) && !entry.visible,
        }
    }

    /// The batch action this view disables.
    pub fn disabled_batch_action(&self) -> BatchVisibilityAction {
        match self {
            EntryFilter::AllEntries | EntryFilter::CreatedEntries => BatchVisibilityAction::Show,
            EntryFilter::MyHiddenEntries | EntryFilter::HiddenEntriesOtherUsers => {
                BatchVisibilityAction::Hide
            }
        }
    }

    /// All presets usable by an actor with the given privileges.
    pub fn available(privileges: &PrivilegeSet) -> Vec<EntryFilter> {
        [
            EntryFilter::AllEntries,
            EntryFilter::CreatedEntries,
            EntryFilter::MyHiddenEntries,
            EntryFilter::HiddenEntriesOtherUsers,
        ]
        .into_iter()
        .filter(|f| f.available_to(privileges))
        .collect()
    }
}

/// Applies a preset plus the optional category and search refinements of
/// the list view.
pub fn select_entries(
    entries: Vec<Entry>,
    filter: EntryFilter,
    category: Option<Uuid>,
    search: Option<&str>,
    actor: &Actor,
) -> Vec<Entry> {
    let needle = search.map(str::to_lowercase);

    entries
        .into_iter()
        .filter(|e| filter.allows(e, actor))
        .filter(|e| category.map_or(true, |c| e.category_id == c))
        .filter(|e| {
            needle.as_deref().map_or(true, |n| {
                e.title.to_lowercase().contains(n) || e.description.to_lowercase().contains(n)
            })
        })
        .collect()
}
