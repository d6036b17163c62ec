//! # Privilege Model
//!
//! Four independent capabilities resolved per-request from the identity
//! provider. There is no automatic hierarchy; every authorization rule
//! combines the flags explicitly. The only derived notion is "moderator",
//! which is `Moderate` or `Manage`.

use serde::{Deserialize, Serialize};

/// The capabilities known to the bill-board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// May browse the bill-board.
    View,
    /// May create entries and comments.
    Create,
    /// May moderate foreign content (hide, lock, delete).
    Moderate,
    /// May administer categories and the rules text. Implies moderator-level
    /// trust but is still checked explicitly everywhere.
    Manage,
}

/// The resolved capability flags of one actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivilegeSet {
    pub view: bool,
    pub create: bool,
    pub moderate: bool,
    pub manage: bool,
}

impl PrivilegeSet {
    /// An empty set, the starting point for resolution.
    pub const NONE: PrivilegeSet = PrivilegeSet {
        view: false,
        create: false,
        moderate: false,
        manage: false,
    };

    pub fn is_moderator(&self) -> bool {
        self.moderate || self.manage
    }

    /// True if the actor holds any bill-board capability at all. Gates the
    /// feature as a whole before any per-object rule applies.
    pub fn any(&self) -> bool {
        self.view || self.create || self.moderate || self.manage
    }

    pub fn with(mut self, privilege: Privilege) -> Self {
        match privilege {
            Privilege::View => self.view = true,
            Privilege::Create => self.create = true,
            Privilege::Moderate => self.moderate = true,
            Privilege::Manage => self.manage = true,
        }
        self
    }
}
