//! # bb-auth-simple
//!
//! File-backed implementation of `PrivilegeProvider`: a JSON map from
//! account name to privilege flags, loaded once at startup. Accounts
//! missing from the map carry no privileges at all.

use bb_core::models::Actor;
use bb_core::privilege::{Privilege, PrivilegeSet};
use bb_core::traits::PrivilegeProvider;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct StaticPrivilegeProvider {
    #[serde(flatten)]
    accounts: HashMap<String, PrivilegeSet>,
}

impl StaticPrivilegeProvider {
    pub fn new(accounts: HashMap<String, PrivilegeSet>) -> Self {
        Self { accounts }
    }

    /// Loads the account map from a JSON file, e.g.
    /// `{"alice": {"view": true, "create": true}, "maude": {"view": true, "moderate": true}}`.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let provider: Self = serde_json::from_str(&raw).map_err(std::io::Error::other)?;
        tracing::info!(
            path = %path.display(),
            accounts = provider.accounts.len(),
            "loaded privilege map"
        );
        Ok(provider)
    }
}

impl PrivilegeProvider for StaticPrivilegeProvider {
    fn has_privilege(&self, actor: &Actor, privilege: Privilege) -> bool {
        let Some(set) = self.accounts.get(&actor.account) else {
            return false;
        };
        match privilege {
            Privilege::View => set.view,
            Privilege::Create => set.create,
            Privilege::Moderate => set.moderate,
            Privilege::Manage => set.manage,
        }
    }

    fn privileges(&self, actor: &Actor) -> PrivilegeSet {
        self.accounts
            .get(&actor.account)
            .copied()
            .unwrap_or(PrivilegeSet::NONE)
    }
}
