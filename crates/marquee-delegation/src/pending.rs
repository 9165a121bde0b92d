//! Pending change set and diff arithmetic.
//!
//! A [`PendingChangeSet`] records operator intent against the current
//! matrix without touching it. Transitions consume the set and return the
//! next one, so a set handed to the executor is never mutated underneath it.
//!
//! All counts are relative to a [`GrantTally`]: the number of selected
//! partners `n` and, per code, how many of them actually hold it.

use std::collections::{BTreeMap, BTreeSet};

use marquee_types::{PartnerId, PermissionCode};
use serde::{Deserialize, Serialize};

use crate::matrix::StaffPartnerPermissionView;

/// Tri-state shown for one permission across the selected partners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GrantStatus {
    /// No selected partner ends up holding the code.
    None,
    /// Some but not all selected partners end up holding the code.
    Partial,
    /// Every selected partner ends up holding the code.
    Full,
}

/// Actual grant counts over a partner selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantTally {
    partner_count: usize,
    counts: BTreeMap<PermissionCode, usize>,
}

impl GrantTally {
    pub fn new(partner_count: usize) -> Self {
        Self {
            partner_count,
            counts: BTreeMap::new(),
        }
    }

    /// Sets the actual count for `code`, capped at the partner count.
    #[must_use]
    pub fn with_count(mut self, code: impl Into<PermissionCode>, count: usize) -> Self {
        self.counts
            .insert(code.into(), count.min(self.partner_count));
        self
    }

    /// Tallies `view` over `selected`.
    ///
    /// Selected partners missing from the view still count towards `n`.
    pub fn from_view(view: &StaffPartnerPermissionView, selected: &BTreeSet<PartnerId>) -> Self {
        let mut tally = Self::new(selected.len());
        for partner in view
            .partners
            .iter()
            .filter(|p| selected.contains(&p.partner_id))
        {
            for def in &partner.permissions {
                *tally
                    .counts
                    .entry(def.permission_code.clone())
                    .or_insert(0) += 1;
            }
        }
        tally
    }

    /// Number of selected partners (`n`).
    pub fn partner_count(&self) -> usize {
        self.partner_count
    }

    /// Selected partners that actually hold `code`.
    pub fn granted_count(&self, code: &PermissionCode) -> usize {
        self.counts.get(code).copied().unwrap_or(0)
    }

    /// True when every selected partner holds `code`. Never true for an
    /// empty selection.
    pub fn is_fully_granted(&self, code: &PermissionCode) -> bool {
        self.partner_count > 0 && self.granted_count(code) == self.partner_count
    }
}

/// Staged grants and revokes for the current selection.
///
/// A code is never in both sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChangeSet {
    grants: BTreeSet<PermissionCode>,
    revokes: BTreeSet<PermissionCode>,
}

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grants(&self) -> &BTreeSet<PermissionCode> {
        &self.grants
    }

    pub fn revokes(&self) -> &BTreeSet<PermissionCode> {
        &self.revokes
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty() && self.revokes.is_empty()
    }

    /// Number of staged codes.
    pub fn len(&self) -> usize {
        self.grants.len() + self.revokes.len()
    }

    pub fn is_pending_grant(&self, code: &PermissionCode) -> bool {
        self.grants.contains(code)
    }

    pub fn is_pending_revoke(&self, code: &PermissionCode) -> bool {
        self.revokes.contains(code)
    }

    /// Flips the intent for one code.
    ///
    /// A fully granted code toggles in and out of the revoke set; any other
    /// code toggles in and out of the grant set.
    #[must_use]
    pub fn toggle(mut self, code: &PermissionCode, tally: &GrantTally) -> Self {
        if tally.is_fully_granted(code) {
            if !self.revokes.remove(code) {
                self.grants.remove(code);
                self.revokes.insert(code.clone());
            }
        } else if !self.grants.remove(code) {
            self.revokes.remove(code);
            self.grants.insert(code.clone());
        }
        self
    }

    /// Stages a grant for every code not already fully granted.
    #[must_use]
    pub fn select_all<'a>(
        mut self,
        codes: impl IntoIterator<Item = &'a PermissionCode>,
        tally: &GrantTally,
    ) -> Self {
        for code in codes {
            if !tally.is_fully_granted(code) {
                self.revokes.remove(code);
                self.grants.insert(code.clone());
            }
        }
        self
    }

    /// Stages a revoke for every code held by at least one selected partner.
    #[must_use]
    pub fn deselect_all<'a>(
        mut self,
        codes: impl IntoIterator<Item = &'a PermissionCode>,
        tally: &GrantTally,
    ) -> Self {
        for code in codes {
            if tally.granted_count(code) > 0 {
                self.grants.remove(code);
                self.revokes.insert(code.clone());
            }
        }
        self
    }

    /// Drops all staged intent.
    #[must_use]
    pub fn reset(self) -> Self {
        Self::default()
    }

    /// Count of selected partners that would hold `code` after commit.
    pub fn effective_granted_count(&self, code: &PermissionCode, tally: &GrantTally) -> usize {
        if self.grants.contains(code) {
            tally.partner_count()
        } else if self.revokes.contains(code) {
            0
        } else {
            tally.granted_count(code)
        }
    }

    pub fn status(&self, code: &PermissionCode, tally: &GrantTally) -> GrantStatus {
        let effective = self.effective_granted_count(code, tally);
        if effective == 0 {
            GrantStatus::None
        } else if effective == tally.partner_count() {
            GrantStatus::Full
        } else {
            GrantStatus::Partial
        }
    }
}
