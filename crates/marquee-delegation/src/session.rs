//! Interactive edit session for one staff member.
//!
//! Bundles the partner selection, the latest matrix view and the pending
//! change set. Every edit is local until the session is committed through
//! [`BulkApplyExecutor`](crate::executor::BulkApplyExecutor).

use std::collections::BTreeSet;

use marquee_types::{PartnerId, PermissionCode, ResourceType, StaffId, StaffRecord};
use tracing::debug;

use crate::catalog::ResourceGroup;
use crate::error::StoreResult;
use crate::matrix::{PermissionMatrix, StaffPartnerPermissionView};
use crate::pending::{GrantStatus, GrantTally, PendingChangeSet};

/// Editing state for one staff member's partner permissions.
#[derive(Debug, Clone)]
pub struct EditSession {
    matrix: PermissionMatrix,
    staff: StaffRecord,
    selected: BTreeSet<PartnerId>,
    view: StaffPartnerPermissionView,
    tally: GrantTally,
    changes: PendingChangeSet,
}

impl EditSession {
    /// Loads the staff member's grants across all assigned partners.
    ///
    /// The session starts with no partner selected.
    pub fn open(matrix: PermissionMatrix, staff: StaffId) -> StoreResult<Self> {
        let staff = matrix.staff_record(staff)?;
        let view = matrix.get_all_grants(staff.id)?;
        debug!(
            staff = %staff.id,
            partners = view.partners.len(),
            "Opened edit session"
        );
        Ok(Self {
            matrix,
            staff,
            selected: BTreeSet::new(),
            view,
            tally: GrantTally::new(0),
            changes: PendingChangeSet::new(),
        })
    }

    pub fn staff_id(&self) -> StaffId {
        self.staff.id
    }

    pub fn staff(&self) -> &StaffRecord {
        &self.staff
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    pub fn view(&self) -> &StaffPartnerPermissionView {
        &self.view
    }

    pub fn tally(&self) -> &GrantTally {
        &self.tally
    }

    pub fn changes(&self) -> &PendingChangeSet {
        &self.changes
    }

    pub fn selected_partners(&self) -> &BTreeSet<PartnerId> {
        &self.selected
    }

    /// Partners the staff member manages.
    pub fn assigned_partners(&self) -> BTreeSet<PartnerId> {
        self.view.partner_ids()
    }

    /// True when the staff member manages no partner at all.
    ///
    /// Nothing can be selected or committed in this state.
    pub fn is_terminal_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// Replaces the partner selection.
    ///
    /// Partners the staff member does not manage are dropped. Pending intent
    /// is dropped when the selection actually changes. Returns whether it
    /// changed.
    pub fn select_partners(&mut self, partners: impl IntoIterator<Item = PartnerId>) -> bool {
        let next: BTreeSet<PartnerId> = partners
            .into_iter()
            .filter(|p| self.view.partner(*p).is_some())
            .collect();
        if next == self.selected {
            return false;
        }
        self.selected = next;
        self.on_selection_changed();
        true
    }

    /// Adds a managed partner to the selection. Unmanaged partners are ignored.
    pub fn add_partner(&mut self, partner: PartnerId) -> bool {
        if self.view.partner(partner).is_none() || !self.selected.insert(partner) {
            return false;
        }
        self.on_selection_changed();
        true
    }

    pub fn remove_partner(&mut self, partner: PartnerId) -> bool {
        if !self.selected.remove(&partner) {
            return false;
        }
        self.on_selection_changed();
        true
    }

    fn on_selection_changed(&mut self) {
        self.tally = GrantTally::from_view(&self.view, &self.selected);
        self.changes = std::mem::take(&mut self.changes).reset();
        debug!(
            staff = %self.staff.id,
            selected = self.selected.len(),
            "Partner selection changed, pending changes cleared"
        );
    }

    pub fn toggle(&mut self, code: &PermissionCode) {
        self.changes = std::mem::take(&mut self.changes).toggle(code, &self.tally);
    }

    pub fn select_all<'a>(&mut self, codes: impl IntoIterator<Item = &'a PermissionCode>) {
        self.changes = std::mem::take(&mut self.changes).select_all(codes, &self.tally);
    }

    pub fn deselect_all<'a>(&mut self, codes: impl IntoIterator<Item = &'a PermissionCode>) {
        self.changes = std::mem::take(&mut self.changes).deselect_all(codes, &self.tally);
    }

    pub fn select_all_in_group(&mut self, group: &ResourceGroup) {
        self.select_all(&group.codes());
    }

    pub fn deselect_all_in_group(&mut self, group: &ResourceGroup) {
        self.deselect_all(&group.codes());
    }

    /// Looks up the delegable group for `resource_type` and stages a grant for
    /// each of its codes. Returns false when no such group exists.
    pub fn select_resource(&mut self, resource_type: &ResourceType) -> bool {
        match self.matrix.catalog().delegable_group(resource_type) {
            Some(group) => {
                self.select_all_in_group(&group);
                true
            }
            None => false,
        }
    }

    /// Counterpart of [`select_resource`](Self::select_resource).
    pub fn deselect_resource(&mut self, resource_type: &ResourceType) -> bool {
        match self.matrix.catalog().delegable_group(resource_type) {
            Some(group) => {
                self.deselect_all_in_group(&group);
                true
            }
            None => false,
        }
    }

    /// Discards pending intent without touching the matrix.
    pub fn reset(&mut self) {
        self.changes = std::mem::take(&mut self.changes).reset();
    }

    pub fn granted_count(&self, code: &PermissionCode) -> usize {
        self.tally.granted_count(code)
    }

    pub fn effective_granted_count(&self, code: &PermissionCode) -> usize {
        self.changes.effective_granted_count(code, &self.tally)
    }

    pub fn status(&self, code: &PermissionCode) -> GrantStatus {
        self.changes.status(code, &self.tally)
    }

    /// Reloads the view from the matrix and re-tallies the selection.
    ///
    /// Pending intent is kept unless a selected partner is no longer managed,
    /// in which case it leaves the selection and intent is dropped.
    pub fn refresh(&mut self) -> StoreResult<()> {
        self.view = self.matrix.get_all_grants(self.staff.id)?;
        let before = self.selected.len();
        let view = &self.view;
        self.selected.retain(|p| view.partner(*p).is_some());
        if self.selected.len() != before {
            self.on_selection_changed();
            return Ok(());
        }
        self.tally = GrantTally::from_view(&self.view, &self.selected);
        Ok(())
    }

    pub(crate) fn clear_changes(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::PermissionCatalog;
    use crate::memory::MemoryStore;

    fn session() -> EditSession {
        let store = Arc::new(MemoryStore::new());
        store.register_staff(StaffId::new(7), "Grace").unwrap();
        store.register_partner(PartnerId::new(1), "P1").unwrap();
        store.register_partner(PartnerId::new(2), "P2").unwrap();
        let matrix = PermissionMatrix::new(store, Arc::new(PermissionCatalog::standard()));
        matrix
            .assign_partner(StaffId::new(7), PartnerId::new(1))
            .unwrap();
        matrix
            .assign_partner(StaffId::new(7), PartnerId::new(2))
            .unwrap();
        let grant = [PermissionCode::from("CONTRACT_READ")].into();
        let report = matrix.grant(StaffId::new(7), &[PartnerId::new(1)].into(), &grant);
        assert!(report.is_success());
        EditSession::open(matrix, StaffId::new(7)).unwrap()
    }

    #[test]
    fn test_open_starts_without_selection() {
        let session = session();
        assert_eq!(session.staff().name, "Grace");
        assert!(session.selected_partners().is_empty());
        assert!(!session.is_terminal_empty());
        assert_eq!(
            session.assigned_partners(),
            [PartnerId::new(1), PartnerId::new(2)].into()
        );
    }

    #[test]
    fn test_selection_drives_counts() {
        let mut session = session();
        let code = PermissionCode::from("CONTRACT_READ");

        session.select_partners([PartnerId::new(1)]);
        assert_eq!(session.status(&code), GrantStatus::Full);

        session.add_partner(PartnerId::new(2));
        assert_eq!(session.granted_count(&code), 1);
        assert_eq!(session.status(&code), GrantStatus::Partial);
    }

    #[test]
    fn test_selection_change_clears_pending() {
        let mut session = session();
        let code = PermissionCode::from("MOVIE_READ");

        session.select_partners([PartnerId::new(1)]);
        session.toggle(&code);
        assert!(!session.changes().is_empty());

        // Same selection keeps intent
        assert!(!session.select_partners([PartnerId::new(1)]));
        assert!(!session.changes().is_empty());

        assert!(session.remove_partner(PartnerId::new(1)));
        assert!(session.changes().is_empty());
    }

    #[test]
    fn test_unmanaged_partners_stay_out_of_selection() {
        let mut session = session();
        let code = PermissionCode::from("CONTRACT_READ");
        session.select_partners([PartnerId::new(1)]);
        session.toggle(&PermissionCode::from("MOVIE_READ"));

        // Partner 99 is not managed, so the scope is unchanged and intent kept
        assert!(!session.select_partners([PartnerId::new(1), PartnerId::new(99)]));
        assert!(!session.add_partner(PartnerId::new(99)));
        assert_eq!(session.selected_partners(), &[PartnerId::new(1)].into());
        assert_eq!(session.tally().partner_count(), 1);
        assert_eq!(session.status(&code), GrantStatus::Full);
        assert!(!session.changes().is_empty());
    }

    #[test]
    fn test_select_resource_rejects_exclusive_group() {
        let mut session = session();
        session.select_partners([PartnerId::new(1), PartnerId::new(2)]);

        assert!(!session.select_resource(&ResourceType::Voucher));
        assert!(session.changes().is_empty());

        assert!(session.select_resource(&ResourceType::Contract));
        assert_eq!(session.changes().grants().len(), 4);
    }

    #[test]
    fn test_unknown_staff_cannot_open() {
        let store = Arc::new(MemoryStore::new());
        let matrix = PermissionMatrix::new(store, Arc::new(PermissionCatalog::standard()));
        assert!(EditSession::open(matrix, StaffId::new(99)).is_err());
    }
}
