//! Staff-partner permission matrix.
//!
//! Reads and bulk-mutates the persisted `(staff, partner, permission)` grants
//! through a [`MatrixStore`].

use std::collections::BTreeSet;
use std::sync::Arc;

use marquee_types::{Grant, PartnerId, PermissionCode, PermissionDefinition, StaffId, StaffRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::PermissionCatalog;
use crate::error::{StoreError, StoreResult};
use crate::store::MatrixStore;

/// Granted permissions of one staff member on one partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerPermissions {
    pub partner_id: PartnerId,
    pub partner_name: String,
    pub permissions: Vec<PermissionDefinition>,
}

impl PartnerPermissions {
    /// Returns whether the partner entry includes `code`.
    pub fn holds(&self, code: &PermissionCode) -> bool {
        self.permissions.iter().any(|p| &p.permission_code == code)
    }
}

/// Read projection of a staff member's grants, grouped by partner.
///
/// Only partners the staff member is assigned to appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffPartnerPermissionView {
    pub staff_id: StaffId,
    pub partners: Vec<PartnerPermissions>,
}

impl StaffPartnerPermissionView {
    pub fn empty(staff_id: StaffId) -> Self {
        Self {
            staff_id,
            partners: Vec::new(),
        }
    }

    /// True when the staff member manages none of the requested partners.
    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    pub fn partner(&self, partner: PartnerId) -> Option<&PartnerPermissions> {
        self.partners.iter().find(|p| p.partner_id == partner)
    }

    pub fn partner_ids(&self) -> BTreeSet<PartnerId> {
        self.partners.iter().map(|p| p.partner_id).collect()
    }

    /// Number of partners in `selection` that hold `code`.
    pub fn granted_count(&self, code: &PermissionCode, selection: &BTreeSet<PartnerId>) -> usize {
        self.partners
            .iter()
            .filter(|p| selection.contains(&p.partner_id) && p.holds(code))
            .count()
    }
}

/// Direction of a matrix change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Grant,
    Revoke,
}

/// A `(partner, permission)` pair that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairFailure {
    pub partner_id: PartnerId,
    pub permission_code: PermissionCode,
    pub operation: ChangeKind,
    pub error: StoreError,
}

impl PairFailure {
    /// Human-readable reason for rendering.
    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

/// Per-pair outcome of a bulk grant or revoke.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
    /// Pairs whose state changed.
    pub applied: usize,
    /// Pairs already in the requested state.
    pub unchanged: usize,
    /// Pairs that failed, in application order.
    pub failures: Vec<PairFailure>,
}

impl BulkReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn attempted_count(&self) -> usize {
        self.applied + self.unchanged + self.failures.len()
    }

    /// Partners with at least one failed pair.
    pub fn failed_partners(&self) -> BTreeSet<PartnerId> {
        self.failures.iter().map(|f| f.partner_id).collect()
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: BulkReport) {
        self.applied += other.applied;
        self.unchanged += other.unchanged;
        self.failures.extend(other.failures);
    }
}

/// Access to the persisted permission matrix.
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    store: Arc<dyn MatrixStore>,
    catalog: Arc<PermissionCatalog>,
}

impl PermissionMatrix {
    pub fn new(store: Arc<dyn MatrixStore>, catalog: Arc<PermissionCatalog>) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &Arc<PermissionCatalog> {
        &self.catalog
    }

    /// Looks up a staff member, failing if unknown.
    pub fn staff_record(&self, staff: StaffId) -> StoreResult<StaffRecord> {
        self.store
            .staff(staff)?
            .ok_or(StoreError::UnknownStaff { staff })
    }

    /// Grants of `staff` restricted to `partners`.
    ///
    /// Partners the staff member is not assigned to are omitted.
    pub fn get_grants(
        &self,
        staff: StaffId,
        partners: &BTreeSet<PartnerId>,
    ) -> StoreResult<StaffPartnerPermissionView> {
        let assigned = self.store.assigned_partners(staff)?;
        self.view_for(staff, assigned.intersection(partners).copied())
    }

    /// Grants of `staff` across every assigned partner.
    pub fn get_all_grants(&self, staff: StaffId) -> StoreResult<StaffPartnerPermissionView> {
        let assigned = self.store.assigned_partners(staff)?;
        self.view_for(staff, assigned.into_iter())
    }

    fn view_for(
        &self,
        staff: StaffId,
        partners: impl Iterator<Item = PartnerId>,
    ) -> StoreResult<StaffPartnerPermissionView> {
        let mut view = StaffPartnerPermissionView::empty(staff);
        for partner_id in partners {
            let partner_name = self
                .store
                .partner(partner_id)?
                .map_or_else(|| format!("Partner {partner_id}"), |p| p.name);
            let held = self.store.held_codes(staff, partner_id)?;
            view.partners.push(PartnerPermissions {
                partner_id,
                partner_name,
                permissions: self.catalog.definitions_for(held.iter()),
            });
        }
        debug!(
            staff = %staff,
            partners = view.partners.len(),
            "Loaded staff permission view"
        );
        Ok(view)
    }

    /// Records that `staff` manages `partner`.
    pub fn assign_partner(&self, staff: StaffId, partner: PartnerId) -> StoreResult<bool> {
        let created = self.store.assign_partner(staff, partner)?;
        if created {
            info!(staff = %staff, partner = %partner, "Partner assigned to staff");
        }
        Ok(created)
    }

    /// Grants every code on every partner.
    ///
    /// Each pair is applied independently; failures are collected.
    pub fn grant(
        &self,
        staff: StaffId,
        partners: &BTreeSet<PartnerId>,
        codes: &BTreeSet<PermissionCode>,
    ) -> BulkReport {
        self.apply(ChangeKind::Grant, staff, partners, codes)
    }

    /// Revokes every code on every partner.
    ///
    /// Revoking an unheld pair is a no-op, not an error.
    pub fn revoke(
        &self,
        staff: StaffId,
        partners: &BTreeSet<PartnerId>,
        codes: &BTreeSet<PermissionCode>,
    ) -> BulkReport {
        self.apply(ChangeKind::Revoke, staff, partners, codes)
    }

    fn apply(
        &self,
        kind: ChangeKind,
        staff: StaffId,
        partners: &BTreeSet<PartnerId>,
        codes: &BTreeSet<PermissionCode>,
    ) -> BulkReport {
        let mut report = BulkReport::default();

        for &partner_id in partners {
            for code in codes {
                let grant = Grant::new(staff, partner_id, code.clone());
                let result = match kind {
                    ChangeKind::Grant => self.store.insert_grant(&grant),
                    ChangeKind::Revoke => self.store.remove_grant(&grant),
                };
                match result {
                    Ok(true) => report.applied += 1,
                    Ok(false) => report.unchanged += 1,
                    Err(error) => {
                        warn!(
                            staff = %staff,
                            partner = %partner_id,
                            code = %code,
                            operation = ?kind,
                            error = %error,
                            "Permission change failed"
                        );
                        report.failures.push(PairFailure {
                            partner_id,
                            permission_code: code.clone(),
                            operation: kind,
                            error,
                        });
                    }
                }
            }
        }

        debug!(
            staff = %staff,
            operation = ?kind,
            applied = report.applied,
            unchanged = report.unchanged,
            failed = report.failed_count(),
            "Bulk permission change finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, PermissionMatrix) {
        let store = Arc::new(MemoryStore::new());
        store.register_staff(StaffId::new(1), "Ada").unwrap();
        for (id, name) in [(10, "Lumiere"), (20, "Odeon"), (30, "Rex")] {
            store.register_partner(PartnerId::new(id), name).unwrap();
        }
        let matrix = PermissionMatrix::new(store.clone(), Arc::new(PermissionCatalog::standard()));
        matrix
            .assign_partner(StaffId::new(1), PartnerId::new(10))
            .unwrap();
        matrix
            .assign_partner(StaffId::new(1), PartnerId::new(20))
            .unwrap();
        (store, matrix)
    }

    fn partners(ids: &[u64]) -> BTreeSet<PartnerId> {
        ids.iter().copied().map(PartnerId::new).collect()
    }

    fn codes(names: &[&str]) -> BTreeSet<PermissionCode> {
        names.iter().copied().map(PermissionCode::from).collect()
    }

    #[test]
    fn test_get_grants_omits_unassigned_partners() {
        let (_store, matrix) = setup();

        let view = matrix
            .get_grants(StaffId::new(1), &partners(&[10, 30]))
            .unwrap();

        assert_eq!(view.partner_ids(), partners(&[10]));
        assert_eq!(view.partners[0].partner_name, "Lumiere");
        assert!(view.partners[0].permissions.is_empty());
    }

    #[test]
    fn test_grant_is_cartesian_and_idempotent() {
        let (_store, matrix) = setup();
        let staff = StaffId::new(1);

        let report = matrix.grant(
            staff,
            &partners(&[10, 20]),
            &codes(&["CONTRACT_READ", "MOVIE_READ"]),
        );
        assert!(report.is_success());
        assert_eq!(report.applied, 4);

        let again = matrix.grant(staff, &partners(&[10, 20]), &codes(&["CONTRACT_READ"]));
        assert_eq!(again.applied, 0);
        assert_eq!(again.unchanged, 2);

        let view = matrix.get_all_grants(staff).unwrap();
        assert_eq!(
            view.granted_count(&PermissionCode::from("MOVIE_READ"), &partners(&[10, 20])),
            2
        );
    }

    #[test]
    fn test_grant_reports_failures_per_pair() {
        let (_store, matrix) = setup();

        let report = matrix.grant(
            StaffId::new(1),
            &partners(&[10, 30]),
            &codes(&["CONTRACT_READ"]),
        );

        assert_eq!(report.applied, 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failed_partners(), partners(&[30]));
        assert_eq!(report.failures[0].operation, ChangeKind::Grant);
        assert!(report.failures[0].reason().contains("not assigned"));
    }

    #[test]
    fn test_revoke_unheld_is_noop() {
        let (_store, matrix) = setup();

        let report = matrix.revoke(
            StaffId::new(1),
            &partners(&[10, 20, 30]),
            &codes(&["CONTRACT_READ"]),
        );

        assert!(report.is_success());
        assert_eq!(report.unchanged, 3);
    }

    #[test]
    fn test_empty_inputs_are_noops() {
        let (_store, matrix) = setup();

        let report = matrix.grant(StaffId::new(1), &BTreeSet::new(), &codes(&["CONTRACT_READ"]));
        assert_eq!(report, BulkReport::default());

        let report = matrix.revoke(StaffId::new(1), &partners(&[10]), &BTreeSet::new());
        assert_eq!(report, BulkReport::default());
    }

    #[test]
    fn test_report_merge() {
        let mut a = BulkReport {
            applied: 2,
            unchanged: 1,
            failures: Vec::new(),
        };
        let b = BulkReport {
            applied: 1,
            unchanged: 0,
            failures: vec![PairFailure {
                partner_id: PartnerId::new(1),
                permission_code: PermissionCode::from("X"),
                operation: ChangeKind::Revoke,
                error: StoreError::Unavailable {
                    reason: "down".to_string(),
                },
            }],
        };
        a.merge(b);
        assert_eq!(a.attempted_count(), 5);
        assert!(!a.is_success());
    }
}
