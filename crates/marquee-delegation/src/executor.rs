//! Bulk apply executor.
//!
//! Turns a session's pending change set into matrix calls. The executor
//! validates before issuing anything, issues every grant and every revoke,
//! and only clears the session's intent when all pairs succeeded.

use std::collections::BTreeSet;

use marquee_types::{PartnerId, PermissionCode, StaffId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DelegationError, Result};
use crate::matrix::BulkReport;
use crate::session::EditSession;

/// Summary of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub staff_id: StaffId,
    pub partners: BTreeSet<PartnerId>,
    pub granted: BTreeSet<PermissionCode>,
    pub revoked: BTreeSet<PermissionCode>,
    pub applied: usize,
    pub unchanged: usize,
    /// Whether the session view was reloaded after the commit. A failed
    /// reload leaves the committed changes in place.
    pub refreshed: bool,
}

/// Applies pending change sets to the matrix.
#[derive(Debug, Clone)]
pub struct BulkApplyExecutor {
    audit_enabled: bool,
}

impl BulkApplyExecutor {
    pub fn new() -> Self {
        Self {
            audit_enabled: true,
        }
    }

    /// Disables audit logging (for testing).
    #[must_use]
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    #[must_use]
    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit_enabled = enabled;
        self
    }

    /// Checks the session can be committed. Makes no store call.
    pub fn validate(&self, session: &EditSession) -> Result<()> {
        if session.selected_partners().is_empty() {
            return Err(DelegationError::NoPartnerSelected);
        }
        let changes = session.changes();
        if changes.is_empty() {
            return Err(DelegationError::EmptyChangeSet);
        }
        session
            .matrix()
            .catalog()
            .check_delegable(changes.grants().iter().chain(changes.revokes()))
    }

    /// Commits the session's pending changes.
    ///
    /// On full success the change set is cleared and the view refreshed. If
    /// any pair fails, [`DelegationError::PartialFailure`] is returned and the
    /// change set is left as it was, so the same commit can be retried.
    pub fn commit(&self, session: &mut EditSession) -> Result<CommitReport> {
        if let Err(e) = self.validate(session) {
            if self.audit_enabled {
                warn!(
                    staff = %session.staff_id(),
                    error = %e,
                    "Commit rejected"
                );
            }
            return Err(e);
        }

        let staff = session.staff_id();
        let partners = session.selected_partners().clone();
        let granted = session.changes().grants().clone();
        let revoked = session.changes().revokes().clone();

        let mut report = BulkReport::default();
        if !granted.is_empty() {
            report.merge(session.matrix().grant(staff, &partners, &granted));
        }
        if !revoked.is_empty() {
            report.merge(session.matrix().revoke(staff, &partners, &revoked));
        }

        if !report.is_success() {
            if self.audit_enabled {
                warn!(
                    staff = %staff,
                    partners = partners.len(),
                    failed = report.failed_count(),
                    attempted = report.attempted_count(),
                    "Commit partially failed, pending changes kept"
                );
            }
            return Err(DelegationError::PartialFailure { report });
        }

        if self.audit_enabled {
            info!(
                staff = %staff,
                partners = ?partners,
                granted = ?granted,
                revoked = ?revoked,
                applied = report.applied,
                "Permission changes committed"
            );
        }

        session.clear_changes();
        let refreshed = match session.refresh() {
            Ok(()) => true,
            Err(e) => {
                warn!(staff = %staff, error = %e, "Failed to reload view after commit");
                false
            }
        };

        Ok(CommitReport {
            staff_id: staff,
            partners,
            granted,
            revoked,
            applied: report.applied,
            unchanged: report.unchanged,
            refreshed,
        })
    }
}

impl Default for BulkApplyExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::PermissionCatalog;
    use crate::matrix::PermissionMatrix;
    use crate::memory::MemoryStore;

    fn open() -> EditSession {
        let store = Arc::new(MemoryStore::new());
        store.register_staff(StaffId::new(3), "Linus").unwrap();
        store.register_partner(PartnerId::new(1), "P1").unwrap();
        store.register_partner(PartnerId::new(2), "P2").unwrap();
        let matrix = PermissionMatrix::new(store, Arc::new(PermissionCatalog::standard()));
        for p in [1, 2] {
            matrix
                .assign_partner(StaffId::new(3), PartnerId::new(p))
                .unwrap();
        }
        EditSession::open(matrix, StaffId::new(3)).unwrap()
    }

    #[test]
    fn test_audit_builder_toggles_flag() {
        assert!(BulkApplyExecutor::new().audit_enabled);
        assert!(!BulkApplyExecutor::new().without_audit().audit_enabled);
        assert!(
            BulkApplyExecutor::default()
                .without_audit()
                .with_audit(true)
                .audit_enabled
        );
    }

    #[test]
    fn test_validate_requires_partner_and_changes() {
        let executor = BulkApplyExecutor::new().without_audit();
        let mut session = open();

        assert!(matches!(
            executor.validate(&session),
            Err(DelegationError::NoPartnerSelected)
        ));

        session.select_partners([PartnerId::new(1)]);
        assert!(matches!(
            executor.validate(&session),
            Err(DelegationError::EmptyChangeSet)
        ));

        session.toggle(&PermissionCode::from("MOVIE_READ"));
        assert!(executor.validate(&session).is_ok());
    }

    #[test]
    fn test_validate_rejects_exclusive_codes() {
        let executor = BulkApplyExecutor::new().without_audit();
        let mut session = open();
        session.select_partners([PartnerId::new(1)]);
        session.toggle(&PermissionCode::from("VOUCHER_CREATE"));

        let err = executor.commit(&mut session).unwrap_err();
        assert!(matches!(err, DelegationError::ExclusivePermission { .. }));
        assert!(session.changes().is_pending_grant(&PermissionCode::from("VOUCHER_CREATE")));
    }

    #[test]
    fn test_commit_clears_and_refreshes() {
        let executor = BulkApplyExecutor::new().without_audit();
        let mut session = open();
        let code = PermissionCode::from("BOOKING_READ");

        session.select_partners([PartnerId::new(1), PartnerId::new(2)]);
        session.toggle(&code);
        let report = executor.commit(&mut session).unwrap();

        assert_eq!(report.applied, 2);
        assert!(report.refreshed);
        assert!(session.changes().is_empty());
        assert_eq!(session.granted_count(&code), 2);

        // Revoke round
        session.toggle(&code);
        let report = executor.commit(&mut session).unwrap();
        assert_eq!(report.revoked, [code.clone()].into());
        assert_eq!(session.granted_count(&code), 0);
    }
}
