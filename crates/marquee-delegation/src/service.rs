//! Delegation service facade.
//!
//! Entry point used by the console front end. Every operation takes the
//! authenticated [`Caller`] and checks its authority before touching state.

use std::collections::BTreeSet;
use std::sync::Arc;

use marquee_config::MarqueeConfig;
use marquee_types::{PartnerId, PermissionCode, StaffId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::authority::Caller;
use crate::catalog::{PermissionCatalog, ResourceGroup};
use crate::error::{DelegationError, Result};
use crate::executor::{BulkApplyExecutor, CommitReport};
use crate::matrix::{BulkReport, ChangeKind, PartnerPermissions, PermissionMatrix};
use crate::session::EditSession;
use crate::steward::{AssignOutcome, AssignmentPlan, ExclusivePermissionSteward, RevokeOutcome};
use crate::store::{ExclusiveStore, MatrixStore};

/// Request body of grant and revoke operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionChangeRequest {
    pub partner_ids: BTreeSet<PartnerId>,
    pub permission_codes: BTreeSet<PermissionCode>,
}

impl PermissionChangeRequest {
    pub fn new(
        partner_ids: impl IntoIterator<Item = PartnerId>,
        permission_codes: impl IntoIterator<Item = PermissionCode>,
    ) -> Self {
        Self {
            partner_ids: partner_ids.into_iter().collect(),
            permission_codes: permission_codes.into_iter().collect(),
        }
    }

    /// True when the request would touch no pair.
    pub fn is_empty(&self) -> bool {
        self.partner_ids.is_empty() || self.permission_codes.is_empty()
    }
}

/// Current holder of the voucher category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherManager {
    pub staff_id: StaffId,
    pub staff_name: String,
}

/// Permission delegation operations with caller authorization.
#[derive(Debug, Clone)]
pub struct DelegationService {
    catalog: Arc<PermissionCatalog>,
    matrix: PermissionMatrix,
    steward: ExclusivePermissionSteward,
    executor: BulkApplyExecutor,
    audit_enabled: bool,
}

impl DelegationService {
    /// Creates a service over a store that backs both the matrix and the
    /// exclusive holder.
    pub fn new<S>(store: Arc<S>, catalog: PermissionCatalog) -> Self
    where
        S: MatrixStore + ExclusiveStore + 'static,
    {
        let catalog = Arc::new(catalog);
        let matrix_store: Arc<dyn MatrixStore> = store.clone();
        let exclusive_store: Arc<dyn ExclusiveStore> = store;
        Self {
            matrix: PermissionMatrix::new(matrix_store, Arc::clone(&catalog)),
            steward: ExclusivePermissionSteward::new(exclusive_store, &catalog),
            executor: BulkApplyExecutor::new(),
            catalog,
            audit_enabled: true,
        }
    }

    /// Creates a service with the catalog and audit settings from `config`.
    pub fn from_config<S>(store: Arc<S>, config: &MarqueeConfig) -> Self
    where
        S: MatrixStore + ExclusiveStore + 'static,
    {
        let catalog = PermissionCatalog::from_config(&config.catalog, &config.delegation);
        Self::new(store, catalog).with_audit(config.delegation.audit_enabled)
    }

    /// Creates a service without audit logging (for testing).
    #[must_use]
    pub fn without_audit(self) -> Self {
        self.with_audit(false)
    }

    #[must_use]
    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit_enabled = enabled;
        self.executor = self.executor.with_audit(enabled);
        self.steward = self.steward.with_audit(enabled);
        self
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    pub fn steward(&self) -> &ExclusivePermissionSteward {
        &self.steward
    }

    /// Resource groups offered by the per-partner delegation flow.
    pub fn list_permission_groups(&self, caller: &Caller) -> Result<Vec<ResourceGroup>> {
        caller.authorize_read(None)?;
        Ok(self.catalog.delegable_groups())
    }

    /// Grants held by `staff`, optionally limited to `partner_ids`.
    ///
    /// Partners the staff member does not manage are omitted.
    pub fn get_staff_permissions(
        &self,
        caller: &Caller,
        staff: StaffId,
        partner_ids: Option<&BTreeSet<PartnerId>>,
    ) -> Result<Vec<PartnerPermissions>> {
        caller.authorize_read(Some(staff))?;
        self.matrix.staff_record(staff)?;
        let view = match partner_ids {
            Some(partners) => self.matrix.get_grants(staff, partners)?,
            None => self.matrix.get_all_grants(staff)?,
        };
        Ok(view.partners)
    }

    /// Grants every requested code on every requested partner.
    ///
    /// Returns [`DelegationError::PartialFailure`] if any pair failed. The
    /// request can be resubmitted as is.
    pub fn grant_permissions(
        &self,
        caller: &Caller,
        staff: StaffId,
        request: &PermissionChangeRequest,
    ) -> Result<BulkReport> {
        self.apply(caller, staff, request, ChangeKind::Grant)
    }

    /// Revokes every requested code on every requested partner.
    pub fn revoke_permissions(
        &self,
        caller: &Caller,
        staff: StaffId,
        request: &PermissionChangeRequest,
    ) -> Result<BulkReport> {
        self.apply(caller, staff, request, ChangeKind::Revoke)
    }

    fn apply(
        &self,
        caller: &Caller,
        staff: StaffId,
        request: &PermissionChangeRequest,
        kind: ChangeKind,
    ) -> Result<BulkReport> {
        caller.authorize_change(staff)?;
        self.catalog.check_delegable(&request.permission_codes)?;
        if request.is_empty() {
            return Ok(BulkReport::default());
        }

        let report = match kind {
            ChangeKind::Grant => {
                self.matrix
                    .grant(staff, &request.partner_ids, &request.permission_codes)
            }
            ChangeKind::Revoke => {
                self.matrix
                    .revoke(staff, &request.partner_ids, &request.permission_codes)
            }
        };

        if !report.is_success() {
            if self.audit_enabled {
                warn!(
                    caller = %caller.staff_id,
                    staff = %staff,
                    operation = ?kind,
                    failed = report.failed_count(),
                    "Permission change partially failed"
                );
            }
            return Err(DelegationError::PartialFailure { report });
        }

        if self.audit_enabled {
            info!(
                caller = %caller.staff_id,
                staff = %staff,
                operation = ?kind,
                partners = ?request.partner_ids,
                codes = ?request.permission_codes,
                applied = report.applied,
                "Permission change applied"
            );
        }
        Ok(report)
    }

    pub fn get_current_voucher_manager(&self, caller: &Caller) -> Result<Option<VoucherManager>> {
        caller.authorize_read(None)?;
        Ok(self.steward.holder_record()?.map(|record| VoucherManager {
            staff_id: record.id,
            staff_name: record.name,
        }))
    }

    /// Describes what granting the voucher category to `staff` would do,
    /// including the transfer warning when another staff member holds it.
    pub fn plan_voucher_assignment(&self, caller: &Caller, staff: StaffId) -> Result<AssignmentPlan> {
        caller.authorize_change(staff)?;
        self.steward.plan(staff)
    }

    /// Executes a plan returned by
    /// [`plan_voucher_assignment`](Self::plan_voucher_assignment).
    pub fn confirm_voucher_assignment(
        &self,
        caller: &Caller,
        plan: &AssignmentPlan,
    ) -> Result<AssignOutcome> {
        caller.authorize_change(plan.target())?;
        self.steward.commit(plan)
    }

    /// Grants the voucher category to `staff`, transferring it if another
    /// staff member holds it.
    pub fn grant_voucher_permissions(&self, caller: &Caller, staff: StaffId) -> Result<AssignOutcome> {
        caller.authorize_change(staff)?;
        self.steward.assign(staff)
    }

    pub fn revoke_voucher_permissions(&self, caller: &Caller, staff: StaffId) -> Result<RevokeOutcome> {
        caller.authorize_change(staff)?;
        self.steward.revoke(staff)
    }

    /// Records that `staff` manages `partner`. Returns false if it already
    /// did.
    pub fn assign_partner_to_staff(
        &self,
        caller: &Caller,
        staff: StaffId,
        partner: PartnerId,
    ) -> Result<bool> {
        caller.authorize_change(staff)?;
        Ok(self.matrix.assign_partner(staff, partner)?)
    }

    /// Opens an edit session for `staff`.
    pub fn open_session(&self, caller: &Caller, staff: StaffId) -> Result<EditSession> {
        caller.authorize_read(Some(staff))?;
        Ok(EditSession::open(self.matrix.clone(), staff)?)
    }

    /// Commits an edit session.
    pub fn commit_session(&self, caller: &Caller, session: &mut EditSession) -> Result<CommitReport> {
        caller.authorize_change(session.staff_id())?;
        self.executor.commit(session)
    }
}
