//! Exclusive permission steward.
//!
//! Owns the single-holder permission category (vouchers by default). At most
//! one staff member holds the category at any committed state. Moving it
//! between staff is a transfer that always revokes the old holder before
//! granting the new one, so the new holder is never reported while the old
//! one still holds it.
//!
//! Assignment is two-phase: [`ExclusivePermissionSteward::plan`] reports what
//! would happen (including a warning naming the prior holder), and
//! [`ExclusivePermissionSteward::commit`] executes the plan if the holder has
//! not moved in the meantime.

use std::fmt;
use std::sync::Arc;

use marquee_types::{PermissionCode, ResourceType, StaffId, StaffRecord};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::catalog::PermissionCatalog;
use crate::error::{DelegationError, Result, StoreError, StoreResult};
use crate::store::ExclusiveStore;

/// Holder state of the exclusive category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "staffId", rename_all = "camelCase")]
pub enum HolderState {
    Unassigned,
    AssignedTo(StaffId),
}

impl HolderState {
    pub fn holder(&self) -> Option<StaffId> {
        match self {
            HolderState::Unassigned => None,
            HolderState::AssignedTo(staff) => Some(*staff),
        }
    }
}

impl From<Option<StaffId>> for HolderState {
    fn from(holder: Option<StaffId>) -> Self {
        holder.map_or(HolderState::Unassigned, HolderState::AssignedTo)
    }
}

impl fmt::Display for HolderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HolderState::Unassigned => write!(f, "unassigned"),
            HolderState::AssignedTo(staff) => write!(f, "assigned to staff {staff}"),
        }
    }
}

/// What an assignment would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AssignmentPlan {
    /// Nobody holds the category.
    Grant { to: StaffId },
    /// Another staff member holds the category and will lose it.
    Transfer { from: StaffRecord, to: StaffId },
    /// The target already holds the category.
    NoOp { holder: StaffId },
}

impl AssignmentPlan {
    /// Staff member that ends up holding the category.
    pub fn target(&self) -> StaffId {
        match self {
            AssignmentPlan::Grant { to } | AssignmentPlan::Transfer { to, .. } => *to,
            AssignmentPlan::NoOp { holder } => *holder,
        }
    }

    /// Holder the plan was made against.
    pub fn expected_holder(&self) -> Option<StaffId> {
        match self {
            AssignmentPlan::Grant { .. } => None,
            AssignmentPlan::Transfer { from, .. } => Some(from.id),
            AssignmentPlan::NoOp { holder } => Some(*holder),
        }
    }

    pub fn requires_confirmation(&self) -> bool {
        matches!(self, AssignmentPlan::Transfer { .. })
    }

    /// Warning to show before a transfer.
    pub fn warning(&self) -> Option<String> {
        match self {
            AssignmentPlan::Transfer { from, to } => Some(format!(
                "{} (staff {}) currently manages vouchers. Assigning staff {to} will revoke all voucher permissions from {}.",
                from.name, from.id, from.name
            )),
            AssignmentPlan::Grant { .. } | AssignmentPlan::NoOp { .. } => None,
        }
    }
}

/// Result of a committed assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AssignOutcome {
    Granted { to: StaffId },
    Transferred { from: StaffId, to: StaffId },
    Unchanged { holder: StaffId },
}

/// Result of a revoke request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevokeOutcome {
    /// The staff member held the category and lost it.
    Revoked,
    /// The staff member was not the holder; nothing changed.
    NotHolder,
}

/// Guards the single holder of the exclusive category.
#[derive(Debug, Clone)]
pub struct ExclusivePermissionSteward {
    store: Arc<dyn ExclusiveStore>,
    resource_type: ResourceType,
    codes: Vec<PermissionCode>,
    audit_enabled: bool,
}

impl ExclusivePermissionSteward {
    pub fn new(store: Arc<dyn ExclusiveStore>, catalog: &PermissionCatalog) -> Self {
        Self {
            store,
            resource_type: catalog.exclusive_resource_type().clone(),
            codes: catalog.exclusive_codes(),
            audit_enabled: true,
        }
    }

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

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Codes granted and revoked as a unit.
    pub fn codes(&self) -> &[PermissionCode] {
        &self.codes
    }

    pub fn state(&self) -> StoreResult<HolderState> {
        self.store.exclusive_holder().map(HolderState::from)
    }

    pub fn current_holder(&self) -> StoreResult<Option<StaffId>> {
        self.store.exclusive_holder()
    }

    /// Directory record of the current holder.
    ///
    /// A holder missing from the directory is reported with a placeholder
    /// name.
    pub fn holder_record(&self) -> StoreResult<Option<StaffRecord>> {
        match self.store.exclusive_holder()? {
            Some(holder) => Ok(Some(self.record_or_placeholder(holder)?)),
            None => Ok(None),
        }
    }

    fn record_or_placeholder(&self, staff: StaffId) -> StoreResult<StaffRecord> {
        Ok(self
            .store
            .staff(staff)?
            .unwrap_or_else(|| StaffRecord::new(staff, format!("Staff {staff}"))))
    }

    pub fn holds(&self, staff: StaffId) -> StoreResult<bool> {
        Ok(self.store.exclusive_holder()? == Some(staff))
    }

    /// Works out what assigning the category to `to` would do.
    pub fn plan(&self, to: StaffId) -> Result<AssignmentPlan> {
        if self.store.staff(to)?.is_none() {
            return Err(StoreError::UnknownStaff { staff: to }.into());
        }
        let plan = match self.store.exclusive_holder()? {
            None => AssignmentPlan::Grant { to },
            Some(holder) if holder == to => AssignmentPlan::NoOp { holder },
            Some(holder) => AssignmentPlan::Transfer {
                from: self.record_or_placeholder(holder)?,
                to,
            },
        };
        Ok(plan)
    }

    /// Plans and commits in one step.
    pub fn assign(&self, to: StaffId) -> Result<AssignOutcome> {
        let plan = self.plan(to)?;
        self.commit(&plan)
    }

    /// Executes a previously computed plan.
    ///
    /// Fails with [`DelegationError::HolderChanged`] if the holder moved since
    /// the plan was made.
    pub fn commit(&self, plan: &AssignmentPlan) -> Result<AssignOutcome> {
        let actual = self.store.exclusive_holder()?;
        let expected = plan.expected_holder();
        if actual != expected {
            if self.audit_enabled {
                warn!(
                    expected = ?expected,
                    actual = ?actual,
                    "Exclusive holder changed before commit"
                );
            }
            return Err(DelegationError::HolderChanged { expected, actual });
        }

        match plan {
            AssignmentPlan::NoOp { holder } => Ok(AssignOutcome::Unchanged { holder: *holder }),
            AssignmentPlan::Grant { to } => {
                self.store.grant_exclusive(*to, &self.codes)?;
                if self.audit_enabled {
                    info!(
                        staff = %to,
                        resource = %self.resource_type,
                        "Exclusive permissions granted"
                    );
                }
                Ok(AssignOutcome::Granted { to: *to })
            }
            AssignmentPlan::Transfer { from, to } => self.transfer(from.id, *to),
        }
    }

    fn transfer(&self, from: StaffId, to: StaffId) -> Result<AssignOutcome> {
        // Old holder keeps the category if this fails
        self.store.revoke_exclusive(from, &self.codes)?;
        if self.audit_enabled {
            info!(
                staff = %from,
                resource = %self.resource_type,
                "Exclusive permissions revoked for transfer"
            );
        }

        if let Err(source) = self.store.grant_exclusive(to, &self.codes) {
            let holder = self.holder_after_failed_grant(&source);
            error!(
                previous = %from,
                attempted = %to,
                error = %source,
                holder = %holder,
                "Transfer interrupted"
            );
            return Err(DelegationError::TransferConflict {
                previous: from,
                attempted: to,
                holder,
                source,
            });
        }

        if self.audit_enabled {
            info!(
                from = %from,
                to = %to,
                resource = %self.resource_type,
                "Exclusive permissions transferred"
            );
        }
        Ok(AssignOutcome::Transferred { from, to })
    }

    /// Holder state once a transfer's grant has failed after the revoke.
    ///
    /// A `HolderConflict` names the staff member whose concurrent assignment
    /// landed first. Otherwise the holder is re-read; if that read fails too,
    /// the category is reported unassigned since the revoke went through.
    fn holder_after_failed_grant(&self, source: &StoreError) -> HolderState {
        if let StoreError::HolderConflict { holder } = source {
            return HolderState::AssignedTo(*holder);
        }
        match self.store.exclusive_holder() {
            Ok(holder) => holder.into(),
            Err(e) => {
                warn!(error = %e, "Could not re-read exclusive holder after failed transfer");
                HolderState::Unassigned
            }
        }
    }

    /// Revokes the category from `staff` if it is the current holder.
    pub fn revoke(&self, staff: StaffId) -> Result<RevokeOutcome> {
        if self.store.exclusive_holder()? != Some(staff) {
            return Ok(RevokeOutcome::NotHolder);
        }
        self.store.revoke_exclusive(staff, &self.codes)?;
        if self.audit_enabled {
            info!(
                staff = %staff,
                resource = %self.resource_type,
                "Exclusive permissions revoked"
            );
        }
        Ok(RevokeOutcome::Revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn steward() -> (Arc<MemoryStore>, ExclusivePermissionSteward) {
        let store = Arc::new(MemoryStore::new());
        store.register_staff(StaffId::new(1), "Ada").unwrap();
        store.register_staff(StaffId::new(2), "Brian").unwrap();
        let steward = ExclusivePermissionSteward::new(store.clone(), &PermissionCatalog::standard())
            .without_audit();
        (store, steward)
    }

    #[test]
    fn test_first_assignment_grants() {
        let (store, steward) = steward();
        assert_eq!(steward.state().unwrap(), HolderState::Unassigned);

        let plan = steward.plan(StaffId::new(1)).unwrap();
        assert_eq!(plan, AssignmentPlan::Grant { to: StaffId::new(1) });
        assert!(!plan.requires_confirmation());

        let outcome = steward.commit(&plan).unwrap();
        assert_eq!(outcome, AssignOutcome::Granted { to: StaffId::new(1) });
        assert_eq!(
            steward.state().unwrap(),
            HolderState::AssignedTo(StaffId::new(1))
        );
        assert_eq!(store.exclusive_codes(StaffId::new(1)).unwrap().len(), 4);
    }

    #[test]
    fn test_transfer_plan_names_prior_holder() {
        let (_store, steward) = steward();
        steward.assign(StaffId::new(1)).unwrap();

        let plan = steward.plan(StaffId::new(2)).unwrap();
        assert!(plan.requires_confirmation());
        let warning = plan.warning().unwrap();
        assert!(warning.contains("Ada"));

        let outcome = steward.commit(&plan).unwrap();
        assert_eq!(
            outcome,
            AssignOutcome::Transferred {
                from: StaffId::new(1),
                to: StaffId::new(2)
            }
        );
        assert!(!steward.holds(StaffId::new(1)).unwrap());
        assert!(steward.holds(StaffId::new(2)).unwrap());
    }

    #[test]
    fn test_assign_to_holder_is_noop() {
        let (_store, steward) = steward();
        steward.assign(StaffId::new(1)).unwrap();
        assert_eq!(
            steward.assign(StaffId::new(1)).unwrap(),
            AssignOutcome::Unchanged {
                holder: StaffId::new(1)
            }
        );
    }

    #[test]
    fn test_stale_plan_is_rejected() {
        let (_store, steward) = steward();
        let plan = steward.plan(StaffId::new(2)).unwrap();
        steward.assign(StaffId::new(1)).unwrap();

        match steward.commit(&plan) {
            Err(DelegationError::HolderChanged { expected, actual }) => {
                assert_eq!(expected, None);
                assert_eq!(actual, Some(StaffId::new(1)));
            }
            other => panic!("Expected HolderChanged, got {other:?}"),
        }
        assert!(steward.holds(StaffId::new(1)).unwrap());
    }

    #[test]
    fn test_revoke_non_holder_is_noop() {
        let (_store, steward) = steward();
        steward.assign(StaffId::new(1)).unwrap();

        assert_eq!(
            steward.revoke(StaffId::new(2)).unwrap(),
            RevokeOutcome::NotHolder
        );
        assert_eq!(
            steward.revoke(StaffId::new(1)).unwrap(),
            RevokeOutcome::Revoked
        );
        assert_eq!(steward.current_holder().unwrap(), None);
    }

    #[test]
    fn test_plan_for_unknown_staff_fails() {
        let (_store, steward) = steward();
        assert!(matches!(
            steward.plan(StaffId::new(42)),
            Err(DelegationError::Store(StoreError::UnknownStaff { .. }))
        ));
    }
}
