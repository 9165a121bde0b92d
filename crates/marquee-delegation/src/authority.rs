#![allow(clippy::match_same_arms)]
//! Caller authority for delegation operations.
//!
//! Defines 4 authority levels with escalating privileges:
//! - Staff: regular console account (most restrictive)
//! - ManagerStaff: staff with partner-management duties
//! - Manager: may delegate permissions to manager staff
//! - Administrator: full access (least restrictive)

use marquee_types::StaffId;
use serde::{Deserialize, Serialize};

use crate::error::{DelegationError, Result};

/// Authority level of an authenticated caller.
///
/// Levels are ordered from least to most privileged:
/// Staff < ManagerStaff < Manager < Administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Authority {
    /// Regular console account.
    ///
    /// **Delegation rights:**
    /// - May read its own partner permissions
    /// - Cannot read or change anyone else's
    Staff,

    /// Staff account granted partner-management duties by a manager.
    ///
    /// **Delegation rights:**
    /// - May read the catalog and other staff permissions
    /// - Cannot grant or revoke
    ManagerStaff,

    /// Partner manager.
    ///
    /// **Delegation rights:**
    /// - Grant/revoke per-partner permissions
    /// - Assign partners to staff
    /// - Assign or transfer the voucher category
    Manager,

    /// Console administrator.
    ///
    /// **Delegation rights:**
    /// - Everything a manager can do
    Administrator,
}

impl Authority {
    /// Returns whether this level may inspect other staff members' grants.
    pub fn can_read_delegations(&self) -> bool {
        match self {
            Authority::Staff => false,
            Authority::ManagerStaff => true,
            Authority::Manager => true,
            Authority::Administrator => true,
        }
    }

    /// Returns whether this level may grant, revoke or transfer permissions.
    pub fn can_manage_delegations(&self) -> bool {
        match self {
            Authority::Staff => false,
            Authority::ManagerStaff => false,
            Authority::Manager => true,
            Authority::Administrator => true,
        }
    }
}

/// An authenticated caller as handed over by the session collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub staff_id: StaffId,
    pub authority: Authority,
}

impl Caller {
    pub fn new(staff_id: StaffId, authority: Authority) -> Self {
        Self {
            staff_id,
            authority,
        }
    }

    pub fn manager(staff_id: StaffId) -> Self {
        Self::new(staff_id, Authority::Manager)
    }

    pub fn administrator(staff_id: StaffId) -> Self {
        Self::new(staff_id, Authority::Administrator)
    }

    /// Checks that the caller may read delegation state.
    ///
    /// Anyone may read their own grants.
    pub fn authorize_read(&self, target: Option<StaffId>) -> Result<()> {
        if self.authority.can_read_delegations() || target == Some(self.staff_id) {
            return Ok(());
        }
        Err(DelegationError::not_authorized(format!(
            "{:?} authority cannot read delegation state",
            self.authority
        )))
    }

    /// Checks that the caller may change `target`'s permissions.
    ///
    /// Requires manager authority, and a caller never changes its own grants.
    pub fn authorize_change(&self, target: StaffId) -> Result<()> {
        if !self.authority.can_manage_delegations() {
            return Err(DelegationError::not_authorized(format!(
                "{:?} authority cannot change permissions",
                self.authority
            )));
        }
        if target == self.staff_id {
            return Err(DelegationError::not_authorized(format!(
                "staff {target} cannot change its own permissions"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_ordering() {
        assert!(Authority::Staff < Authority::ManagerStaff);
        assert!(Authority::ManagerStaff < Authority::Manager);
        assert!(Authority::Manager < Authority::Administrator);
    }

    #[test]
    fn test_authority_rights() {
        assert!(!Authority::Staff.can_read_delegations());
        assert!(!Authority::Staff.can_manage_delegations());

        assert!(Authority::ManagerStaff.can_read_delegations());
        assert!(!Authority::ManagerStaff.can_manage_delegations());

        assert!(Authority::Manager.can_read_delegations());
        assert!(Authority::Manager.can_manage_delegations());

        assert!(Authority::Administrator.can_read_delegations());
        assert!(Authority::Administrator.can_manage_delegations());
    }

    #[test]
    fn test_staff_reads_only_own_grants() {
        let caller = Caller::new(StaffId::new(5), Authority::Staff);
        assert!(caller.authorize_read(Some(StaffId::new(5))).is_ok());
        assert!(caller.authorize_read(Some(StaffId::new(6))).is_err());
        assert!(caller.authorize_read(None).is_err());
    }

    #[test]
    fn test_manager_cannot_self_escalate() {
        let caller = Caller::manager(StaffId::new(1));
        assert!(caller.authorize_change(StaffId::new(2)).is_ok());

        match caller.authorize_change(StaffId::new(1)) {
            Err(DelegationError::NotAuthorized { reason }) => {
                assert!(reason.contains("own permissions"));
            }
            other => panic!("Expected NotAuthorized, got {other:?}"),
        }
    }

    #[test]
    fn test_manager_staff_cannot_change() {
        let caller = Caller::new(StaffId::new(1), Authority::ManagerStaff);
        assert!(matches!(
            caller.authorize_change(StaffId::new(2)),
            Err(DelegationError::NotAuthorized { .. })
        ));
    }
}
