//! Error types for permission delegation.
//!
//! [`StoreError`] is what a storage backend reports for a single request.
//! [`DelegationError`] is the taxonomy surfaced to callers of the
//! delegation subsystem.

use marquee_types::{PartnerId, PermissionCode, ResourceType, StaffId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matrix::BulkReport;
use crate::steward::HolderState;

/// Failure of a single store request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StoreError {
    /// The staff account is not known to the directory.
    #[error("staff {staff} is not registered")]
    UnknownStaff { staff: StaffId },

    /// The partner is not known to the directory.
    #[error("partner {partner} is not registered")]
    UnknownPartner { partner: PartnerId },

    /// The staff member has no assignment relationship with the partner.
    #[error("staff {staff} is not assigned to partner {partner}")]
    NotAssigned { staff: StaffId, partner: PartnerId },

    /// The exclusive category is recorded for a different staff member.
    #[error("exclusive permission category is already held by staff {holder}")]
    HolderConflict { holder: StaffId },

    /// The backend could not serve the request.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// A lock guarding shared state was poisoned by a panicking writer.
    #[error("store lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// Snapshot (de)serialization or file I/O failed.
    #[error("snapshot error: {reason}")]
    Snapshot { reason: String },
}

/// Result type for store requests.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the delegation subsystem.
#[derive(Debug, Error)]
pub enum DelegationError {
    /// A commit or bulk change was attempted without any partner.
    #[error("validation failed: no partner selected")]
    NoPartnerSelected,

    /// A commit was attempted with nothing staged.
    #[error("validation failed: the change set is empty")]
    EmptyChangeSet,

    /// The permission code is not in the catalog.
    #[error("validation failed: unknown permission code {code}")]
    UnknownPermission { code: PermissionCode },

    /// The permission belongs to the single-holder category and can only be
    /// assigned through the exclusive steward.
    #[error(
        "validation failed: {code} belongs to the exclusive {resource_type} category and cannot be delegated per partner"
    )]
    ExclusivePermission {
        code: PermissionCode,
        resource_type: ResourceType,
    },

    /// The caller lacks rights for the operation.
    #[error("not authorized: {reason}")]
    NotAuthorized { reason: String },

    /// Some `(partner, permission)` pairs failed.
    #[error(
        "partial failure: {} of {} changes failed",
        .report.failed_count(),
        .report.attempted_count()
    )]
    PartialFailure { report: BulkReport },

    /// The previous holder was revoked but the new holder could not be
    /// granted. `holder` is the state observed after the failure: unassigned,
    /// or held by whoever won a concurrent assignment.
    #[error(
        "transfer from staff {previous} to staff {attempted} was interrupted, the exclusive category is now {holder}: {source}"
    )]
    TransferConflict {
        previous: StaffId,
        attempted: StaffId,
        holder: HolderState,
        source: StoreError,
    },

    /// The holder changed between planning and committing an assignment.
    #[error("exclusive holder changed since the assignment was planned (expected {expected:?}, found {actual:?})")]
    HolderChanged {
        expected: Option<StaffId>,
        actual: Option<StaffId>,
    },

    /// A store request failed outright.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DelegationError {
    /// Returns whether the error was raised before any store call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DelegationError::NoPartnerSelected
                | DelegationError::EmptyChangeSet
                | DelegationError::UnknownPermission { .. }
                | DelegationError::ExclusivePermission { .. }
        )
    }

    pub(crate) fn not_authorized(reason: impl Into<String>) -> Self {
        DelegationError::NotAuthorized {
            reason: reason.into(),
        }
    }
}

/// Result type for delegation operations.
pub type Result<T> = std::result::Result<T, DelegationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(DelegationError::NoPartnerSelected.is_validation());
        assert!(DelegationError::EmptyChangeSet.is_validation());
        assert!(
            DelegationError::UnknownPermission {
                code: PermissionCode::from("NOPE")
            }
            .is_validation()
        );
        assert!(!DelegationError::not_authorized("no").is_validation());
        assert!(
            !DelegationError::Store(StoreError::Unavailable {
                reason: "down".to_string()
            })
            .is_validation()
        );
    }

    #[test]
    fn test_transfer_conflict_message_names_both_parties() {
        let err = DelegationError::TransferConflict {
            previous: StaffId::new(1),
            attempted: StaffId::new(2),
            holder: HolderState::Unassigned,
            source: StoreError::Unavailable {
                reason: "timeout".to_string(),
            },
        };
        let message = err.to_string();
        assert!(message.contains("staff 1"));
        assert!(message.contains("staff 2"));
        assert!(message.contains("now unassigned"));
        assert!(message.contains("timeout"));
    }

    #[test]
    fn test_transfer_conflict_message_names_concurrent_holder() {
        let err = DelegationError::TransferConflict {
            previous: StaffId::new(1),
            attempted: StaffId::new(2),
            holder: HolderState::AssignedTo(StaffId::new(3)),
            source: StoreError::HolderConflict {
                holder: StaffId::new(3),
            },
        };
        let message = err.to_string();
        assert!(message.contains("now assigned to staff 3"));
        assert!(!message.contains("unassigned"));
    }

    #[test]
    fn test_store_error_serializes_with_kind_tag() {
        let err = StoreError::NotAssigned {
            staff: StaffId::new(4),
            partner: PartnerId::new(9),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "notAssigned");
        assert_eq!(json["partner"], 9);
    }
}
