//! Storage seams for delegation state.
//!
//! The delegation subsystem never owns persistent state. Backends implement
//! these traits and must apply each call atomically: a call either takes
//! effect completely or returns `Err` with no effect.

use std::collections::BTreeSet;
use std::fmt::Debug;

use marquee_types::{Grant, PartnerId, PartnerRecord, PermissionCode, StaffId, StaffRecord};

use crate::error::StoreResult;

/// Lookup of staff and partner records.
pub trait Directory: Send + Sync + Debug {
    fn staff(&self, staff: StaffId) -> StoreResult<Option<StaffRecord>>;

    fn partner(&self, partner: PartnerId) -> StoreResult<Option<PartnerRecord>>;
}

/// The staff × partner × permission matrix.
pub trait MatrixStore: Directory {
    /// Partners the staff member has an assignment relationship with.
    fn assigned_partners(&self, staff: StaffId) -> StoreResult<BTreeSet<PartnerId>>;

    /// Records an assignment relationship.
    ///
    /// Returns `Ok(false)` if it already existed.
    fn assign_partner(&self, staff: StaffId, partner: PartnerId) -> StoreResult<bool>;

    /// Permission codes the staff member holds on the partner.
    fn held_codes(&self, staff: StaffId, partner: PartnerId) -> StoreResult<BTreeSet<PermissionCode>>;

    /// Inserts one grant.
    ///
    /// Returns `Ok(false)` if the grant was already present. Fails with
    /// [`StoreError::NotAssigned`](crate::StoreError::NotAssigned) when the
    /// staff member does not manage the partner.
    fn insert_grant(&self, grant: &Grant) -> StoreResult<bool>;

    /// Removes one grant.
    ///
    /// Returns `Ok(false)` if the grant was not present.
    fn remove_grant(&self, grant: &Grant) -> StoreResult<bool>;
}

/// The single-holder record for the exclusive permission category.
///
/// Implementations must guard the holder with a transactional write so that
/// two concurrent grants cannot both succeed.
pub trait ExclusiveStore: Directory {
    /// The staff member currently recorded as holder.
    fn exclusive_holder(&self) -> StoreResult<Option<StaffId>>;

    /// Exclusive codes held by the staff member.
    fn exclusive_codes(&self, staff: StaffId) -> StoreResult<BTreeSet<PermissionCode>>;

    /// Grants `codes` to `staff` and records it as holder.
    ///
    /// Fails with [`StoreError::HolderConflict`](crate::StoreError::HolderConflict)
    /// if a different staff member is recorded as holder.
    fn grant_exclusive(&self, staff: StaffId, codes: &[PermissionCode]) -> StoreResult<()>;

    /// Revokes `codes` from `staff` and clears the holder if it was `staff`.
    fn revoke_exclusive(&self, staff: StaffId, codes: &[PermissionCode]) -> StoreResult<()>;
}
