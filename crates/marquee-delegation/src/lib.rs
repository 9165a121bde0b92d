//! # marquee-delegation: Staff Permission Delegation
//!
//! Lets partner managers delegate fine-grained permissions to manager staff:
//! - **Permission catalog** grouped by resource type
//! - **Staff × partner matrix** of granted permissions
//! - **Pending change sets** with tri-state (none / partial / full) display
//! - **Bulk apply** of staged grants and revokes with per-pair reporting
//! - **Exclusive steward** for the single-holder voucher category
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  DelegationService (Caller authorization)    │
//! └───────┬─────────────────────────┬───────────┘
//!         │                         │
//!         ▼                         ▼
//! ┌───────────────────────┐ ┌───────────────────────────┐
//! │  EditSession          │ │  ExclusivePermission-     │
//! │  ├─ partner selection │ │  Steward                  │
//! │  ├─ GrantTally        │ │  ├─ plan (transfer warn)  │
//! │  └─ PendingChangeSet  │ │  └─ revoke-then-grant     │
//! └───────┬───────────────┘ └─────────────┬─────────────┘
//!         │ BulkApplyExecutor             │
//!         ▼                               ▼
//! ┌───────────────────────┐ ┌───────────────────────────┐
//! │  PermissionMatrix     │ │  ExclusiveStore           │
//! │  (MatrixStore)        │ │  (single holder)          │
//! └───────────────────────┘ └───────────────────────────┘
//! ```
//!
//! ## Authority
//!
//! | Authority     | Read own | Read others | Grant / Revoke | Vouchers |
//! |---------------|----------|-------------|----------------|----------|
//! | Staff         | ✓        | ✗           | ✗              | ✗        |
//! | ManagerStaff  | ✓        | ✓           | ✗              | ✗        |
//! | Manager       | ✓        | ✓           | ✓              | ✓        |
//! | Administrator | ✓        | ✓           | ✓              | ✓        |
//!
//! Nobody changes their own permissions.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use marquee_delegation::{
//!     Caller, DelegationService, MemoryStore, PermissionCatalog, PermissionChangeRequest,
//! };
//! use marquee_types::{PartnerId, PermissionCode, StaffId};
//!
//! let store = Arc::new(MemoryStore::new());
//! store.register_staff(StaffId::new(1), "Morgan")?;
//! store.register_staff(StaffId::new(2), "Ada")?;
//! store.register_partner(PartnerId::new(10), "Lumiere")?;
//!
//! let service = DelegationService::new(store, PermissionCatalog::standard());
//! let manager = Caller::manager(StaffId::new(1));
//! service.assign_partner_to_staff(&manager, StaffId::new(2), PartnerId::new(10))?;
//!
//! let request = PermissionChangeRequest::new(
//!     [PartnerId::new(10)],
//!     [PermissionCode::from("CONTRACT_READ")],
//! );
//! let report = service.grant_permissions(&manager, StaffId::new(2), &request)?;
//! assert_eq!(report.applied, 1);
//! # Ok::<(), marquee_delegation::DelegationError>(())
//! ```

pub mod authority;
pub mod catalog;
pub mod error;
pub mod executor;
pub mod matrix;
pub mod memory;
pub mod pending;
pub mod service;
pub mod session;
pub mod steward;
pub mod store;

pub use authority::{Authority, Caller};
pub use catalog::{PermissionCatalog, ResourceGroup};
pub use error::{DelegationError, Result, StoreError, StoreResult};
pub use executor::{BulkApplyExecutor, CommitReport};
pub use matrix::{
    BulkReport, ChangeKind, PairFailure, PartnerPermissions, PermissionMatrix,
    StaffPartnerPermissionView,
};
pub use memory::{MemoryStore, StoreSnapshot};
pub use pending::{GrantStatus, GrantTally, PendingChangeSet};
pub use service::{DelegationService, PermissionChangeRequest, VoucherManager};
pub use session::EditSession;
pub use steward::{
    AssignOutcome, AssignmentPlan, ExclusivePermissionSteward, HolderState, RevokeOutcome,
};
pub use store::{Directory, ExclusiveStore, MatrixStore};
