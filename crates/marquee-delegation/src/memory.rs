//! In-memory store backend.
//!
//! [`MemoryStore`] implements every storage seam behind a single `RwLock`,
//! so each trait call is applied atomically. State can be exported as a
//! [`StoreSnapshot`] and persisted as JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use marquee_types::{Grant, PartnerId, PartnerRecord, PermissionCode, StaffId, StaffRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{Directory, ExclusiveStore, MatrixStore};

/// Serializable image of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub staff: Vec<StaffRecord>,
    pub partners: Vec<PartnerRecord>,
    pub assignments: Vec<Assignment>,
    pub grants: Vec<Grant>,
    pub exclusive_holder: Option<StaffId>,
    pub exclusive_grants: Vec<ExclusiveGrant>,
}

/// A staff → partner assignment relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub staff_id: StaffId,
    pub partner_id: PartnerId,
}

/// One exclusive-category code held by a staff member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusiveGrant {
    pub staff_id: StaffId,
    pub permission_code: PermissionCode,
}

#[derive(Debug, Default)]
struct StoreState {
    staff: BTreeMap<StaffId, StaffRecord>,
    partners: BTreeMap<PartnerId, PartnerRecord>,
    assignments: BTreeSet<(StaffId, PartnerId)>,
    grants: BTreeSet<Grant>,
    exclusive_holder: Option<StaffId>,
    exclusive_grants: BTreeMap<StaffId, BTreeSet<PermissionCode>>,
}

impl StoreState {
    fn require_staff(&self, staff: StaffId) -> StoreResult<()> {
        if self.staff.contains_key(&staff) {
            Ok(())
        } else {
            Err(StoreError::UnknownStaff { staff })
        }
    }

    fn require_partner(&self, partner: PartnerId) -> StoreResult<()> {
        if self.partners.contains_key(&partner) {
            Ok(())
        } else {
            Err(StoreError::UnknownPartner { partner })
        }
    }
}

/// Thread-safe in-memory implementation of [`MatrixStore`] and
/// [`ExclusiveStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreState>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_inner(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned {
            context: "memory store".into(),
        })
    }

    fn write_inner(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned {
            context: "memory store".into(),
        })
    }

    /// Registers or renames a staff account.
    pub fn register_staff(&self, id: StaffId, name: impl Into<String>) -> StoreResult<()> {
        let mut inner = self.write_inner()?;
        inner.staff.insert(id, StaffRecord::new(id, name));
        Ok(())
    }

    /// Registers or renames a partner.
    pub fn register_partner(&self, id: PartnerId, name: impl Into<String>) -> StoreResult<()> {
        let mut inner = self.write_inner()?;
        inner.partners.insert(id, PartnerRecord::new(id, name));
        Ok(())
    }

    /// All registered staff, ordered by id.
    pub fn list_staff(&self) -> StoreResult<Vec<StaffRecord>> {
        Ok(self.read_inner()?.staff.values().cloned().collect())
    }

    /// All registered partners, ordered by id.
    pub fn list_partners(&self) -> StoreResult<Vec<PartnerRecord>> {
        Ok(self.read_inner()?.partners.values().cloned().collect())
    }

    /// Number of staff members holding any exclusive code.
    pub fn exclusive_holder_count(&self) -> StoreResult<usize> {
        Ok(self
            .read_inner()?
            .exclusive_grants
            .values()
            .filter(|codes| !codes.is_empty())
            .count())
    }

    /// Exports the current state.
    pub fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let inner = self.read_inner()?;
        Ok(StoreSnapshot {
            staff: inner.staff.values().cloned().collect(),
            partners: inner.partners.values().cloned().collect(),
            assignments: inner
                .assignments
                .iter()
                .map(|&(staff_id, partner_id)| Assignment {
                    staff_id,
                    partner_id,
                })
                .collect(),
            grants: inner.grants.iter().cloned().collect(),
            exclusive_holder: inner.exclusive_holder,
            exclusive_grants: inner
                .exclusive_grants
                .iter()
                .flat_map(|(&staff_id, codes)| {
                    codes.iter().map(move |code| ExclusiveGrant {
                        staff_id,
                        permission_code: code.clone(),
                    })
                })
                .collect(),
        })
    }

    /// Rebuilds a store from a snapshot.
    ///
    /// Rejects snapshots in which exclusive codes are held by anyone other
    /// than the recorded holder.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        let mut state = StoreState::default();

        for record in snapshot.staff {
            state.staff.insert(record.id, record);
        }
        for record in snapshot.partners {
            state.partners.insert(record.id, record);
        }
        for assignment in snapshot.assignments {
            state
                .assignments
                .insert((assignment.staff_id, assignment.partner_id));
        }
        state.grants.extend(snapshot.grants);

        for grant in snapshot.exclusive_grants {
            if snapshot.exclusive_holder != Some(grant.staff_id) {
                return Err(StoreError::Snapshot {
                    reason: format!(
                        "staff {} holds exclusive code {} but is not the recorded holder",
                        grant.staff_id, grant.permission_code
                    ),
                });
            }
            state
                .exclusive_grants
                .entry(grant.staff_id)
                .or_default()
                .insert(grant.permission_code);
        }
        state.exclusive_holder = snapshot.exclusive_holder;

        Ok(Self {
            inner: RwLock::new(state),
        })
    }

    /// Loads a JSON snapshot file. A missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No snapshot file, starting empty");
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|e| StoreError::Snapshot {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        let snapshot: StoreSnapshot =
            serde_json::from_str(&content).map_err(|e| StoreError::Snapshot {
                reason: format!("failed to parse {}: {e}", path.display()),
            })?;

        Self::from_snapshot(snapshot)
    }

    /// Writes the current state as a JSON snapshot file.
    ///
    /// The file is written next to its destination and renamed into place.
    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| StoreError::Snapshot {
            reason: format!("failed to serialize snapshot: {e}"),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Snapshot {
                reason: format!("failed to create {}: {e}", parent.display()),
            })?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::Snapshot {
            reason: format!("failed to write {}: {e}", tmp.display()),
        })?;
        fs::rename(&tmp, path).map_err(|e| StoreError::Snapshot {
            reason: format!("failed to move snapshot into {}: {e}", path.display()),
        })?;

        debug!(path = %path.display(), "Snapshot saved");
        Ok(())
    }
}

impl Directory for MemoryStore {
    fn staff(&self, staff: StaffId) -> StoreResult<Option<StaffRecord>> {
        Ok(self.read_inner()?.staff.get(&staff).cloned())
    }

    fn partner(&self, partner: PartnerId) -> StoreResult<Option<PartnerRecord>> {
        Ok(self.read_inner()?.partners.get(&partner).cloned())
    }
}

impl MatrixStore for MemoryStore {
    fn assigned_partners(&self, staff: StaffId) -> StoreResult<BTreeSet<PartnerId>> {
        let inner = self.read_inner()?;
        Ok(inner
            .assignments
            .range((staff, PartnerId::new(0))..=(staff, PartnerId::new(u64::MAX)))
            .map(|&(_, partner)| partner)
            .collect())
    }

    fn assign_partner(&self, staff: StaffId, partner: PartnerId) -> StoreResult<bool> {
        let mut inner = self.write_inner()?;
        inner.require_staff(staff)?;
        inner.require_partner(partner)?;
        Ok(inner.assignments.insert((staff, partner)))
    }

    fn held_codes(&self, staff: StaffId, partner: PartnerId) -> StoreResult<BTreeSet<PermissionCode>> {
        let inner = self.read_inner()?;
        Ok(inner
            .grants
            .iter()
            .filter(|g| g.staff_id == staff && g.partner_id == partner)
            .map(|g| g.permission_code.clone())
            .collect())
    }

    fn insert_grant(&self, grant: &Grant) -> StoreResult<bool> {
        let mut inner = self.write_inner()?;
        inner.require_staff(grant.staff_id)?;
        inner.require_partner(grant.partner_id)?;
        if !inner
            .assignments
            .contains(&(grant.staff_id, grant.partner_id))
        {
            return Err(StoreError::NotAssigned {
                staff: grant.staff_id,
                partner: grant.partner_id,
            });
        }
        Ok(inner.grants.insert(grant.clone()))
    }

    fn remove_grant(&self, grant: &Grant) -> StoreResult<bool> {
        let mut inner = self.write_inner()?;
        Ok(inner.grants.remove(grant))
    }
}

impl ExclusiveStore for MemoryStore {
    fn exclusive_holder(&self) -> StoreResult<Option<StaffId>> {
        Ok(self.read_inner()?.exclusive_holder)
    }

    fn exclusive_codes(&self, staff: StaffId) -> StoreResult<BTreeSet<PermissionCode>> {
        Ok(self
            .read_inner()?
            .exclusive_grants
            .get(&staff)
            .cloned()
            .unwrap_or_default())
    }

    fn grant_exclusive(&self, staff: StaffId, codes: &[PermissionCode]) -> StoreResult<()> {
        let mut inner = self.write_inner()?;
        inner.require_staff(staff)?;
        if let Some(holder) = inner.exclusive_holder {
            if holder != staff {
                return Err(StoreError::HolderConflict { holder });
            }
        }
        inner.exclusive_holder = Some(staff);
        inner
            .exclusive_grants
            .entry(staff)
            .or_default()
            .extend(codes.iter().cloned());
        Ok(())
    }

    fn revoke_exclusive(&self, staff: StaffId, codes: &[PermissionCode]) -> StoreResult<()> {
        let mut inner = self.write_inner()?;
        if let Some(held) = inner.exclusive_grants.get_mut(&staff) {
            for code in codes {
                held.remove(code);
            }
            if held.is_empty() {
                inner.exclusive_grants.remove(&staff);
            }
        }
        if inner.exclusive_holder == Some(staff) {
            inner.exclusive_holder = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.register_staff(StaffId::new(1), "Ada").unwrap();
        store.register_staff(StaffId::new(2), "Ben").unwrap();
        store.register_partner(PartnerId::new(10), "Lumiere Cinemas").unwrap();
        store.register_partner(PartnerId::new(20), "Odeon North").unwrap();
        store
            .assign_partner(StaffId::new(1), PartnerId::new(10))
            .unwrap();
        store
    }

    fn grant(staff: u64, partner: u64, code: &str) -> Grant {
        Grant::new(
            StaffId::new(staff),
            PartnerId::new(partner),
            PermissionCode::from(code),
        )
    }

    #[test]
    fn test_insert_and_remove_are_idempotent() {
        let store = seeded();

        assert!(store.insert_grant(&grant(1, 10, "CONTRACT_READ")).unwrap());
        assert!(!store.insert_grant(&grant(1, 10, "CONTRACT_READ")).unwrap());

        assert!(store.remove_grant(&grant(1, 10, "CONTRACT_READ")).unwrap());
        assert!(!store.remove_grant(&grant(1, 10, "CONTRACT_READ")).unwrap());
    }

    #[test]
    fn test_insert_requires_assignment() {
        let store = seeded();

        let result = store.insert_grant(&grant(1, 20, "CONTRACT_READ"));
        assert_eq!(
            result,
            Err(StoreError::NotAssigned {
                staff: StaffId::new(1),
                partner: PartnerId::new(20),
            })
        );

        let result = store.insert_grant(&grant(9, 10, "CONTRACT_READ"));
        assert_eq!(
            result,
            Err(StoreError::UnknownStaff {
                staff: StaffId::new(9)
            })
        );
    }

    #[test]
    fn test_assigned_partners_are_scoped_to_staff() {
        let store = seeded();
        store
            .assign_partner(StaffId::new(2), PartnerId::new(20))
            .unwrap();

        let partners = store.assigned_partners(StaffId::new(1)).unwrap();
        assert_eq!(partners.into_iter().collect::<Vec<_>>(), vec![PartnerId::new(10)]);

        assert!(
            !store
                .assign_partner(StaffId::new(2), PartnerId::new(20))
                .unwrap()
        );
    }

    #[test]
    fn test_exclusive_holder_guard() {
        let store = seeded();
        let codes = vec![PermissionCode::from("VOUCHER_READ")];

        store.grant_exclusive(StaffId::new(1), &codes).unwrap();
        assert_eq!(store.exclusive_holder().unwrap(), Some(StaffId::new(1)));

        let result = store.grant_exclusive(StaffId::new(2), &codes);
        assert_eq!(
            result,
            Err(StoreError::HolderConflict {
                holder: StaffId::new(1)
            })
        );

        store.revoke_exclusive(StaffId::new(1), &codes).unwrap();
        assert_eq!(store.exclusive_holder().unwrap(), None);
        assert!(store.exclusive_codes(StaffId::new(1)).unwrap().is_empty());

        store.grant_exclusive(StaffId::new(2), &codes).unwrap();
        assert_eq!(store.exclusive_holder().unwrap(), Some(StaffId::new(2)));
        assert_eq!(store.exclusive_holder_count().unwrap(), 1);
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let store = seeded();
        store.insert_grant(&grant(1, 10, "CONTRACT_READ")).unwrap();
        store
            .grant_exclusive(StaffId::new(2), &[PermissionCode::from("VOUCHER_READ")])
            .unwrap();

        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested/state.json");
        store.save(&path).unwrap();

        let restored = MemoryStore::load(&path).unwrap();
        assert_eq!(restored.snapshot().unwrap(), store.snapshot().unwrap());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let store = MemoryStore::load(temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(store.snapshot().unwrap(), StoreSnapshot::default());
    }

    #[test]
    fn test_snapshot_with_second_holder_is_rejected() {
        let snapshot = StoreSnapshot {
            staff: vec![
                StaffRecord::new(StaffId::new(1), "Ada"),
                StaffRecord::new(StaffId::new(2), "Ben"),
            ],
            exclusive_holder: Some(StaffId::new(1)),
            exclusive_grants: vec![
                ExclusiveGrant {
                    staff_id: StaffId::new(1),
                    permission_code: PermissionCode::from("VOUCHER_READ"),
                },
                ExclusiveGrant {
                    staff_id: StaffId::new(2),
                    permission_code: PermissionCode::from("VOUCHER_READ"),
                },
            ],
            ..Default::default()
        };

        assert!(matches!(
            MemoryStore::from_snapshot(snapshot),
            Err(StoreError::Snapshot { .. })
        ));
    }
}
