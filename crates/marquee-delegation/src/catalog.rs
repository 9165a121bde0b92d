//! Permission catalog.
//!
//! The catalog is configuration, not transactional state: it is built once
//! at startup and shared read-only afterwards.

use std::collections::BTreeMap;

use marquee_config::{CatalogConfig, DelegationConfig};
use marquee_types::{ActionType, PermissionCode, PermissionDefinition, ResourceType};
use serde::{Deserialize, Serialize};

use crate::error::{DelegationError, Result};

/// All permissions of one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub permissions: Vec<PermissionDefinition>,
}

impl ResourceGroup {
    /// Returns the permission codes of this group in catalog order.
    pub fn codes(&self) -> Vec<PermissionCode> {
        self.permissions
            .iter()
            .map(|p| p.permission_code.clone())
            .collect()
    }
}

/// Registry of permission definitions grouped by resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCatalog {
    /// Definitions in registration order.
    definitions: Vec<PermissionDefinition>,
    /// Code → position in `definitions`.
    index: BTreeMap<PermissionCode, usize>,
    /// Resource type of the single-holder category.
    exclusive: ResourceType,
}

impl PermissionCatalog {
    /// Creates a catalog from definitions.
    ///
    /// A later definition with an already registered code replaces the
    /// earlier one in place.
    pub fn new(
        definitions: impl IntoIterator<Item = PermissionDefinition>,
        exclusive: ResourceType,
    ) -> Self {
        let mut catalog = Self {
            definitions: Vec::new(),
            index: BTreeMap::new(),
            exclusive,
        };
        for def in definitions {
            catalog.register(def);
        }
        catalog
    }

    /// Creates the built-in cinema catalog with voucher as the exclusive
    /// category.
    pub fn standard() -> Self {
        Self::new(standard_definitions(), ResourceType::Voucher)
    }

    /// Builds the catalog described by configuration.
    pub fn from_config(catalog: &CatalogConfig, delegation: &DelegationConfig) -> Self {
        let base = if catalog.include_standard {
            standard_definitions()
        } else {
            Vec::new()
        };
        Self::new(
            base.into_iter().chain(catalog.permissions.iter().cloned()),
            delegation.exclusive_resource_type.clone(),
        )
    }

    fn register(&mut self, def: PermissionDefinition) {
        if let Some(&pos) = self.index.get(&def.permission_code) {
            self.definitions[pos] = def;
        } else {
            self.index
                .insert(def.permission_code.clone(), self.definitions.len());
            self.definitions.push(def);
        }
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn get(&self, code: &PermissionCode) -> Option<&PermissionDefinition> {
        self.index.get(code).map(|&pos| &self.definitions[pos])
    }

    pub fn contains(&self, code: &PermissionCode) -> bool {
        self.index.contains_key(code)
    }

    pub fn definitions(&self) -> &[PermissionDefinition] {
        &self.definitions
    }

    /// Resource type of the single-holder category.
    pub fn exclusive_resource_type(&self) -> &ResourceType {
        &self.exclusive
    }

    /// Returns whether `code` belongs to the single-holder category.
    pub fn is_exclusive(&self, code: &PermissionCode) -> bool {
        self.get(code)
            .is_some_and(|def| def.resource_type == self.exclusive)
    }

    /// Codes of the single-holder category in catalog order.
    pub fn exclusive_codes(&self) -> Vec<PermissionCode> {
        self.codes_in_group(&self.exclusive)
    }

    /// Codes of one resource type in catalog order.
    pub fn codes_in_group(&self, resource_type: &ResourceType) -> Vec<PermissionCode> {
        self.definitions
            .iter()
            .filter(|def| &def.resource_type == resource_type)
            .map(|def| def.permission_code.clone())
            .collect()
    }

    /// Every resource group, ordered by first appearance in the catalog.
    pub fn groups(&self) -> Vec<ResourceGroup> {
        let mut groups: Vec<ResourceGroup> = Vec::new();
        for def in &self.definitions {
            match groups
                .iter_mut()
                .find(|g| g.resource_type == def.resource_type)
            {
                Some(group) => group.permissions.push(def.clone()),
                None => groups.push(ResourceGroup {
                    resource_type: def.resource_type.clone(),
                    resource_name: def.resource_type.display_name(),
                    permissions: vec![def.clone()],
                }),
            }
        }
        groups
    }

    /// Groups eligible for per-partner delegation.
    ///
    /// The exclusive category is left out; it is only reachable through the
    /// exclusive steward.
    pub fn delegable_groups(&self) -> Vec<ResourceGroup> {
        self.groups()
            .into_iter()
            .filter(|g| g.resource_type != self.exclusive)
            .collect()
    }

    /// Looks up a delegable group by resource type.
    pub fn delegable_group(&self, resource_type: &ResourceType) -> Option<ResourceGroup> {
        self.delegable_groups()
            .into_iter()
            .find(|g| &g.resource_type == resource_type)
    }

    /// Definitions for `codes`, in catalog order. Unknown codes are skipped.
    pub fn definitions_for<'a>(
        &self,
        codes: impl IntoIterator<Item = &'a PermissionCode>,
    ) -> Vec<PermissionDefinition> {
        let mut positions: Vec<usize> = codes
            .into_iter()
            .filter_map(|code| self.index.get(code).copied())
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
            .into_iter()
            .map(|pos| self.definitions[pos].clone())
            .collect()
    }

    /// Checks that every code exists and may go through per-partner
    /// delegation.
    pub fn check_delegable<'a>(
        &self,
        codes: impl IntoIterator<Item = &'a PermissionCode>,
    ) -> Result<()> {
        for code in codes {
            let def = self
                .get(code)
                .ok_or_else(|| DelegationError::UnknownPermission { code: code.clone() })?;
            if def.resource_type == self.exclusive {
                return Err(DelegationError::ExclusivePermission {
                    code: code.clone(),
                    resource_type: self.exclusive.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for PermissionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// The built-in cinema permission set.
pub fn standard_definitions() -> Vec<PermissionDefinition> {
    use ActionType::{Approve, Create, Delete, Read, Update};
    use ResourceType::{Booking, Contract, Movie, Partner, Voucher};

    vec![
        PermissionDefinition::new("CONTRACT_READ", "View contracts", Contract, Read)
            .with_description("View partner contracts and their documents"),
        PermissionDefinition::new("CONTRACT_CREATE", "Create contracts", Contract, Create)
            .with_description("Draft new contracts for a partner"),
        PermissionDefinition::new("CONTRACT_UPDATE", "Edit contracts", Contract, Update)
            .with_description("Amend contract terms before approval"),
        PermissionDefinition::new("CONTRACT_APPROVE", "Approve contracts", Contract, Approve)
            .with_description("Approve or reject submitted contracts"),
        PermissionDefinition::new("PARTNER_READ", "View partner profile", Partner, Read)
            .with_description("View partner registration details"),
        PermissionDefinition::new("PARTNER_UPDATE", "Edit partner profile", Partner, Update)
            .with_description("Edit partner registration details"),
        PermissionDefinition::new("MOVIE_READ", "View movies", Movie, Read)
            .with_description("View movies supplied to the partner"),
        PermissionDefinition::new("MOVIE_CREATE", "Register movies", Movie, Create)
            .with_description("Register new movies for the partner"),
        PermissionDefinition::new("MOVIE_UPDATE", "Edit movies", Movie, Update)
            .with_description("Edit movie metadata and screening windows"),
        PermissionDefinition::new("BOOKING_READ", "View bookings", Booking, Read)
            .with_description("View customer bookings at partner cinemas"),
        PermissionDefinition::new("BOOKING_UPDATE", "Manage bookings", Booking, Update)
            .with_description("Change or cancel customer bookings"),
        PermissionDefinition::new("VOUCHER_READ", "View vouchers", Voucher, Read)
            .with_description("View issued vouchers"),
        PermissionDefinition::new("VOUCHER_CREATE", "Issue vouchers", Voucher, Create)
            .with_description("Issue new voucher batches"),
        PermissionDefinition::new("VOUCHER_UPDATE", "Edit vouchers", Voucher, Update)
            .with_description("Edit voucher validity and value"),
        PermissionDefinition::new("VOUCHER_DELETE", "Void vouchers", Voucher, Delete)
            .with_description("Void issued vouchers"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_groups() {
        let catalog = PermissionCatalog::standard();
        let groups = catalog.groups();

        let kinds: Vec<&ResourceType> = groups.iter().map(|g| &g.resource_type).collect();
        assert_eq!(
            kinds,
            vec![
                &ResourceType::Contract,
                &ResourceType::Partner,
                &ResourceType::Movie,
                &ResourceType::Booking,
                &ResourceType::Voucher,
            ]
        );
        assert_eq!(groups[0].resource_name, "Contract management");
        assert_eq!(groups[0].permissions.len(), 4);
    }

    #[test]
    fn test_delegable_groups_exclude_voucher() {
        let catalog = PermissionCatalog::standard();
        let groups = catalog.delegable_groups();

        assert_eq!(groups.len(), 4);
        assert!(
            groups
                .iter()
                .all(|g| g.resource_type != ResourceType::Voucher)
        );
        assert!(catalog.delegable_group(&ResourceType::Voucher).is_none());
        assert!(catalog.delegable_group(&ResourceType::Contract).is_some());
    }

    #[test]
    fn test_exclusive_codes() {
        let catalog = PermissionCatalog::standard();
        let codes = catalog.exclusive_codes();

        assert_eq!(codes.len(), 4);
        assert!(catalog.is_exclusive(&PermissionCode::from("VOUCHER_CREATE")));
        assert!(!catalog.is_exclusive(&PermissionCode::from("CONTRACT_READ")));
        assert!(!catalog.is_exclusive(&PermissionCode::from("UNKNOWN")));
    }

    #[test]
    fn test_check_delegable() {
        let catalog = PermissionCatalog::standard();

        assert!(
            catalog
                .check_delegable(&[PermissionCode::from("CONTRACT_READ")])
                .is_ok()
        );

        match catalog.check_delegable(&[PermissionCode::from("VOUCHER_READ")]) {
            Err(DelegationError::ExclusivePermission { code, .. }) => {
                assert_eq!(code.as_str(), "VOUCHER_READ");
            }
            other => panic!("Expected ExclusivePermission, got {other:?}"),
        }

        assert!(matches!(
            catalog.check_delegable(&[PermissionCode::from("POPCORN_EAT")]),
            Err(DelegationError::UnknownPermission { .. })
        ));
    }

    #[test]
    fn test_later_definition_replaces_earlier() {
        let replacement = PermissionDefinition::new(
            "CONTRACT_READ",
            "Read contracts",
            ResourceType::Contract,
            ActionType::Read,
        );
        let catalog = PermissionCatalog::new(
            standard_definitions().into_iter().chain([replacement]),
            ResourceType::Voucher,
        );

        assert_eq!(catalog.len(), standard_definitions().len());
        let def = catalog.get(&PermissionCode::from("CONTRACT_READ")).unwrap();
        assert_eq!(def.permission_name, "Read contracts");
        // Position is kept
        assert_eq!(
            catalog.definitions()[0].permission_code.as_str(),
            "CONTRACT_READ"
        );
    }

    #[test]
    fn test_from_config_appends_custom_permissions() {
        let catalog_config = CatalogConfig {
            include_standard: false,
            permissions: vec![
                PermissionDefinition::new(
                    "LOYALTY_READ",
                    "View loyalty",
                    ResourceType::custom("loyalty"),
                    ActionType::Read,
                ),
                PermissionDefinition::new(
                    "GIFT_CARD_ISSUE",
                    "Issue gift cards",
                    ResourceType::custom("gift_card"),
                    ActionType::Create,
                ),
            ],
        };
        let delegation = DelegationConfig {
            exclusive_resource_type: ResourceType::custom("gift_card"),
            audit_enabled: false,
        };

        let catalog = PermissionCatalog::from_config(&catalog_config, &delegation);
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.exclusive_codes(),
            vec![PermissionCode::from("GIFT_CARD_ISSUE")]
        );
        assert_eq!(catalog.delegable_groups().len(), 1);
    }

    #[test]
    fn test_definitions_for_uses_catalog_order() {
        let catalog = PermissionCatalog::standard();
        let codes = [
            PermissionCode::from("MOVIE_READ"),
            PermissionCode::from("CONTRACT_READ"),
            PermissionCode::from("MOVIE_READ"),
            PermissionCode::from("GHOST"),
        ];
        let defs = catalog.definitions_for(codes.iter());
        let names: Vec<&str> = defs.iter().map(|d| d.permission_code.as_str()).collect();
        assert_eq!(names, vec!["CONTRACT_READ", "MOVIE_READ"]);
    }
}
