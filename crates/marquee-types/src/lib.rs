//! # marquee-types: Core types for `Marquee`
//!
//! This crate contains shared types used across the `Marquee` manager console:
//! - Entity IDs ([`StaffId`], [`PartnerId`])
//! - Directory records ([`StaffRecord`], [`PartnerRecord`])
//! - Permission identity ([`PermissionCode`], [`ResourceType`], [`ActionType`])
//! - Catalog entries ([`PermissionDefinition`])
//! - Persisted delegation facts ([`Grant`])

use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

// ============================================================================
// Entity IDs - All Copy (cheap 8-byte values)
// ============================================================================

/// Unique identifier for a staff account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StaffId(u64);

impl StaffId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for StaffId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StaffId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<StaffId> for u64 {
    fn from(id: StaffId) -> Self {
        id.0
    }
}

/// Unique identifier for a partner (a cinema chain business entity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartnerId(u64);

impl PartnerId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for PartnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PartnerId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<PartnerId> for u64 {
    fn from(id: PartnerId) -> Self {
        id.0
    }
}

// ============================================================================
// Directory Records - Clone (contain names)
// ============================================================================

/// A staff account as known to the console directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: StaffId,
    pub name: String,
}

impl StaffRecord {
    pub fn new(id: StaffId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A partner as known to the console directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartnerRecord {
    pub id: PartnerId,
    pub name: String,
}

impl PartnerRecord {
    pub fn new(id: PartnerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

// ============================================================================
// Permission Code - Clone (contains String)
// ============================================================================

/// Stable string identifier for one fine-grained capability.
///
/// Codes are conventionally `RESOURCE_ACTION`, e.g. `CONTRACT_READ`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionCode(String);

impl PermissionCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PermissionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PermissionCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl From<&str> for PermissionCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.0
    }
}

// ============================================================================
// Resource Type - Clone (Custom contains String)
// ============================================================================

/// Grouping category a permission belongs to.
///
/// The voucher category is special: it is system-wide and may be held by at
/// most one staff member at a time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    /// Partner contracts (screening agreements, revenue share).
    Contract,
    /// Partner profile and registration data.
    Partner,
    /// Movie catalog entries supplied to partners.
    Movie,
    /// Customer bookings at partner cinemas.
    Booking,
    /// Voucher issuance and redemption (system-wide).
    Voucher,
    /// Resource type introduced by configuration.
    Custom(String),
}

impl ResourceType {
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into().to_ascii_uppercase())
    }

    /// Human-readable name used as the resource group title.
    pub fn display_name(&self) -> String {
        match self {
            ResourceType::Contract => "Contract management".to_string(),
            ResourceType::Partner => "Partner management".to_string(),
            ResourceType::Movie => "Movie management".to_string(),
            ResourceType::Booking => "Booking management".to_string(),
            ResourceType::Voucher => "Voucher management".to_string(),
            ResourceType::Custom(name) => {
                let mut chars = name.chars();
                let title: String = match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                };
                format!("{} management", title.replace('_', " "))
            }
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Contract => write!(f, "CONTRACT"),
            ResourceType::Partner => write!(f, "PARTNER"),
            ResourceType::Movie => write!(f, "MOVIE"),
            ResourceType::Booking => write!(f, "BOOKING"),
            ResourceType::Voucher => write!(f, "VOUCHER"),
            ResourceType::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl FromStr for ResourceType {
    type Err = std::convert::Infallible;

    /// Parses a resource type name case-insensitively.
    ///
    /// Unknown names become [`ResourceType::Custom`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Ok(match upper.as_str() {
            "CONTRACT" => ResourceType::Contract,
            "PARTNER" => ResourceType::Partner,
            "MOVIE" => ResourceType::Movie,
            "BOOKING" => ResourceType::Booking,
            "VOUCHER" => ResourceType::Voucher,
            _ => ResourceType::Custom(upper),
        })
    }
}

// ============================================================================
// Action Type - Copy (simple enum, no heap data)
// ============================================================================

/// The kind of operation a permission allows on its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Read,
    Create,
    Update,
    Delete,
    Approve,
    Manage,
}

impl Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionType::Read => "READ",
            ActionType::Create => "CREATE",
            ActionType::Update => "UPDATE",
            ActionType::Delete => "DELETE",
            ActionType::Approve => "APPROVE",
            ActionType::Manage => "MANAGE",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ActionType {
    type Err = ParseActionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "READ" => Ok(ActionType::Read),
            "CREATE" => Ok(ActionType::Create),
            "UPDATE" => Ok(ActionType::Update),
            "DELETE" => Ok(ActionType::Delete),
            "APPROVE" => Ok(ActionType::Approve),
            "MANAGE" => Ok(ActionType::Manage),
            _ => Err(ParseActionTypeError(s.to_string())),
        }
    }
}

/// Error returned when an action type name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseActionTypeError(String);

impl std::fmt::Display for ParseActionTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown action type: {:?}", self.0)
    }
}

impl std::error::Error for ParseActionTypeError {}

// ============================================================================
// Permission Definition - Clone (immutable catalog entry)
// ============================================================================

/// One entry of the permission catalog.
///
/// Definitions are created by system configuration and never mutated at
/// runtime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDefinition {
    pub permission_code: PermissionCode,
    pub permission_name: String,
    #[serde(default)]
    pub description: String,
    pub resource_type: ResourceType,
    pub action_type: ActionType,
}

impl PermissionDefinition {
    pub fn new(
        code: impl Into<PermissionCode>,
        name: impl Into<String>,
        resource_type: ResourceType,
        action_type: ActionType,
    ) -> Self {
        Self {
            permission_code: code.into(),
            permission_name: name.into(),
            description: String::new(),
            resource_type,
            action_type,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ============================================================================
// Grant - Clone (the unit the permission matrix persists)
// ============================================================================

/// One staff member holding one permission on one partner.
///
/// Unique by the `(staff_id, partner_id, permission_code)` triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub staff_id: StaffId,
    pub partner_id: PartnerId,
    pub permission_code: PermissionCode,
}

impl Grant {
    pub fn new(staff_id: StaffId, partner_id: PartnerId, permission_code: PermissionCode) -> Self {
        Self {
            staff_id,
            partner_id,
            permission_code,
        }
    }
}
