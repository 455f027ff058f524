//! Wire and value types shared by the list, mutation, and counter paths.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::RuleboardError;

/// Disposition of a rule in the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    #[default]
    Allowed,
    Denied,
    Whitelisted,
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleStatus::Allowed => write!(f, "allowed"),
            RuleStatus::Denied => write!(f, "denied"),
            RuleStatus::Whitelisted => write!(f, "whitelisted"),
        }
    }
}

impl FromStr for RuleStatus {
    type Err = RuleboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allowed" => Ok(RuleStatus::Allowed),
            "denied" => Ok(RuleStatus::Denied),
            "whitelisted" => Ok(RuleStatus::Whitelisted),
            _ => Err(RuleboardError::InvalidStatus(s.to_string())),
        }
    }
}

pub const VALID_STATUSES: &[&str] = &["allowed", "denied", "whitelisted"];

/// One row of a rule collection as reported by the service.
///
/// Rows originate from and are destroyed by the remote collection; the
/// client only ever holds read-only copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: u64,
    /// The rule subject: an IP/CIDR, email, username, country code, ...
    #[serde(alias = "address")]
    pub value: String,
    pub status: RuleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

/// One page of a collection listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPage {
    pub items: Vec<RuleRecord>,
    pub total: u64,
}

/// Shape of overlap detected between a proposed rule and an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    ExactMatch,
    IpInCidr,
    CidrCoversIp,
    CidrOverlapsCidr,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::ExactMatch => write!(f, "exact_match"),
            ConflictKind::IpInCidr => write!(f, "ip_in_cidr"),
            ConflictKind::CidrCoversIp => write!(f, "cidr_covers_ip"),
            ConflictKind::CidrOverlapsCidr => write!(f, "cidr_overlaps_cidr"),
        }
    }
}

/// Error-severity conflicts blocked the write; warning-severity conflicts
/// mean the write already landed and the overlap is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Error,
    Warning,
}

/// One overlap reported by the rule-conflict evaluation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    /// Addresses of the existing rules involved in the overlap.
    pub conflicting: Vec<String>,
    /// Status of the existing rules (as reported, free-form).
    pub status: String,
    pub message: String,
}

impl Conflict {
    pub fn is_blocking(&self) -> bool {
        self.severity == ConflictSeverity::Error
    }
}

/// Body of a 409 response to an address-type write.
#[derive(Debug, Clone, Deserialize)]
pub struct ConflictResponse {
    pub error: String,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
}

/// Collection-wide summary counts for filter-chip labels.
///
/// Always reflects the whole collection, never the currently filtered
/// subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleCounters {
    #[serde(default)]
    pub allowed: u64,
    #[serde(default)]
    pub denied: u64,
    #[serde(default)]
    pub whitelisted: u64,
    #[serde(default)]
    pub total: u64,
    /// Type-specific breakdowns (e.g. `cidr`, `single` for address lists).
    #[serde(flatten)]
    pub by_type: HashMap<String, u64>,
}

impl RuleCounters {
    pub fn for_status(&self, status: RuleStatus) -> u64 {
        match status {
            RuleStatus::Allowed => self.allowed,
            RuleStatus::Denied => self.denied,
            RuleStatus::Whitelisted => self.whitelisted,
        }
    }
}

/// Form payload for a create or update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDraft {
    pub value: String,
    pub status: RuleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Present for update semantics, absent for create.
    #[serde(skip_serializing)]
    pub edit_id: Option<u64>,
}

impl RuleDraft {
    pub fn create(value: impl Into<String>, status: RuleStatus) -> Self {
        Self {
            value: value.into(),
            status,
            note: None,
            edit_id: None,
        }
    }

    pub fn edit(id: u64, value: impl Into<String>, status: RuleStatus) -> Self {
        Self {
            value: value.into(),
            status,
            note: None,
            edit_id: Some(id),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_cidr(&self) -> bool {
        self.value.contains('/')
    }

    pub fn is_edit(&self) -> bool {
        self.edit_id.is_some()
    }
}
