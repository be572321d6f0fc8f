//! Loanable materials: badges, radios, keys, and equipment.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// What kind of item a material is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    /// Name badge.
    Cracha,
    /// Two-way radio.
    Radio,
    /// Key.
    Chave,
    /// Sound or media equipment.
    Equipamento,
    /// Anything else.
    Outro,
}

impl MaterialType {
    /// Every material type.
    pub const ALL: [MaterialType; 5] = [
        Self::Cracha,
        Self::Radio,
        Self::Chave,
        Self::Equipamento,
        Self::Outro,
    ];

    /// The stored name of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cracha => "cracha",
            Self::Radio => "radio",
            Self::Chave => "chave",
            Self::Equipamento => "equipamento",
            Self::Outro => "outro",
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<_> = Self::ALL.iter().map(|t| t.as_str()).collect();
                Error::validation("type", format!("must be one of: {}", allowed.join(", ")))
            })
    }
}

/// Where a material is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    /// On the shelf, ready to be loaned.
    Available,
    /// Held by a volunteer.
    Loaned,
    /// Out of service for repair.
    Maintenance,
    /// Not returned.
    Lost,
}

impl MaterialStatus {
    /// Every status.
    pub const ALL: [MaterialStatus; 4] = [
        Self::Available,
        Self::Loaned,
        Self::Maintenance,
        Self::Lost,
    ];

    /// The stored name of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Loaned => "loaned",
            Self::Maintenance => "maintenance",
            Self::Lost => "lost",
        }
    }
}

impl fmt::Display for MaterialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| Error::validation("status", format!("unknown status '{s}'")))
    }
}

/// Loan statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialStats {
    /// Number of times this material entered `loaned`.
    pub total_loans: u64,
    /// Time of the most recent loan.
    pub last_loan_at: Option<DateTime<Utc>>,
}

/// A loanable item.
///
/// `loaned_to` is set exactly when `status` is [`MaterialStatus::Loaned`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    /// Opaque identifier.
    pub id: String,
    /// Display name, unique ignoring case.
    pub name: String,
    /// Optional inventory code, unique ignoring case.
    pub code: Option<String>,
    /// Item type.
    #[serde(rename = "type")]
    pub kind: MaterialType,
    /// Lifecycle status.
    pub status: MaterialStatus,
    /// Borrowing volunteer while loaned.
    pub loaned_to: Option<String>,
    /// Start of the current loan.
    pub loaned_at: Option<DateTime<Utc>>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// When the material was registered.
    pub registered_at: DateTime<Utc>,
    /// Loan statistics.
    pub stats: MaterialStats,
}

impl Material {
    /// Lowercased name used for uniqueness checks.
    #[must_use]
    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Lowercased code used for uniqueness checks.
    #[must_use]
    pub fn code_key(&self) -> Option<String> {
        self.code.as_deref().map(str::to_lowercase)
    }

    /// Whether status and borrower agree.
    #[must_use]
    pub fn loan_is_consistent(&self) -> bool {
        (self.status == MaterialStatus::Loaned) == self.loaned_to.is_some()
    }
}

/// Registration form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMaterial {
    /// Display name.
    pub name: String,
    /// Optional inventory code.
    pub code: Option<String>,
    /// Type name, e.g. `"radio"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form notes.
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(MaterialStatus::Available.to_string(), "available");
        assert_eq!(MaterialStatus::Maintenance.to_string(), "maintenance");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "lost".parse::<MaterialStatus>().unwrap(),
            MaterialStatus::Lost
        );
        assert!("broken".parse::<MaterialStatus>().is_err());
    }

    #[test]
    fn test_type_parse_rejects_unknown() {
        let err = "laptop".parse::<MaterialType>().unwrap_err();
        assert!(err.to_string().contains("equipamento"));
    }

    #[test]
    fn test_type_serializes_as_type_field() {
        let input = NewMaterial {
            name: "Rádio 1".to_string(),
            code: None,
            kind: "radio".to_string(),
            notes: None,
        };
        let json = serde_json::to_string(&input).unwrap();
        assert!(json.contains("\"type\":\"radio\""));
    }
}
