//! Append-only history of check-in and check-out events.
//!
//! Activities copy the volunteer's and materials' names at the time of the
//! event so that later renames leave the history untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{rules, Error};

use super::MaterialStatus;

/// Which event an activity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Materials were borrowed.
    Checkin,
    /// The session was closed and materials handed back.
    Checkout,
}

impl ActivityKind {
    /// The stored name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkin => "checkin",
            Self::Checkout => "checkout",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The condition a material came back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Handed back in working order.
    Returned,
    /// Handed back but needs repair.
    Damaged,
    /// Not handed back.
    Lost,
}

impl Disposition {
    /// Every disposition.
    pub const ALL: [Disposition; 3] = [Self::Returned, Self::Damaged, Self::Lost];

    /// The stored name of this disposition.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Returned => "returned",
            Self::Damaged => "damaged",
            Self::Lost => "lost",
        }
    }

    /// The status a material enters when returned with this disposition.
    #[must_use]
    pub fn target_status(self) -> MaterialStatus {
        match self {
            Self::Returned => MaterialStatus::Available,
            Self::Damaged => MaterialStatus::Maintenance,
            Self::Lost => MaterialStatus::Lost,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disposition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| {
                Error::business(
                    rules::INVALID_DISPOSITION,
                    format!("'{s}' is not a valid disposition (expected returned, damaged or lost)"),
                )
            })
    }
}

/// One material borrowed at check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinItem {
    /// The material.
    pub material_id: String,
    /// Material name when the event happened.
    pub material_name: String,
    /// Status the material entered.
    pub status_at_event: MaterialStatus,
}

/// One material handed back at check-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    /// The material.
    pub material_id: String,
    /// Material name when the event happened.
    pub material_name: String,
    /// Condition reported by the volunteer.
    pub disposition: Disposition,
}

/// Event-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityDetail {
    /// A check-in.
    Checkin {
        /// Borrowed materials.
        materials: Vec<CheckinItem>,
    },
    /// A check-out.
    Checkout {
        /// Returned materials with their disposition.
        materials: Vec<CheckoutItem>,
        /// Minutes since the matching check-in.
        duration_minutes: i64,
    },
}

/// An immutable historical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Opaque identifier.
    pub id: String,
    /// The volunteer involved.
    pub volunteer_id: String,
    /// Volunteer name when the event happened.
    pub volunteer_name: String,
    /// When the event was committed.
    pub timestamp: DateTime<Utc>,
    /// Optional free-form notes.
    pub notes: Option<String>,
    /// Event payload.
    #[serde(flatten)]
    pub detail: ActivityDetail,
}

impl Activity {
    /// Which event this is.
    #[must_use]
    pub fn kind(&self) -> ActivityKind {
        match self.detail {
            ActivityDetail::Checkin { .. } => ActivityKind::Checkin,
            ActivityDetail::Checkout { .. } => ActivityKind::Checkout,
        }
    }

    /// Ids of every material referenced by this event.
    #[must_use]
    pub fn material_ids(&self) -> Vec<&str> {
        match &self.detail {
            ActivityDetail::Checkin { materials } => {
                materials.iter().map(|m| m.material_id.as_str()).collect()
            }
            ActivityDetail::Checkout { materials, .. } => {
                materials.iter().map(|m| m.material_id.as_str()).collect()
            }
        }
    }

    /// Session length, for check-outs.
    #[must_use]
    pub fn duration_minutes(&self) -> Option<i64> {
        match self.detail {
            ActivityDetail::Checkout {
                duration_minutes, ..
            } => Some(duration_minutes),
            ActivityDetail::Checkin { .. } => None,
        }
    }
}
