//! Volunteer records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The ministry a volunteer serves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ministry {
    /// Worship team.
    Louvor,
    /// Reception and ushers.
    Recepcao,
    /// Media, sound, and streaming.
    Midia,
    /// Children's ministry.
    Infantil,
    /// Cleaning crew.
    Limpeza,
    /// Security team.
    Seguranca,
    /// Anything else.
    Outro,
}

impl Ministry {
    /// Every ministry, in display order.
    pub const ALL: [Ministry; 7] = [
        Self::Louvor,
        Self::Recepcao,
        Self::Midia,
        Self::Infantil,
        Self::Limpeza,
        Self::Seguranca,
        Self::Outro,
    ];

    /// The stored name of this ministry.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Louvor => "louvor",
            Self::Recepcao => "recepcao",
            Self::Midia => "midia",
            Self::Infantil => "infantil",
            Self::Limpeza => "limpeza",
            Self::Seguranca => "seguranca",
            Self::Outro => "outro",
        }
    }
}

impl fmt::Display for Ministry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ministry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<_> = Self::ALL.iter().map(|m| m.as_str()).collect();
                Error::validation(
                    "ministry",
                    format!("must be one of: {}", allowed.join(", ")),
                )
            })
    }
}

/// A volunteer's currently open check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    /// The check-in activity that opened this session.
    pub activity_id: String,
    /// When the check-in was committed.
    pub started_at: DateTime<Utc>,
    /// Materials borrowed, in the order they were selected.
    pub material_ids: Vec<String>,
}

/// Aggregate service statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolunteerStats {
    /// Number of successful check-ins.
    pub total_checkins: u64,
    /// Whole hours served, summed over closed sessions.
    pub hours_served: u64,
    /// Time of the most recent check-in.
    pub last_checkin_at: Option<DateTime<Utc>>,
}

/// A registered volunteer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volunteer {
    /// Opaque identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact phone, digits only.
    pub phone: Option<String>,
    /// Ministry served.
    pub ministry: Ministry,
    /// Whether the volunteer is currently serving.
    pub active: bool,
    /// When the volunteer was registered.
    pub registered_at: DateTime<Utc>,
    /// The open check-in, if any. At most one per volunteer.
    pub active_session: Option<ActiveSession>,
    /// Service statistics.
    pub stats: VolunteerStats,
}

impl Volunteer {
    /// Whether this volunteer has an open check-in.
    #[must_use]
    pub fn is_checked_in(&self) -> bool {
        self.active_session.is_some()
    }

    /// Whether the open check-in, if any, lists `material_id`.
    #[must_use]
    pub fn session_holds(&self, material_id: &str) -> bool {
        self.active_session
            .as_ref()
            .is_some_and(|s| s.material_ids.iter().any(|id| id == material_id))
    }
}

/// Registration form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVolunteer {
    /// Display name.
    pub name: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Ministry name, e.g. `"midia"`.
    pub ministry: String,
}

/// Administrative changes to a volunteer. `None` leaves a field unchanged.
///
/// Sessions and statistics are owned by check-in and check-out and cannot
/// be edited here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolunteerUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New phone. `Some(None)` clears it.
    pub phone: Option<Option<String>>,
    /// New ministry name.
    pub ministry: Option<String>,
    /// New active flag.
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ministry_round_trip_names() {
        for ministry in Ministry::ALL {
            assert_eq!(ministry.as_str().parse::<Ministry>().unwrap(), ministry);
        }
    }

    #[test]
    fn test_ministry_unknown() {
        let err = "choir".parse::<Ministry>().unwrap_err();
        assert!(err.to_string().contains("midia"));
    }

    #[test]
    fn test_ministry_serde_name() {
        let json = serde_json::to_string(&Ministry::Recepcao).unwrap();
        assert_eq!(json, "\"recepcao\"");
    }

    #[test]
    fn test_volunteer_stats_default() {
        let stats = VolunteerStats::default();
        assert_eq!(stats.total_checkins, 0);
        assert_eq!(stats.hours_served, 0);
        assert!(stats.last_checkin_at.is_none());
    }
}
