//! Mapping between entities and collection rows.

use std::fmt;

use chrono::SecondsFormat;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EntityKind;
use crate::model::{Activity, Material, Volunteer};

/// A named collection of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Registered volunteers.
    Volunteers,
    /// Loanable materials.
    Materials,
    /// Check-in and check-out history.
    Activities,
}

impl Collection {
    /// Every collection.
    pub const ALL: [Collection; 3] = [Self::Volunteers, Self::Materials, Self::Activities];

    /// Backing table name.
    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            Self::Volunteers => "volunteers",
            Self::Materials => "materials",
            Self::Activities => "activities",
        }
    }

    /// Indexed columns, in the order [`Record::index_values`] returns them.
    #[must_use]
    pub fn index_fields(self) -> &'static [&'static str] {
        match self {
            Self::Volunteers => &["name", "ministry", "active"],
            Self::Materials => &["name_key", "code_key", "kind", "status", "loaned_to"],
            Self::Activities => &["volunteer_id", "kind", "timestamp"],
        }
    }

    /// The entity kind stored in this collection.
    #[must_use]
    pub fn entity(self) -> EntityKind {
        match self {
            Self::Volunteers => EntityKind::Volunteer,
            Self::Materials => EntityKind::Material,
            Self::Activities => EntityKind::Activity,
        }
    }

    /// Whether `field` is one of this collection's indexed columns.
    #[must_use]
    pub fn is_indexed(self, field: &str) -> bool {
        self.index_fields().contains(&field)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// An entity that can be persisted in a [`Collection`].
pub trait Record: Serialize + DeserializeOwned + Send {
    /// The collection holding records of this type.
    const COLLECTION: Collection;

    /// The record's primary key.
    fn id(&self) -> &str;

    /// Values for the collection's indexed columns.
    fn index_values(&self) -> Vec<Option<String>>;
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

impl Record for Volunteer {
    const COLLECTION: Collection = Collection::Volunteers;

    fn id(&self) -> &str {
        &self.id
    }

    fn index_values(&self) -> Vec<Option<String>> {
        vec![
            Some(self.name.clone()),
            Some(self.ministry.to_string()),
            Some(flag(self.active)),
        ]
    }
}

impl Record for Material {
    const COLLECTION: Collection = Collection::Materials;

    fn id(&self) -> &str {
        &self.id
    }

    fn index_values(&self) -> Vec<Option<String>> {
        vec![
            Some(self.name_key()),
            self.code_key(),
            Some(self.kind.to_string()),
            Some(self.status.to_string()),
            self.loaned_to.clone(),
        ]
    }
}

impl Record for Activity {
    const COLLECTION: Collection = Collection::Activities;

    fn id(&self) -> &str {
        &self.id
    }

    fn index_values(&self) -> Vec<Option<String>> {
        vec![
            Some(self.volunteer_id.clone()),
            Some(self.kind().to_string()),
            Some(self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_fields_are_known() {
        assert!(Collection::Materials.is_indexed("status"));
        assert!(Collection::Materials.is_indexed("loaned_to"));
        assert!(!Collection::Materials.is_indexed("doc"));
        assert!(!Collection::Volunteers.is_indexed("status"));
    }

    #[test]
    fn test_collection_display() {
        assert_eq!(Collection::Activities.to_string(), "activities");
        assert_eq!(Collection::Volunteers.entity(), EntityKind::Volunteer);
    }

    #[test]
    fn test_flag() {
        assert_eq!(flag(true), "1");
        assert_eq!(flag(false), "0");
    }
}
