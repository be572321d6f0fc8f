//! `SQLite` schema definitions for rollcall.
//!
//! Each collection is a table of JSON documents keyed by id. The columns
//! next to `doc` are copies of indexed fields, kept in step by every write.

/// SQL statement to create the volunteers table.
pub const CREATE_VOLUNTEERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS volunteers (
    id TEXT PRIMARY KEY,
    doc TEXT NOT NULL,
    name TEXT,
    ministry TEXT,
    active TEXT
)
";

/// SQL statement to create the materials table.
pub const CREATE_MATERIALS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS materials (
    id TEXT PRIMARY KEY,
    doc TEXT NOT NULL,
    name_key TEXT,
    code_key TEXT,
    kind TEXT,
    status TEXT,
    loaned_to TEXT
)
";

/// SQL statement to create the activities table.
pub const CREATE_ACTIVITIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    doc TEXT NOT NULL,
    volunteer_id TEXT,
    kind TEXT,
    timestamp TEXT
)
";

/// Volunteer lookups by name and ministry.
pub const CREATE_VOLUNTEER_INDEXES: &str = r"
CREATE INDEX IF NOT EXISTS idx_volunteers_name ON volunteers(name);
CREATE INDEX IF NOT EXISTS idx_volunteers_ministry ON volunteers(ministry);
CREATE INDEX IF NOT EXISTS idx_volunteers_active ON volunteers(active)
";

/// Material lookups by name, code, status, and loan holder.
pub const CREATE_MATERIAL_INDEXES: &str = r"
CREATE INDEX IF NOT EXISTS idx_materials_name ON materials(name_key);
CREATE INDEX IF NOT EXISTS idx_materials_code ON materials(code_key);
CREATE INDEX IF NOT EXISTS idx_materials_kind ON materials(kind);
CREATE INDEX IF NOT EXISTS idx_materials_status ON materials(status);
CREATE INDEX IF NOT EXISTS idx_materials_loaned_to ON materials(loaned_to)
";

/// Activity lookups by volunteer, kind, and time.
pub const CREATE_ACTIVITY_INDEXES: &str = r"
CREATE INDEX IF NOT EXISTS idx_activities_volunteer ON activities(volunteer_id);
CREATE INDEX IF NOT EXISTS idx_activities_kind ON activities(kind);
CREATE INDEX IF NOT EXISTS idx_activities_timestamp ON activities(timestamp DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_VOLUNTEERS_TABLE,
    CREATE_MATERIALS_TABLE,
    CREATE_ACTIVITIES_TABLE,
    CREATE_VOLUNTEER_INDEXES,
    CREATE_MATERIAL_INDEXES,
    CREATE_ACTIVITY_INDEXES,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_order() {
        assert_eq!(SCHEMA_STATEMENTS.len(), 7);
        assert!(SCHEMA_STATEMENTS[0].contains("volunteers"));
        assert!(SCHEMA_STATEMENTS[6].contains("metadata"));
    }

    #[test]
    fn test_every_table_has_doc_column() {
        for sql in [
            CREATE_VOLUNTEERS_TABLE,
            CREATE_MATERIALS_TABLE,
            CREATE_ACTIVITIES_TABLE,
        ] {
            assert!(sql.contains("id TEXT PRIMARY KEY"));
            assert!(sql.contains("doc TEXT NOT NULL"));
        }
    }

    #[test]
    fn test_loan_holder_is_indexed() {
        assert!(CREATE_MATERIAL_INDEXES.contains("materials(loaned_to)"));
    }
}
