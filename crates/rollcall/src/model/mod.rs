//! Persisted entities: volunteers, materials, and activities.
//!
//! Values returned by the store are owned copies; mutating them has no
//! effect until they are written back inside a transaction.

mod activity;
mod material;
mod volunteer;

pub use activity::{
    Activity, ActivityDetail, ActivityKind, CheckinItem, CheckoutItem, Disposition,
};
pub use material::{Material, MaterialStats, MaterialStatus, MaterialType, NewMaterial};
pub use volunteer::{
    ActiveSession, Ministry, NewVolunteer, Volunteer, VolunteerStats, VolunteerUpdate,
};

/// Generate a fresh opaque identifier.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
