//! Summary counts for the front desk.

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::model::{Material, MaterialStatus, Volunteer};
use crate::store::{Collection, Store};

/// Point-in-time counts of volunteers and materials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardMetrics {
    /// Volunteers with an open session.
    pub active_volunteers: usize,
    /// Materials currently loaned.
    pub loaned_materials: usize,
    /// Materials ready to be loaned.
    pub available_materials: usize,
    /// Materials under repair.
    pub maintenance_materials: usize,
    /// Materials reported lost.
    pub lost_materials: usize,
    /// Every registered volunteer.
    pub total_volunteers: usize,
    /// Every registered material.
    pub total_materials: usize,
}

/// Dashboard queries.
#[derive(Debug, Clone)]
pub struct Dashboard {
    store: Store,
}

impl Dashboard {
    /// Create a dashboard over `store`.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Compute every metric from one consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn metrics(&self) -> Result<DashboardMetrics> {
        let metrics = self
            .store
            .transaction(&[Collection::Volunteers, Collection::Materials], |txn| {
                let volunteers: Vec<Volunteer> = txn.get_all()?;
                let materials: Vec<Material> = txn.get_all()?;

                let mut metrics = DashboardMetrics {
                    active_volunteers: volunteers.iter().filter(|v| v.is_checked_in()).count(),
                    total_volunteers: volunteers.len(),
                    total_materials: materials.len(),
                    ..DashboardMetrics::default()
                };
                for material in &materials {
                    match material.status {
                        MaterialStatus::Available => metrics.available_materials += 1,
                        MaterialStatus::Loaned => metrics.loaned_materials += 1,
                        MaterialStatus::Maintenance => metrics.maintenance_materials += 1,
                        MaterialStatus::Lost => metrics.lost_materials += 1,
                    }
                }
                Ok(metrics)
            })
            .await?;

        debug!(?metrics, "Computed dashboard metrics");
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::{ActiveSession, MaterialStats, MaterialType, Ministry, VolunteerStats};

    fn volunteer(id: &str, checked_in: bool) -> Volunteer {
        Volunteer {
            id: id.to_string(),
            name: format!("Volunteer {id}"),
            phone: None,
            ministry: Ministry::Recepcao,
            active: true,
            registered_at: Utc::now(),
            active_session: checked_in.then(|| ActiveSession {
                activity_id: format!("a-{id}"),
                started_at: Utc::now(),
                material_ids: vec!["m-1".to_string()],
            }),
            stats: VolunteerStats::default(),
        }
    }

    fn material(id: &str, status: MaterialStatus) -> Material {
        Material {
            id: id.to_string(),
            name: format!("Material {id}"),
            code: None,
            kind: MaterialType::Cracha,
            status,
            loaned_to: (status == MaterialStatus::Loaned).then(|| "v-1".to_string()),
            loaned_at: None,
            notes: None,
            registered_at: Utc::now(),
            stats: MaterialStats::default(),
        }
    }

    #[tokio::test]
    async fn test_empty_store() {
        let dashboard = Dashboard::new(Store::open_in_memory().unwrap());
        assert_eq!(
            dashboard.metrics().await.unwrap(),
            DashboardMetrics::default()
        );
    }

    #[tokio::test]
    async fn test_counts_by_status() {
        let store = Store::open_in_memory().unwrap();
        store.put(&volunteer("v-1", true)).await.unwrap();
        store.put(&volunteer("v-2", false)).await.unwrap();
        store
            .put(&material("m-1", MaterialStatus::Loaned))
            .await
            .unwrap();
        store
            .put(&material("m-2", MaterialStatus::Available))
            .await
            .unwrap();
        store
            .put(&material("m-3", MaterialStatus::Available))
            .await
            .unwrap();
        store
            .put(&material("m-4", MaterialStatus::Maintenance))
            .await
            .unwrap();
        store
            .put(&material("m-5", MaterialStatus::Lost))
            .await
            .unwrap();

        let metrics = Dashboard::new(store).metrics().await.unwrap();
        assert_eq!(
            metrics,
            DashboardMetrics {
                active_volunteers: 1,
                loaned_materials: 1,
                available_materials: 2,
                maintenance_materials: 1,
                lost_materials: 1,
                total_volunteers: 2,
                total_materials: 5,
            }
        );
    }
}
