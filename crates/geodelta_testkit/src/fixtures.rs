//! Test fixtures and coordinator helpers.
//!
//! Provides convenience functions for setting up seeded coordinators and
//! common test scenarios.

use geodelta_core::{
    Batch, BatchItem, Coordinator, DeltaLog, Feature, FeatureId, FeatureStore, Geometry,
    Properties, UserId, UserLedger,
};
use std::sync::Arc;

/// The fixture user every seeded coordinator registers.
pub const FIXTURE_USERNAME: &str = "ingalls";
/// The fixture user's password.
pub const FIXTURE_PASSWORD: &str = "yeaheh";

/// A coordinator over fresh state with one registered user.
pub struct TestCoordinator {
    /// The coordinator instance.
    pub coordinator: Arc<Coordinator>,
    /// The registered fixture user's ID.
    pub author: UserId,
}

impl TestCoordinator {
    /// Creates a coordinator with empty state and the fixture user.
    pub fn new() -> Self {
        let coordinator = Arc::new(Coordinator::new(
            Arc::new(FeatureStore::new()),
            Arc::new(DeltaLog::new()),
            Arc::new(UserLedger::new()),
        ));
        let author = coordinator
            .users()
            .register(FIXTURE_USERNAME, FIXTURE_PASSWORD, "ingalls@protonmail.com")
            .expect("fresh ledger accepts the fixture user")
            .id;
        Self {
            coordinator,
            author,
        }
    }

    /// Commits a batch as the fixture user with empty metadata.
    pub fn commit(&self, batch: &Batch) -> geodelta_core::CommitOutcome {
        self.coordinator
            .commit(self.author, Properties::new(), batch)
            .expect("fixture batch commits")
    }
}

impl Default for TestCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestCoordinator {
    type Target = Coordinator;

    fn deref(&self) -> &Self::Target {
        &self.coordinator
    }
}

/// Runs a test with a freshly seeded coordinator.
pub fn with_coordinator<F, R>(f: F) -> R
where
    F: FnOnce(&TestCoordinator) -> R,
{
    let fixture = TestCoordinator::new();
    f(&fixture)
}

/// Properties containing a single `{"shop": true}` member.
pub fn shop_properties() -> Properties {
    let mut properties = Properties::new();
    properties.insert("shop".into(), serde_json::Value::Bool(true));
    properties
}

/// A point feature at the given coordinates with shop properties.
pub fn shop_feature(id: u64, lon: f64, lat: f64) -> Feature {
    Feature::new(FeatureId::new(id), Geometry::point(lon, lat), shop_properties())
}

/// A create item for a shop point.
pub fn create_shop(lon: f64, lat: f64) -> BatchItem {
    BatchItem::create(Geometry::point(lon, lat), shop_properties())
}

/// A batch of shop-point creates at distinct coordinates.
pub fn shop_batch(count: usize) -> Batch {
    let items = (0..count)
        .map(|i| create_shop(i as f64, i as f64))
        .collect();
    Batch::from_items(items)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A coordinator with `count` shop points already committed in one delta.
    pub fn populated_coordinator(count: usize) -> TestCoordinator {
        let fixture = TestCoordinator::new();
        fixture.commit(&shop_batch(count));
        fixture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodelta_core::Version;

    #[test]
    fn seeded_coordinator_has_fixture_user() {
        with_coordinator(|fixture| {
            let user = fixture
                .users()
                .verify(FIXTURE_USERNAME, FIXTURE_PASSWORD)
                .unwrap();
            assert_eq!(user.id, fixture.author);
        });
    }

    #[test]
    fn populated_scenario_commits_one_delta() {
        let fixture = scenarios::populated_coordinator(3);
        assert_eq!(fixture.log().len(), 1);
        assert_eq!(fixture.store().len(), 3);
        assert_eq!(
            fixture.store().get(FeatureId::new(1)).unwrap().version,
            Version::INITIAL
        );
    }
}
