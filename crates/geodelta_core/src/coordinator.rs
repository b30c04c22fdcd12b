//! Transaction coordinator.
//!
//! The coordinator is the sole writer of the feature store and the delta
//! log. Every mutation, from either protocol front-end, arrives here as one
//! ordered [`Batch`] and commits as exactly one delta or not at all.

use crate::auth::UserLedger;
use crate::batch::{Action, Batch, BatchItem};
use crate::delta::{DeltaLog, DeltaMetadata, SnapshotEntry};
use crate::error::{CoreError, CoreResult};
use crate::feature::Feature;
use crate::store::FeatureStore;
use crate::types::{DeltaId, FeatureId, UserId, Version};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// The result of committing one batch item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedItem {
    /// The action that was committed.
    pub action: Action,
    /// The client-side placeholder, if one was submitted.
    pub placeholder: Option<i64>,
    /// The final (assigned) feature ID.
    pub id: FeatureId,
    /// The resulting version; `None` for deletes.
    pub version: Option<Version>,
}

/// The result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The recorded delta; `None` for an empty no-op batch.
    pub delta_id: Option<DeltaId>,
    /// Per-item assignments, in submission order.
    pub items: Vec<CommittedItem>,
}

/// What a staged row will become once the batch is written.
enum StagedRow {
    Upsert(Feature),
    Delete,
}

/// Validates and atomically commits batches of feature operations.
///
/// ## Concurrency
///
/// A single commit lock serializes writers; the optimistic version check and
/// the commit are the same critical section, so the loser of two overlapping
/// batches observes a stale version and fails rather than corrupting state.
/// ID assignment for features and deltas is monotonic and race-free under
/// that lock. Readers are never blocked and never observe a partially
/// applied batch.
pub struct Coordinator {
    store: Arc<FeatureStore>,
    log: Arc<DeltaLog>,
    users: Arc<UserLedger>,
    /// Next feature ID. Read and advanced only under the commit lock.
    next_feature_id: AtomicU64,
    /// Serializes all writers.
    commit_lock: Mutex<()>,
}

impl Coordinator {
    /// Creates a coordinator over the given store, log, and user ledger.
    ///
    /// The feature-ID counter resumes after the highest ID the log has ever
    /// assigned, so IDs are never reused across restarts of the projection.
    #[must_use]
    pub fn new(store: Arc<FeatureStore>, log: Arc<DeltaLog>, users: Arc<UserLedger>) -> Self {
        let next = highest_feature_id(&log) + 1;
        Self {
            store,
            log,
            users,
            next_feature_id: AtomicU64::new(next),
            commit_lock: Mutex::new(()),
        }
    }

    /// Returns the feature store this coordinator writes.
    #[must_use]
    pub fn store(&self) -> &Arc<FeatureStore> {
        &self.store
    }

    /// Returns the delta log this coordinator writes.
    #[must_use]
    pub fn log(&self) -> &Arc<DeltaLog> {
        &self.log
    }

    /// Returns the user ledger consulted for authorization.
    #[must_use]
    pub fn users(&self) -> &Arc<UserLedger> {
        &self.users
    }

    /// Validates and commits a batch as one new delta.
    ///
    /// An empty batch commits trivially: it reports success and writes no
    /// delta. Any validation failure aborts the whole batch with no effect.
    pub fn commit(
        &self,
        author: UserId,
        metadata: DeltaMetadata,
        batch: &Batch,
    ) -> CoreResult<CommitOutcome> {
        if !self.users.contains(author) {
            return Err(CoreError::BadCredentials);
        }
        if batch.is_empty() {
            return Ok(CommitOutcome {
                delta_id: None,
                items: Vec::new(),
            });
        }

        let _guard = self.commit_lock.lock();
        let staged = self.stage(batch)?;

        // The delta is the durability anchor: record it first, then project
        // the row changes, all inside the same critical section.
        let delta_id = self
            .log
            .append(staged.snapshot, staged.affected, metadata, author);
        self.apply_staged(delta_id, staged.rows);

        debug!(
            delta = delta_id.as_u64(),
            items = batch.len(),
            "committed batch"
        );
        Ok(CommitOutcome {
            delta_id: Some(delta_id),
            items: staged.items,
        })
    }

    /// Validates and commits a batch into an already-open delta.
    ///
    /// This is the legacy edit-upload path: the changeset's delta was opened
    /// earlier with its metadata, and this commit populates and finalizes it
    /// instead of appending a new one. The delta must be open and owned by
    /// the author.
    pub fn commit_into(
        &self,
        author: UserId,
        delta_id: DeltaId,
        batch: &Batch,
    ) -> CoreResult<CommitOutcome> {
        if !self.users.contains(author) {
            return Err(CoreError::BadCredentials);
        }

        let _guard = self.commit_lock.lock();

        let delta = self.log.get(delta_id)?;
        if delta.finalized {
            return Err(CoreError::DeltaFinalized { id: delta_id });
        }
        if delta.author != author {
            return Err(CoreError::DeltaNotOwned { id: delta_id });
        }

        let staged = self.stage(batch)?;
        self.log
            .finalize(delta_id, staged.snapshot, staged.affected)?;
        self.apply_staged(delta_id, staged.rows);

        debug!(
            delta = delta_id.as_u64(),
            items = batch.len(),
            "finalized open delta"
        );
        Ok(CommitOutcome {
            delta_id: Some(delta_id),
            items: staged.items,
        })
    }

    /// Rebuilds the feature-store projection from the delta log.
    ///
    /// The log is the source of truth; this clears the store, replays every
    /// finalized delta in commit order, and resets the feature-ID counter.
    pub fn recover(&self) -> CoreResult<()> {
        let _guard = self.commit_lock.lock();
        self.store.clear();

        for delta in self.log.list() {
            if !delta.finalized {
                continue;
            }
            let mut upserts = Vec::new();
            let mut deletes = Vec::new();
            for entry in &delta.snapshot {
                match entry.action {
                    Action::Create | Action::Modify => {
                        let geometry = entry.geometry.clone().ok_or_else(|| {
                            CoreError::malformed("snapshot entry missing geometry")
                        })?;
                        let properties = entry.properties.clone().ok_or_else(|| {
                            CoreError::malformed("snapshot entry missing properties")
                        })?;
                        let history = self
                            .store
                            .get(entry.id)
                            .map(|f| f.history)
                            .unwrap_or_default();
                        upserts.push(Feature {
                            id: entry.id,
                            version: entry.version.unwrap_or(Version::INITIAL),
                            geometry,
                            properties,
                            history,
                        });
                    }
                    Action::Delete => deletes.push(entry.id),
                }
            }
            self.store.apply(upserts, deletes);
            self.append_history(delta.id, &delta.affected);
        }

        self.next_feature_id
            .store(highest_feature_id(&self.log) + 1, Ordering::SeqCst);
        Ok(())
    }

    /// Validates the batch against pre-batch state and stages every row
    /// change. Nothing is written; a staging error leaves no effect.
    fn stage(&self, batch: &Batch) -> CoreResult<Staged> {
        // Phase 1: validation. Version checks run against the state before
        // the batch begins, not incrementally, so two conflicting operations
        // on the same ID fail together.
        for item in &batch.items {
            self.validate_item(item)?;
        }

        // Phase 2: stage row changes in submission order.
        let mut rows: BTreeMap<FeatureId, StagedRow> = BTreeMap::new();
        let mut snapshot = Vec::with_capacity(batch.len());
        let mut items = Vec::with_capacity(batch.len());

        for item in &batch.items {
            let (id, version) = match item.action {
                Action::Create => {
                    let id = FeatureId::new(self.next_feature_id.fetch_add(1, Ordering::SeqCst));
                    let geometry = item
                        .geometry
                        .clone()
                        .ok_or_else(|| CoreError::malformed("create requires a geometry"))?;
                    let properties = item
                        .properties
                        .clone()
                        .ok_or_else(|| CoreError::malformed("create requires properties"))?;
                    rows.insert(id, StagedRow::Upsert(Feature::new(id, geometry, properties)));
                    (id, Some(Version::INITIAL))
                }
                Action::Modify => {
                    let id = item.id.ok_or_else(|| CoreError::malformed("modify requires an id"))?;
                    let base = self.staged_feature(&rows, id)?;
                    let geometry = item
                        .geometry
                        .clone()
                        .ok_or_else(|| CoreError::malformed("modify requires a geometry"))?;
                    let properties = item
                        .properties
                        .clone()
                        .ok_or_else(|| CoreError::malformed("modify requires properties"))?;
                    let version = base.version.next();
                    rows.insert(
                        id,
                        StagedRow::Upsert(Feature {
                            id,
                            version,
                            geometry,
                            properties,
                            history: base.history,
                        }),
                    );
                    (id, Some(version))
                }
                Action::Delete => {
                    let id = item.id.ok_or_else(|| CoreError::malformed("delete requires an id"))?;
                    // Confirm the row still exists in staged state.
                    self.staged_feature(&rows, id)?;
                    rows.insert(id, StagedRow::Delete);
                    (id, None)
                }
            };

            snapshot.push(SnapshotEntry {
                action: item.action,
                id,
                version,
                geometry: item.geometry.clone(),
                properties: item.properties.clone(),
            });
            items.push(CommittedItem {
                action: item.action,
                placeholder: item.placeholder,
                id,
                version,
            });
        }

        let mut affected: Vec<FeatureId> = rows.keys().copied().collect();
        affected.sort_unstable();

        Ok(Staged {
            rows,
            snapshot,
            affected,
            items,
        })
    }

    /// Validates a single item against pre-batch state.
    fn validate_item(&self, item: &BatchItem) -> CoreResult<()> {
        match item.action {
            Action::Create => {
                if item.id.is_some() {
                    return Err(CoreError::malformed("create must not carry an id"));
                }
                if item.version.is_some() {
                    return Err(CoreError::malformed("create must not carry a version"));
                }
                if item.geometry.is_none() {
                    return Err(CoreError::malformed("create requires a geometry"));
                }
                if item.properties.is_none() {
                    return Err(CoreError::malformed("create requires properties"));
                }
            }
            Action::Modify => {
                let id = item.id.ok_or_else(|| CoreError::malformed("modify requires an id"))?;
                let version = item
                    .version
                    .ok_or_else(|| CoreError::malformed("modify requires a version"))?;
                if item.geometry.is_none() {
                    return Err(CoreError::malformed("modify requires a geometry"));
                }
                if item.properties.is_none() {
                    return Err(CoreError::malformed("modify requires properties"));
                }
                let current = self.store.get(id)?;
                if current.version != version {
                    return Err(CoreError::version_conflict(id, current.version, version));
                }
            }
            Action::Delete => {
                let id = item.id.ok_or_else(|| CoreError::malformed("delete requires an id"))?;
                let version = item
                    .version
                    .ok_or_else(|| CoreError::malformed("delete requires a version"))?;
                let current = self.store.get(id)?;
                if current.version != version {
                    return Err(CoreError::delete_mismatch(id, current.version, version));
                }
            }
        }
        Ok(())
    }

    /// Resolves a feature from staged state, falling back to the store.
    fn staged_feature(
        &self,
        rows: &BTreeMap<FeatureId, StagedRow>,
        id: FeatureId,
    ) -> CoreResult<Feature> {
        match rows.get(&id) {
            Some(StagedRow::Upsert(feature)) => Ok(feature.clone()),
            Some(StagedRow::Delete) => Err(CoreError::not_found(id)),
            None => self.store.get(id),
        }
    }

    /// Writes staged rows, appending the delta ID to each surviving
    /// affected feature's history.
    fn apply_staged(&self, delta_id: DeltaId, rows: BTreeMap<FeatureId, StagedRow>) {
        let mut upserts = Vec::new();
        let mut deletes = Vec::new();
        for (id, row) in rows {
            match row {
                StagedRow::Upsert(mut feature) => {
                    feature.record_delta(delta_id);
                    upserts.push(feature);
                }
                StagedRow::Delete => deletes.push(id),
            }
        }
        self.store.apply(upserts, deletes);
    }

    /// Appends a delta to the history of every surviving affected feature.
    /// Used during replay, where rows are applied before histories.
    fn append_history(&self, delta_id: DeltaId, affected: &[FeatureId]) {
        for &id in affected {
            if let Ok(mut feature) = self.store.get(id) {
                feature.record_delta(delta_id);
                self.store.upsert(feature);
            }
        }
    }
}

struct Staged {
    rows: BTreeMap<FeatureId, StagedRow>,
    snapshot: Vec<SnapshotEntry>,
    affected: Vec<FeatureId>,
    items: Vec<CommittedItem>,
}

/// Returns the highest feature ID any delta has assigned, or 0.
fn highest_feature_id(log: &DeltaLog) -> u64 {
    log.list()
        .iter()
        .flat_map(|delta| delta.affected.iter())
        .map(|id| id.as_u64())
        .max()
        .unwrap_or(0)
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("features", &self.store.len())
            .field("deltas", &self.log.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Properties;
    use crate::geometry::Geometry;

    fn setup() -> (Coordinator, UserId) {
        let store = Arc::new(FeatureStore::new());
        let log = Arc::new(DeltaLog::new());
        let users = Arc::new(UserLedger::new());
        let user = users
            .register("ingalls", "yeaheh", "ingalls@example.com")
            .unwrap();
        (Coordinator::new(store, log, users), user.id)
    }

    fn shop_props() -> Properties {
        let mut props = Properties::new();
        props.insert("shop".into(), serde_json::Value::Bool(true));
        props
    }

    fn create_point(lon: f64, lat: f64) -> BatchItem {
        BatchItem::create(Geometry::point(lon, lat), shop_props())
    }

    #[test]
    fn creates_assign_version_one_and_one_delta() {
        let (coordinator, user) = setup();
        let batch = Batch::from_items(vec![
            create_point(0.0, 0.0),
            create_point(1.0, 1.0),
            create_point(2.0, 2.0),
        ]);

        let outcome = coordinator.commit(user, Properties::new(), &batch).unwrap();
        let delta_id = outcome.delta_id.unwrap();

        assert_eq!(outcome.items.len(), 3);
        for item in &outcome.items {
            assert_eq!(item.version, Some(Version::INITIAL));
        }

        let delta = coordinator.log().get(delta_id).unwrap();
        let ids: Vec<FeatureId> = outcome.items.iter().map(|i| i.id).collect();
        assert_eq!(delta.affected, ids);
        assert!(delta.finalized);

        for id in ids {
            let feature = coordinator.store().get(id).unwrap();
            assert_eq!(feature.version, Version::INITIAL);
            assert_eq!(feature.history, vec![delta_id]);
        }
    }

    #[test]
    fn modify_with_current_version_increments() {
        let (coordinator, user) = setup();
        let outcome = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![create_point(0.0, 0.0)]),
            )
            .unwrap();
        let id = outcome.items[0].id;

        let batch = Batch::from_items(vec![BatchItem::modify(
            id,
            Version::INITIAL,
            Geometry::point(5.0, 5.0),
            Properties::new(),
        )]);
        let outcome = coordinator.commit(user, Properties::new(), &batch).unwrap();

        assert_eq!(outcome.items[0].version, Some(Version::new(2)));
        let feature = coordinator.store().get(id).unwrap();
        assert_eq!(feature.version, Version::new(2));
        assert_eq!(feature.geometry, Geometry::point(5.0, 5.0));
        assert!(feature.properties.is_empty());
        assert_eq!(feature.history.len(), 2);
    }

    #[test]
    fn stale_modify_fails_idempotently() {
        let (coordinator, user) = setup();
        let outcome = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![create_point(0.0, 0.0)]),
            )
            .unwrap();
        let id = outcome.items[0].id;

        let stale = Batch::from_items(vec![BatchItem::modify(
            id,
            Version::new(9),
            Geometry::point(5.0, 5.0),
            Properties::new(),
        )]);

        for _ in 0..2 {
            let err = coordinator
                .commit(user, Properties::new(), &stale)
                .unwrap_err();
            assert_eq!(
                err,
                CoreError::version_conflict(id, Version::INITIAL, Version::new(9))
            );
        }

        // Unchanged after repeated failures.
        let feature = coordinator.store().get(id).unwrap();
        assert_eq!(feature.version, Version::INITIAL);
        assert_eq!(feature.properties, shop_props());
        assert_eq!(coordinator.log().len(), 1);
    }

    #[test]
    fn stale_delete_is_a_delete_version_mismatch() {
        let (coordinator, user) = setup();
        let outcome = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![create_point(0.0, 0.0)]),
            )
            .unwrap();
        let id = outcome.items[0].id;

        let err = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![BatchItem::delete(id, Version::new(4))]),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::DeleteVersionMismatch { .. }));
        assert!(coordinator.store().contains(id));

        // Correct version removes the row entirely.
        coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![BatchItem::delete(id, Version::INITIAL)]),
            )
            .unwrap();
        assert!(!coordinator.store().contains(id));
    }

    #[test]
    fn mixed_batch_commits_nothing() {
        let (coordinator, user) = setup();
        let outcome = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![create_point(0.0, 0.0)]),
            )
            .unwrap();
        let id = outcome.items[0].id;

        let mixed = Batch::from_items(vec![
            create_point(3.0, 3.0),
            BatchItem::modify(id, Version::new(7), Geometry::point(1.0, 1.0), Properties::new()),
        ]);
        let err = coordinator.commit(user, Properties::new(), &mixed).unwrap_err();
        assert!(matches!(err, CoreError::VersionConflict { .. }));

        // No delta appended, no row added, original untouched.
        assert_eq!(coordinator.log().len(), 1);
        assert_eq!(coordinator.store().len(), 1);
        assert_eq!(
            coordinator.store().get(id).unwrap().version,
            Version::INITIAL
        );
    }

    #[test]
    fn empty_batch_is_a_successful_noop() {
        let (coordinator, user) = setup();
        let outcome = coordinator
            .commit(user, Properties::new(), &Batch::new())
            .unwrap();
        assert_eq!(outcome.delta_id, None);
        assert!(outcome.items.is_empty());
        assert!(coordinator.log().is_empty());
    }

    #[test]
    fn modify_missing_geometry_is_malformed() {
        let (coordinator, user) = setup();
        let outcome = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![create_point(0.0, 0.0)]),
            )
            .unwrap();
        let id = outcome.items[0].id;

        let mut item = BatchItem::modify(
            id,
            Version::INITIAL,
            Geometry::point(1.0, 1.0),
            Properties::new(),
        );
        item.geometry = None;

        let err = coordinator
            .commit(user, Properties::new(), &Batch::from_items(vec![item]))
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedFeature { .. }));
    }

    #[test]
    fn modify_unknown_id_is_not_found() {
        let (coordinator, user) = setup();
        let batch = Batch::from_items(vec![BatchItem::modify(
            FeatureId::new(99),
            Version::INITIAL,
            Geometry::point(0.0, 0.0),
            Properties::new(),
        )]);
        let err = coordinator.commit(user, Properties::new(), &batch).unwrap_err();
        assert_eq!(err, CoreError::not_found(FeatureId::new(99)));
    }

    #[test]
    fn unknown_author_never_reaches_validation() {
        let (coordinator, _user) = setup();
        let err = coordinator
            .commit(
                UserId::new(42),
                Properties::new(),
                &Batch::from_items(vec![create_point(0.0, 0.0)]),
            )
            .unwrap_err();
        assert_eq!(err, CoreError::BadCredentials);
        assert!(coordinator.log().is_empty());
    }

    #[test]
    fn shop_scenario_two_rounds() {
        let (coordinator, user) = setup();

        // Round one: three point creates in one batch.
        let batch = Batch::from_items(vec![
            create_point(0.0, 0.0),
            create_point(1.0, 1.0),
            create_point(2.0, 2.0),
        ]);
        let first = coordinator.commit(user, Properties::new(), &batch).unwrap();
        let first_delta = first.delta_id.unwrap();
        let ids: Vec<FeatureId> = first.items.iter().map(|i| i.id).collect();

        // Round two: modify all three, declaring version 1.
        let mut new_props = Properties::new();
        new_props.insert("shop".into(), serde_json::Value::Bool(false));
        let batch = Batch::from_items(
            ids.iter()
                .map(|&id| {
                    BatchItem::modify(
                        id,
                        Version::INITIAL,
                        Geometry::point(9.0, 9.0),
                        new_props.clone(),
                    )
                })
                .collect(),
        );
        let second = coordinator.commit(user, Properties::new(), &batch).unwrap();
        let second_delta = second.delta_id.unwrap();

        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(coordinator.log().get(second_delta).unwrap().affected, sorted);

        for id in ids {
            let feature = coordinator.store().get(id).unwrap();
            assert_eq!(feature.version, Version::new(2));
            assert_eq!(feature.history, vec![first_delta, second_delta]);
        }
    }

    #[test]
    fn commit_into_finalizes_the_open_delta() {
        let (coordinator, user) = setup();
        let delta_id = coordinator.log().open(Properties::new(), user);

        let batch = Batch::from_items(vec![create_point(0.0, 0.0).with_placeholder(-1)]);
        let outcome = coordinator.commit_into(user, delta_id, &batch).unwrap();

        assert_eq!(outcome.delta_id, Some(delta_id));
        assert_eq!(outcome.items[0].placeholder, Some(-1));
        assert!(coordinator.log().get(delta_id).unwrap().finalized);
        // No second delta was opened.
        assert_eq!(coordinator.log().len(), 1);
    }

    #[test]
    fn commit_into_rejects_finalized_and_foreign_deltas() {
        let (coordinator, user) = setup();
        let other = coordinator
            .users()
            .register("renee", "pw", "renee@example.com")
            .unwrap();

        let delta_id = coordinator.log().open(Properties::new(), user);
        let batch = Batch::from_items(vec![create_point(0.0, 0.0)]);

        let err = coordinator
            .commit_into(other.id, delta_id, &batch)
            .unwrap_err();
        assert_eq!(err, CoreError::DeltaNotOwned { id: delta_id });

        coordinator.commit_into(user, delta_id, &batch).unwrap();
        let err = coordinator.commit_into(user, delta_id, &batch).unwrap_err();
        assert_eq!(err, CoreError::DeltaFinalized { id: delta_id });
    }

    #[test]
    fn delete_then_modify_same_id_aborts_whole_batch() {
        let (coordinator, user) = setup();
        let outcome = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![create_point(0.0, 0.0)]),
            )
            .unwrap();
        let id = outcome.items[0].id;

        let batch = Batch::from_items(vec![
            BatchItem::delete(id, Version::INITIAL),
            BatchItem::modify(id, Version::INITIAL, Geometry::point(1.0, 1.0), Properties::new()),
        ]);
        let err = coordinator.commit(user, Properties::new(), &batch).unwrap_err();
        assert_eq!(err, CoreError::not_found(id));

        // Nothing was applied: the row survives at its original version.
        assert_eq!(coordinator.store().get(id).unwrap().version, Version::INITIAL);
        assert_eq!(coordinator.log().len(), 1);
    }

    #[test]
    fn recover_rebuilds_the_projection() {
        let (coordinator, user) = setup();

        let first = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![create_point(0.0, 0.0), create_point(1.0, 1.0)]),
            )
            .unwrap();
        let ids: Vec<FeatureId> = first.items.iter().map(|i| i.id).collect();

        coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![BatchItem::modify(
                    ids[0],
                    Version::INITIAL,
                    Geometry::point(5.0, 5.0),
                    shop_props(),
                )]),
            )
            .unwrap();
        coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![BatchItem::delete(ids[1], Version::INITIAL)]),
            )
            .unwrap();

        let before: Vec<Feature> = ids
            .iter()
            .filter_map(|&id| coordinator.store().get(id).ok())
            .collect();

        coordinator.recover().unwrap();

        let after: Vec<Feature> = ids
            .iter()
            .filter_map(|&id| coordinator.store().get(id).ok())
            .collect();
        assert_eq!(before, after);
        assert_eq!(coordinator.store().len(), 1);

        // New creates still get fresh IDs after recovery.
        let outcome = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![create_point(3.0, 3.0)]),
            )
            .unwrap();
        assert!(outcome.items[0].id > ids[1]);
    }

    #[test]
    fn recover_replays_late_finalized_delta_in_commit_order() {
        let (coordinator, user) = setup();

        // A changeset opens first but commits last: the native create it
        // will modify does not exist yet when the changeset is opened.
        let open_delta = coordinator.log().open(Properties::new(), user);

        let created = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![create_point(0.0, 0.0)]),
            )
            .unwrap();
        let id = created.items[0].id;

        coordinator
            .commit_into(
                user,
                open_delta,
                &Batch::from_items(vec![BatchItem::modify(
                    id,
                    Version::INITIAL,
                    Geometry::point(7.0, 7.0),
                    Properties::new(),
                )]),
            )
            .unwrap();

        let before = coordinator.store().get(id).unwrap();
        assert_eq!(before.version, Version::new(2));

        coordinator.recover().unwrap();

        // Replay must apply the modify after the create it followed.
        let after = coordinator.store().get(id).unwrap();
        assert_eq!(after.version, Version::new(2));
        assert_eq!(after.geometry, Geometry::point(7.0, 7.0));
        assert_eq!(after.history, before.history);
    }

    #[test]
    fn overlapping_concurrent_modifies_have_one_winner() {
        let (coordinator, user) = setup();
        let coordinator = Arc::new(coordinator);

        let outcome = coordinator
            .commit(
                user,
                Properties::new(),
                &Batch::from_items(vec![create_point(0.0, 0.0)]),
            )
            .unwrap();
        let id = outcome.items[0].id;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let coordinator = Arc::clone(&coordinator);
                std::thread::spawn(move || {
                    let batch = Batch::from_items(vec![BatchItem::modify(
                        id,
                        Version::INITIAL,
                        Geometry::point(f64::from(i), 0.0),
                        Properties::new(),
                    )]);
                    coordinator.commit(user, Properties::new(), &batch).is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(coordinator.store().get(id).unwrap().version, Version::new(2));
        // The create plus exactly one successful modify.
        assert_eq!(coordinator.log().len(), 2);
    }

    #[test]
    fn concurrent_creates_assign_gapless_ids() {
        let (coordinator, user) = setup();
        let coordinator = Arc::new(coordinator);
        let threads = 8u64;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                std::thread::spawn(move || {
                    coordinator
                        .commit(
                            user,
                            Properties::new(),
                            &Batch::from_items(vec![create_point(1.0, 1.0)]),
                        )
                        .unwrap()
                        .items[0]
                        .id
                        .as_u64()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=threads).collect::<Vec<u64>>());

        let deltas = coordinator.log().list();
        let delta_ids: Vec<u64> = deltas.iter().map(|d| d.id.as_u64()).collect();
        assert_eq!(delta_ids, (1..=threads).collect::<Vec<u64>>());
        let sequences: Vec<Option<u64>> = deltas.iter().map(|d| d.sequence).collect();
        assert_eq!(
            sequences,
            (1..=threads).map(Some).collect::<Vec<Option<u64>>>()
        );
    }
}
