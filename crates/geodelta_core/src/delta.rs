//! Append-only delta log.

use crate::batch::Action;
use crate::error::{CoreError, CoreResult};
use crate::feature::Properties;
use crate::geometry::Geometry;
use crate::types::{DeltaId, FeatureId, UserId, Version};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One feature as recorded inside a delta's snapshot.
///
/// Snapshot entries carry everything needed to replay the operation:
/// the final ID, the resulting version (absent for deletes), and the
/// geometry/properties that were written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// The action that was committed.
    pub action: Action,
    /// The feature's final (assigned) ID.
    pub id: FeatureId,
    /// The resulting version; `None` for deletes.
    pub version: Option<Version>,
    /// The geometry that was written; `None` for deletes.
    pub geometry: Option<Geometry>,
    /// The properties that were written; `None` for deletes.
    pub properties: Option<Properties>,
}

/// Free-form delta metadata (attribution, comment fields, ...).
pub type DeltaMetadata = Properties;

/// One atomically committed changeset.
///
/// Immutable once `finalized` is true; the only permitted transition is the
/// legacy protocol's open → finalized step, performed through
/// [`DeltaLog::finalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Identity, assigned when the delta enters the log.
    pub id: DeltaId,
    /// Commit-order position, assigned under the commit lock when the delta
    /// finalizes. `None` while a legacy changeset is still open. An open
    /// changeset can be overtaken by later commits, so this is what orders
    /// the log, not `id`.
    #[serde(default)]
    pub sequence: Option<u64>,
    /// Exactly the features included in this transaction.
    pub snapshot: Vec<SnapshotEntry>,
    /// Sorted, de-duplicated feature IDs touched, serialized as strings.
    #[serde(with = "affected_as_strings")]
    pub affected: Vec<FeatureId>,
    /// Free-form metadata.
    pub metadata: DeltaMetadata,
    /// The committing user.
    pub author: UserId,
    /// True once durably committed.
    pub finalized: bool,
}

/// Serializes the affected set as decimal strings, matching the wire and
/// storage representation of the delta record.
mod affected_as_strings {
    use super::FeatureId;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ids: &[FeatureId], ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_seq(ids.iter().map(|id| id.as_u64().to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<FeatureId>, D::Error> {
        let raw = Vec::<String>::deserialize(de)?;
        raw.into_iter()
            .map(|s| {
                s.parse::<u64>()
                    .map(FeatureId::new)
                    .map_err(|_| D::Error::custom(format!("invalid feature id: {s}")))
            })
            .collect()
    }
}

/// The append-only record of every committed transaction.
///
/// Deltas are never mutated or removed by later transactions. The log is the
/// source of truth for history; the feature store is a projection derived
/// from it.
pub struct DeltaLog {
    state: RwLock<LogState>,
}

/// Delta records in id order plus the next commit-order position.
/// Kept behind one lock so a finalize assigns its sequence atomically.
struct LogState {
    deltas: Vec<Delta>,
    next_sequence: u64,
}

impl DeltaLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LogState {
                deltas: Vec::new(),
                next_sequence: 1,
            }),
        }
    }

    /// Appends a finalized delta, assigning the next ID and the next
    /// commit-order position.
    ///
    /// Atomicity with the caller's feature-store writes comes from the
    /// coordinator's commit lock, which is held across both.
    pub fn append(
        &self,
        snapshot: Vec<SnapshotEntry>,
        affected: Vec<FeatureId>,
        metadata: DeltaMetadata,
        author: UserId,
    ) -> DeltaId {
        let mut state = self.state.write();
        let id = DeltaId::new(state.deltas.len() as u64 + 1);
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.deltas.push(Delta {
            id,
            sequence: Some(sequence),
            snapshot,
            affected,
            metadata,
            author,
            finalized: true,
        });
        id
    }

    /// Opens a not-yet-finalized delta with an empty snapshot.
    ///
    /// This is the legacy protocol's changeset-create step; the delta is
    /// later populated and closed with [`DeltaLog::finalize`]. Its
    /// commit-order position stays unassigned until then, so commits that
    /// land while the changeset is open order ahead of it.
    pub fn open(&self, metadata: DeltaMetadata, author: UserId) -> DeltaId {
        let mut state = self.state.write();
        let id = DeltaId::new(state.deltas.len() as u64 + 1);
        state.deltas.push(Delta {
            id,
            sequence: None,
            snapshot: Vec::new(),
            affected: Vec::new(),
            metadata,
            author,
            finalized: false,
        });
        id
    }

    /// Returns the delta with the given ID.
    pub fn get(&self, id: DeltaId) -> CoreResult<Delta> {
        let state = self.state.read();
        let index = id.as_u64().checked_sub(1).map(|i| i as usize);
        index
            .and_then(|i| state.deltas.get(i))
            .cloned()
            .ok_or(CoreError::DeltaNotFound { id })
    }

    /// Returns all deltas in commit order.
    ///
    /// Finalized deltas come first, ordered by when they committed; still
    /// open changesets trail in the order they were opened. The result is a
    /// snapshot materialized at call time.
    #[must_use]
    pub fn list(&self) -> Vec<Delta> {
        let mut deltas = self.state.read().deltas.clone();
        deltas.sort_by_key(|d| (d.sequence.unwrap_or(u64::MAX), d.id));
        deltas
    }

    /// Finalizes an open delta, populating its snapshot and affected set
    /// and assigning its commit-order position.
    ///
    /// Rejects unknown and already-finalized deltas. Once this returns, the
    /// delta is immutable.
    pub fn finalize(
        &self,
        id: DeltaId,
        snapshot: Vec<SnapshotEntry>,
        affected: Vec<FeatureId>,
    ) -> CoreResult<()> {
        let mut state = self.state.write();
        let index = id
            .as_u64()
            .checked_sub(1)
            .map(|i| i as usize)
            .filter(|&i| i < state.deltas.len())
            .ok_or(CoreError::DeltaNotFound { id })?;

        if state.deltas[index].finalized {
            return Err(CoreError::DeltaFinalized { id });
        }
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let delta = &mut state.deltas[index];
        delta.sequence = Some(sequence);
        delta.snapshot = snapshot;
        delta.affected = affected;
        delta.finalized = true;
        Ok(())
    }

    /// Returns the number of recorded deltas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().deltas.len()
    }

    /// Returns true if no delta has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().deltas.is_empty()
    }
}

impl Default for DeltaLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeltaLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaLog")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
