//! Per-map chunk index, lifecycle messages, and the pending-work queue.
//!
//! A "map" is any entity carrying a [`ChunkMap`]. The map owns the mapping
//! from chunk coordinates to chunk entities, its noise index, and the queue
//! of activation/deactivation work awaiting the maintenance pass.
//!
//! Sub-modules split the streaming machinery by responsibility:
//! - [`controller`] — chunk creation/destruction and map teardown
//! - [`loader`] — the loader components read during reconciliation
//! - [`reconcile`] — required-set computation and work scheduling
//! - [`maintenance`] — the time-boxed queue drain
//! - [`plugin`] — ECS wiring

pub mod controller;
pub mod loader;
pub mod maintenance;
pub mod plugin;
pub mod reconcile;

use std::collections::{HashMap, VecDeque};

use bevy::prelude::*;

use crate::config::{GeneratorProfile, GeneratorProfiles, WorldGenConfig};
use crate::coords::ChunkPos;
use crate::noise_index::NoiseIndex;

/// Back-reference from a chunk entity to its owning map entity.
///
/// Immutable after spawn, like the chunk's [`ChunkPos`].
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkOf(pub Entity);

/// Message fired once per chunk, after the chunk is registered in its map's
/// index and before the creating operation returns.
///
/// Population systems (blueprint placement, terrain fill) subscribe here and
/// write their content exactly once per chunk.
#[derive(Message, Clone, Copy, Debug)]
pub struct ChunkInitialized {
  pub map: Entity,
  pub pos: ChunkPos,
  pub chunk: Entity,
}

/// Message fired when a chunk is deregistered and queued for despawn.
///
/// Carries the coordinate and entity id so dependents can clear per-chunk
/// side tables. The despawn itself is a deferred command, so do not rely on
/// the entity still being alive when the message is read.
#[derive(Message, Clone, Copy, Debug)]
pub struct ChunkRemoved {
  pub map: Entity,
  pub pos: ChunkPos,
  pub chunk: Entity,
}

/// Request to tear down a map: every chunk is destroyed (each emitting
/// [`ChunkRemoved`]) and the map entity is despawned.
#[derive(Message, Clone, Copy, Debug)]
pub struct TeardownWorldMap {
  pub map: Entity,
}

/// Kind of work pending for a chunk coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskKind {
  Activate,
  Deactivate,
}

/// Per-map chunk streaming state.
///
/// Owns the chunk index (coordinate -> chunk entity), the pending-work
/// queue, and the map's noise index. Mutated only by the reconciliation and
/// maintenance systems on the main schedule; consumers query chunk
/// existence through [`ChunkMap::chunk_at`] rather than caching entities
/// past a [`ChunkRemoved`] notification.
#[derive(Component)]
pub struct ChunkMap {
  index: HashMap<ChunkPos, Entity>,
  /// FIFO of coordinates with pending work. The authoritative task kind
  /// lives in `pending`; a queue entry whose coordinate is no longer in
  /// `pending` has been cancelled and is skipped on pop.
  queue: VecDeque<ChunkPos>,
  pending: HashMap<ChunkPos, TaskKind>,
  noise: NoiseIndex,
  seed: u64,
}

impl ChunkMap {
  /// Creates an empty map with the given world seed and generator profile.
  pub fn new(seed: u64, profile: &GeneratorProfile) -> Self {
    Self {
      index: HashMap::new(),
      queue: VecDeque::new(),
      pending: HashMap::new(),
      noise: NoiseIndex::new(seed, profile.generators.clone()),
      seed,
    }
  }

  /// Creates an empty map using the profile named by the configuration.
  ///
  /// This is the standard construction path for apps driven by TOML config:
  /// `config.profile` selects the prototype set out of `profiles`, falling
  /// back to the built-in default when the name is unknown.
  pub fn from_config(config: &WorldGenConfig, profiles: &GeneratorProfiles, seed: u64) -> Self {
    Self::new(seed, &profiles.get(&config.profile))
  }

  /// The map's world seed.
  pub fn seed(&self) -> u64 {
    self.seed
  }

  /// Returns the chunk entity at a coordinate, if one is loaded.
  pub fn chunk_at(&self, pos: ChunkPos) -> Option<Entity> {
    self.index.get(&pos).copied()
  }

  /// Iterates over loaded chunks as `(coordinate, entity)` pairs.
  pub fn loaded_chunks(&self) -> impl Iterator<Item = (ChunkPos, Entity)> + '_ {
    self.index.iter().map(|(pos, entity)| (*pos, *entity))
  }

  /// Number of loaded chunks.
  pub fn chunk_count(&self) -> usize {
    self.index.len()
  }

  /// Mutable access to the map's noise index.
  pub fn noise_mut(&mut self) -> &mut NoiseIndex {
    &mut self.noise
  }

  /// Number of coordinates with pending activation/deactivation work.
  pub fn pending_len(&self) -> usize {
    self.pending.len()
  }

  /// The pending task kind for a coordinate, if any.
  pub(crate) fn pending_kind(&self, pos: ChunkPos) -> Option<TaskKind> {
    self.pending.get(&pos).copied()
  }

  /// Schedules work for a coordinate.
  ///
  /// At most one queue entry exists per coordinate: scheduling the opposite
  /// kind flips the pending entry in place, which cancels the earlier task
  /// without touching the queue. Re-scheduling the same kind is a no-op.
  pub(crate) fn enqueue(&mut self, pos: ChunkPos, kind: TaskKind) {
    match self.pending.insert(pos, kind) {
      // Coordinate was not queued yet
      None => self.queue.push_back(pos),
      // Already queued; the kind in `pending` is now authoritative
      Some(_) => {}
    }
  }

  /// Cancels pending work for a coordinate, if any.
  ///
  /// The queue entry (if one exists) goes stale and is skipped on pop.
  pub(crate) fn cancel(&mut self, pos: ChunkPos) {
    self.pending.remove(&pos);
  }

  /// Coordinates with pending work, in no particular order.
  pub(crate) fn pending_positions(&self) -> impl Iterator<Item = (ChunkPos, TaskKind)> + '_ {
    self.pending.iter().map(|(pos, kind)| (*pos, *kind))
  }

  /// Pops the next live task, skipping entries cancelled since enqueue.
  pub(crate) fn pop_task(&mut self) -> Option<(ChunkPos, TaskKind)> {
    while let Some(pos) = self.queue.pop_front() {
      if let Some(kind) = self.pending.remove(&pos) {
        return Some((pos, kind));
      }
      // Stale entry: work for this coordinate was cancelled
    }
    None
  }

  pub(crate) fn register_chunk(&mut self, pos: ChunkPos, entity: Entity) {
    let previous = self.index.insert(pos, entity);
    debug_assert!(
      previous.is_none(),
      "duplicate chunk registered at {pos:?}: {previous:?} replaced by {entity:?}"
    );
  }

  pub(crate) fn deregister_chunk(&mut self, pos: ChunkPos) -> Option<Entity> {
    self.index.remove(&pos)
  }

  pub(crate) fn clear(&mut self) {
    self.index.clear();
    self.queue.clear();
    self.pending.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::GeneratorProfile;
  use crate::noise_index::GeneratorPrototype;

  fn empty_map() -> ChunkMap {
    ChunkMap::new(42, &GeneratorProfile::default())
  }

  #[test]
  fn from_config_resolves_the_configured_profile() {
    let mut generators = HashMap::new();
    generators.insert(
      "terrain_height".to_string(),
      GeneratorPrototype {
        frequency: 0.09,
        ..GeneratorPrototype::default()
      },
    );
    let mut profiles = GeneratorProfiles::default();
    profiles
      .profiles
      .insert("islands".to_string(), GeneratorProfile { generators });

    let islands_config = WorldGenConfig {
      profile: "islands".to_string(),
      ..WorldGenConfig::default()
    };
    let mut islands = ChunkMap::from_config(&islands_config, &profiles, 42);
    let mut plains = ChunkMap::from_config(&WorldGenConfig::default(), &profiles, 42);

    // Same seed and id, different prototype parameters per profile
    let a = islands.noise_mut().get("terrain_height");
    let b = plains.noise_mut().get("terrain_height");
    let differs = (1..16).any(|i| {
      let x = i as f64 * 7.3;
      a.sample(x, -x) != b.sample(x, -x)
    });
    assert!(differs);
  }

  #[test]
  fn enqueue_is_deduplicated_per_coordinate() {
    let mut map = empty_map();
    let pos = ChunkPos::new(1, 1);

    map.enqueue(pos, TaskKind::Activate);
    map.enqueue(pos, TaskKind::Activate);
    assert_eq!(map.pending_len(), 1);

    assert_eq!(map.pop_task(), Some((pos, TaskKind::Activate)));
    assert_eq!(map.pop_task(), None);
  }

  #[test]
  fn opposite_kind_flips_pending_work_in_place() {
    let mut map = empty_map();
    let pos = ChunkPos::new(0, 0);

    map.enqueue(pos, TaskKind::Activate);
    map.enqueue(pos, TaskKind::Deactivate);

    // Never both pending for one coordinate: the later kind wins
    assert_eq!(map.pending_len(), 1);
    assert_eq!(map.pop_task(), Some((pos, TaskKind::Deactivate)));
    assert_eq!(map.pop_task(), None);
  }

  #[test]
  fn pop_preserves_fifo_order_across_coordinates() {
    let mut map = empty_map();
    let first = ChunkPos::new(0, 0);
    let second = ChunkPos::new(1, 0);

    map.enqueue(first, TaskKind::Activate);
    map.enqueue(second, TaskKind::Activate);
    // Flipping the first coordinate must not move it to the back
    map.enqueue(first, TaskKind::Deactivate);

    assert_eq!(map.pop_task(), Some((first, TaskKind::Deactivate)));
    assert_eq!(map.pop_task(), Some((second, TaskKind::Activate)));
  }

  #[test]
  fn cancelled_tasks_are_skipped_on_pop() {
    let mut map = empty_map();
    let first = ChunkPos::new(0, 0);
    let second = ChunkPos::new(1, 0);

    map.enqueue(first, TaskKind::Activate);
    map.enqueue(second, TaskKind::Activate);
    map.cancel(first);

    assert_eq!(map.pending_len(), 1);
    assert_eq!(map.pop_task(), Some((second, TaskKind::Activate)));
    assert_eq!(map.pop_task(), None);
  }

  #[test]
  fn register_and_deregister_round_trip() {
    let mut map = empty_map();
    let pos = ChunkPos::new(3, -2);
    let mut world = World::new();
    let entity = world.spawn_empty().id();

    map.register_chunk(pos, entity);
    assert_eq!(map.chunk_at(pos), Some(entity));
    assert_eq!(map.chunk_count(), 1);

    assert_eq!(map.deregister_chunk(pos), Some(entity));
    assert_eq!(map.chunk_at(pos), None);
    // Double deregister is a no-op
    assert_eq!(map.deregister_chunk(pos), None);
  }
}
