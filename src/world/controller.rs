//! Chunk creation, destruction, and map teardown.
//!
//! These are the only code paths that mutate a map's chunk index, which is
//! what upholds the uniqueness invariant: at most one live chunk entity per
//! `(map, coordinate)`. Both operations are idempotent so the maintenance
//! pass can safely reprocess tasks that raced with loader movement.

use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::ecs::lifecycle::RemovedComponents;
use bevy::prelude::*;

use super::{ChunkInitialized, ChunkMap, ChunkOf, ChunkRemoved, TeardownWorldMap};
use crate::coords::ChunkPos;

/// Returns the chunk at `pos`, creating it if absent.
///
/// On creation the chunk entity is spawned with its coordinate and map
/// back-reference, registered in the index, and announced via
/// [`ChunkInitialized`] before this returns — population systems observe
/// every chunk exactly once. Calling this twice for one coordinate returns
/// the same entity both times.
pub fn get_or_create_chunk(
  map: Entity,
  chunk_map: &mut ChunkMap,
  pos: ChunkPos,
  commands: &mut Commands,
  initialized: &mut MessageWriter<ChunkInitialized>,
) -> Entity {
  if let Some(existing) = chunk_map.chunk_at(pos) {
    return existing;
  }

  let chunk = commands.spawn((pos, ChunkOf(map))).id();
  chunk_map.register_chunk(pos, chunk);
  initialized.write(ChunkInitialized { map, pos, chunk });
  chunk
}

/// Destroys the chunk at `pos`, if one exists.
///
/// [`ChunkRemoved`] is written before the index entry is dropped; the
/// message carries the coordinate and entity id for side-table cleanup,
/// while the despawn itself is deferred to the next command flush. A
/// missing chunk is a no-op (returns false): deactivation tasks tolerate
/// racing with teardown or earlier destruction.
pub fn destroy_chunk(
  map: Entity,
  chunk_map: &mut ChunkMap,
  pos: ChunkPos,
  commands: &mut Commands,
  removed: &mut MessageWriter<ChunkRemoved>,
) -> bool {
  let Some(chunk) = chunk_map.chunk_at(pos) else {
    return false;
  };

  removed.write(ChunkRemoved { map, pos, chunk });
  chunk_map.deregister_chunk(pos);
  commands.entity(chunk).despawn();
  true
}

/// System: Tears down maps requested via [`TeardownWorldMap`].
///
/// Every chunk is destroyed (each emitting [`ChunkRemoved`]) before the
/// index is discarded, then the map entity itself is despawned. This is the
/// sanctioned way to destroy a map with live chunks.
pub(crate) fn apply_map_teardowns(
  mut requests: MessageReader<TeardownWorldMap>,
  mut maps: Query<&mut ChunkMap>,
  mut commands: Commands,
  mut removed: MessageWriter<ChunkRemoved>,
) {
  for request in requests.read() {
    let Ok(mut chunk_map) = maps.get_mut(request.map) else {
      warn!("Teardown requested for {:?}, which has no ChunkMap", request.map);
      continue;
    };

    let chunks: Vec<_> = chunk_map.loaded_chunks().collect();
    info!(
      "Tearing down map {:?} with {} chunks",
      request.map,
      chunks.len()
    );
    for (pos, _) in chunks {
      destroy_chunk(request.map, &mut chunk_map, pos, &mut commands, &mut removed);
    }
    chunk_map.clear();
    commands.entity(request.map).despawn();
  }
}

/// System: Force-cleans chunks whose map was despawned without teardown.
///
/// Despawning a map entity directly, bypassing [`TeardownWorldMap`], leaks
/// its chunk entities. That is an invariant violation (fatal in debug
/// builds); in release the orphans are logged and destroyed so the world
/// does not accumulate dead chunks.
pub(crate) fn detect_orphaned_chunks(
  mut removed_maps: RemovedComponents<ChunkMap>,
  chunks: Query<(Entity, &ChunkOf, &ChunkPos)>,
  mut commands: Commands,
  mut removed: MessageWriter<ChunkRemoved>,
) {
  let dead_maps: Vec<Entity> = removed_maps.read().collect();
  if dead_maps.is_empty() {
    return;
  }

  let mut orphans = 0usize;
  for (chunk, owner, pos) in chunks.iter() {
    if dead_maps.contains(&owner.0) {
      orphans += 1;
      removed.write(ChunkRemoved {
        map: owner.0,
        pos: *pos,
        chunk,
      });
      commands.entity(chunk).despawn();
    }
  }

  if orphans > 0 {
    error!("{orphans} chunks orphaned by map despawn without teardown; forcing cleanup");
    debug_assert!(false, "map despawned with {orphans} live chunks; use TeardownWorldMap");
  }
}
