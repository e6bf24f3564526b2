//! ECS wiring for chunk streaming.

use bevy::prelude::*;

use super::controller::{apply_map_teardowns, detect_orphaned_chunks};
use super::maintenance::{MaintenanceMetrics, run_chunk_maintenance};
use super::reconcile::reconcile_chunk_maps;
use super::{ChunkInitialized, ChunkRemoved, TeardownWorldMap};
use crate::config::{GeneratorProfiles, WorldGenConfig};

/// Plugin providing loader-driven chunk streaming.
///
/// Inserts default [`WorldGenConfig`] and [`GeneratorProfiles`] resources
/// unless the app already has them, so configuration loaded elsewhere wins.
/// Consumers spawn a map entity with a [`ChunkMap`](super::ChunkMap), attach
/// [`ChunkLoader`](super::loader::ChunkLoader) components to anchor
/// entities, and react to [`ChunkInitialized`] / [`ChunkRemoved`].
pub struct ChunkWorldPlugin;

impl Plugin for ChunkWorldPlugin {
  fn build(&self, app: &mut App) {
    app
      .init_resource::<WorldGenConfig>()
      .init_resource::<GeneratorProfiles>()
      .init_resource::<MaintenanceMetrics>()
      .add_message::<ChunkInitialized>()
      .add_message::<ChunkRemoved>()
      .add_message::<TeardownWorldMap>();

    app.add_systems(
      Update,
      (
        // Lifecycle group: teardown requests and orphan detection run before
        // reconciliation so a dying map never gets new work scheduled
        (detect_orphaned_chunks, apply_map_teardowns).chain(),
        // Streaming group
        (reconcile_chunk_maps, run_chunk_maintenance).chain(),
      )
        .chain(),
    );
  }
}
