//! Time-boxed queue drain.
//!
//! Reconciliation only schedules work; this pass executes it. Each tick it
//! drains every map's queue under a shared millisecond budget so a burst of
//! loader movement cannot stall the frame. The budget is a soft cap checked
//! between tasks, and each map with pending work makes progress on at least
//! one task per tick regardless of the budget, so the queue always drains
//! eventually.

use std::time::Duration;

use bevy::ecs::message::MessageWriter;
use bevy::prelude::*;
use web_time::Instant;

use super::controller::{destroy_chunk, get_or_create_chunk};
use super::{ChunkInitialized, ChunkMap, ChunkRemoved, TaskKind};
use crate::config::WorldGenConfig;

/// Counters for streaming throughput, updated by the maintenance pass.
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct MaintenanceMetrics {
  /// Total tasks executed since startup.
  pub tasks_run: u64,
  /// Total chunk activations since startup.
  pub chunks_activated: u64,
  /// Total chunk deactivations since startup.
  pub chunks_deactivated: u64,
  /// Tasks executed on the most recent tick.
  pub last_tick_tasks: u32,
}

/// System: Executes pending activation/deactivation tasks under the budget.
pub(crate) fn run_chunk_maintenance(
  config: Res<WorldGenConfig>,
  mut metrics: ResMut<MaintenanceMetrics>,
  mut maps: Query<(Entity, &mut ChunkMap)>,
  mut commands: Commands,
  mut initialized: MessageWriter<ChunkInitialized>,
  mut removed: MessageWriter<ChunkRemoved>,
) {
  metrics.last_tick_tasks = 0;
  if !config.enabled {
    return;
  }

  let budget = Duration::from_millis(config.maintenance_budget_ms);
  let start = Instant::now();

  for (map_entity, mut chunk_map) in maps.iter_mut() {
    let mut did_one = false;
    loop {
      // Budget check comes after the first task so every map progresses
      // even under a zero budget
      if did_one && start.elapsed() >= budget {
        debug!(
          "Maintenance budget exhausted with {} tasks pending on {map_entity:?}",
          chunk_map.pending_len()
        );
        break;
      }
      let Some((pos, kind)) = chunk_map.pop_task() else {
        break;
      };

      match kind {
        TaskKind::Activate => {
          get_or_create_chunk(map_entity, &mut chunk_map, pos, &mut commands, &mut initialized);
          metrics.chunks_activated += 1;
        }
        TaskKind::Deactivate => {
          destroy_chunk(map_entity, &mut chunk_map, pos, &mut commands, &mut removed);
          metrics.chunks_deactivated += 1;
        }
      }
      metrics.tasks_run += 1;
      metrics.last_tick_tasks += 1;
      did_one = true;
    }
  }
}
