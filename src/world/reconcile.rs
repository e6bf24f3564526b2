//! Loader-driven reconciliation.
//!
//! Every pass recomputes, per map, the set of chunk coordinates the map's
//! loaders currently require, diffs it against the loaded set and the
//! pending queue, and schedules the difference. The pass only ever touches
//! the queue; actual chunk creation and destruction happen in the
//! maintenance pass, under its time budget.
//!
//! Reconciliation is self-correcting: a task that went stale because a
//! loader moved (or despawned) between passes is flipped or cancelled here
//! before maintenance can execute it.

use std::collections::HashSet;

use bevy::prelude::*;

use super::loader::{ChunkLoader, OnMap};
use super::{ChunkMap, TaskKind};
use crate::config::WorldGenConfig;
use crate::coords::ChunkPos;

/// Union of the Chebyshev squares covered by a set of loader samples.
///
/// Each `(center, radius)` sample contributes the `(2r + 1)`-sided square
/// of chunk coordinates around its center. Samples with a non-positive
/// radius contribute nothing.
pub(crate) fn required_set(samples: &[(ChunkPos, i32)]) -> HashSet<ChunkPos> {
  let mut required = HashSet::new();
  for &(center, radius) in samples {
    if radius <= 0 {
      continue;
    }
    for dy in -radius..=radius {
      for dx in -radius..=radius {
        required.insert(ChunkPos::new(center.x + dx, center.y + dy));
      }
    }
  }
  required
}

/// System: Diffs loader coverage against loaded chunks and schedules work.
///
/// Skipped entirely while world generation is disabled: nothing new is
/// scheduled and chunks already loaded persist.
///
/// Loaders without a [`GlobalTransform`] have no position to sample and are
/// skipped; the rest of the map's loaders still count.
pub(crate) fn reconcile_chunk_maps(
  config: Res<WorldGenConfig>,
  mut maps: Query<(Entity, &mut ChunkMap)>,
  loaders: Query<(Entity, &ChunkLoader, &OnMap, Option<&GlobalTransform>)>,
) {
  if !config.enabled {
    return;
  }

  for (map_entity, mut chunk_map) in maps.iter_mut() {
    let mut samples = Vec::new();
    for (loader_entity, loader, on_map, transform) in loaders.iter() {
      if on_map.0 != map_entity {
        continue;
      }
      let Some(transform) = transform else {
        warn!("Loader {loader_entity:?} has no GlobalTransform, skipping");
        continue;
      };
      let center = ChunkPos::from_world(transform.translation().truncate());
      samples.push((center, loader.radius));
    }

    let required = required_set(&samples);

    // Required but absent: activate. Covers flipping a stale deactivation
    // for a coordinate a loader moved back onto before it unloaded.
    for &pos in &required {
      if chunk_map.chunk_at(pos).is_none() {
        if chunk_map.pending_kind(pos) != Some(TaskKind::Activate) {
          chunk_map.enqueue(pos, TaskKind::Activate);
        }
      } else if chunk_map.pending_kind(pos) == Some(TaskKind::Deactivate) {
        // Loaded and still required: the pending unload is stale
        chunk_map.cancel(pos);
      }
    }

    // Loaded but no longer required: deactivate
    let to_unload: Vec<ChunkPos> = chunk_map
      .loaded_chunks()
      .map(|(pos, _)| pos)
      .filter(|pos| !required.contains(pos))
      .collect();
    for pos in to_unload {
      if chunk_map.pending_kind(pos) != Some(TaskKind::Deactivate) {
        chunk_map.enqueue(pos, TaskKind::Deactivate);
      }
    }

    // Pending activations for coordinates nobody requires anymore
    let stale: Vec<ChunkPos> = chunk_map
      .pending_positions()
      .filter(|(pos, kind)| {
        *kind == TaskKind::Activate
          && !required.contains(pos)
          && chunk_map.chunk_at(*pos).is_none()
      })
      .map(|(pos, _)| pos)
      .collect();
    for pos in stale {
      chunk_map.cancel(pos);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn radius_one_covers_a_three_by_three_square() {
    let required = required_set(&[(ChunkPos::new(0, 0), 1)]);
    assert_eq!(required.len(), 9);
    for dy in -1..=1 {
      for dx in -1..=1 {
        assert!(required.contains(&ChunkPos::new(dx, dy)));
      }
    }
  }

  #[test]
  fn overlapping_loaders_union_without_double_counting() {
    // Two radius-1 squares one chunk apart share a 3x2 strip
    let required = required_set(&[(ChunkPos::new(0, 0), 1), (ChunkPos::new(1, 0), 1)]);
    assert_eq!(required.len(), 12);
    assert!(required.contains(&ChunkPos::new(-1, -1)));
    assert!(required.contains(&ChunkPos::new(2, 1)));
  }

  #[test]
  fn non_positive_radius_requires_nothing() {
    assert!(required_set(&[(ChunkPos::new(5, 5), 0)]).is_empty());
    assert!(required_set(&[(ChunkPos::new(5, 5), -3)]).is_empty());
  }

  #[test]
  fn offset_center_shifts_the_square() {
    let required = required_set(&[(ChunkPos::new(-4, 7), 2)]);
    assert_eq!(required.len(), 25);
    assert!(required.contains(&ChunkPos::new(-6, 5)));
    assert!(required.contains(&ChunkPos::new(-2, 9)));
    assert!(!required.contains(&ChunkPos::new(-7, 7)));
  }
}
