//! Loader components.
//!
//! A loader is an attribute on any entity (usually a player or another
//! "active" anchor) advertising that the world within some radius of it
//! must stay loaded. Loaders hold no further state: the reconciliation
//! system re-reads the full loader set every pass, so attaching or
//! detaching the component is all it takes to start or stop loading.

use bevy::prelude::*;

use crate::config::WorldGenConfig;
use crate::coords::{CHUNK_SIZE, DEFAULT_LOAD_RADIUS};

/// Keeps chunks within `radius` loaded around this entity's position.
///
/// The radius is measured in chunk units using Chebyshev distance, so a
/// loader covers a `(2r + 1)`-sided square of chunks. A radius of zero or
/// below requires no chunks at all.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkLoader {
  pub radius: i32,
}

impl ChunkLoader {
  /// Creates a loader with a radius in chunk units.
  pub const fn new(radius: i32) -> Self {
    Self { radius }
  }

  /// Creates a loader from a radius in world units (floored to chunks).
  pub const fn from_world_radius(world_units: u32) -> Self {
    Self {
      radius: (world_units / CHUNK_SIZE) as i32,
    }
  }

  /// Creates a loader with the radius configured in [`WorldGenConfig`].
  ///
  /// Use this instead of [`Default`] when the app carries TOML config, so a
  /// `loader_radius` override actually reaches new loaders.
  pub fn from_config(config: &WorldGenConfig) -> Self {
    Self {
      radius: config.loader_radius_chunks(),
    }
  }
}

impl Default for ChunkLoader {
  fn default() -> Self {
    Self::from_world_radius(DEFAULT_LOAD_RADIUS)
  }
}

/// Names the map a loader belongs to.
///
/// Loaders only keep chunks alive on their own map; the reconciliation
/// pass groups loaders by this target.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct OnMap(pub Entity);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_radius_comes_from_world_units() {
    // 128 world units / 32 units per chunk
    assert_eq!(ChunkLoader::default().radius, 4);
  }

  #[test]
  fn configured_radius_overrides_the_builtin_default() {
    let config = WorldGenConfig {
      loader_radius: 256,
      ..WorldGenConfig::default()
    };
    assert_eq!(ChunkLoader::from_config(&config).radius, 8);
    assert_ne!(
      ChunkLoader::from_config(&config).radius,
      ChunkLoader::default().radius
    );
  }

  #[test]
  fn world_radius_is_floored() {
    assert_eq!(ChunkLoader::from_world_radius(31).radius, 0);
    assert_eq!(ChunkLoader::from_world_radius(32).radius, 1);
    assert_eq!(ChunkLoader::from_world_radius(95).radius, 2);
  }
}
