//! Coordinate types and spatial constants.
//!
//! Defines the coordinate system for the streamed world:
//! - World space: continuous positions (Bevy transforms, `Vec2`)
//! - Chunk space: the integer chunk grid ([`ChunkPos`])
//!
//! One chunk spans [`CHUNK_SIZE`] world units per axis. World positions map
//! to chunk positions by dividing and flooring per axis, so negative
//! coordinates land in the correct chunk (world x = -1 is chunk -1, not 0).

use bevy::prelude::*;

/// Size of a chunk in world units (width and height).
pub const CHUNK_SIZE: u32 = 32;

/// Default loader radius in world units.
///
/// Converted to chunk units by flooring ([`ChunkLoader`](crate::ChunkLoader)
/// radii are measured in chunks).
pub const DEFAULT_LOAD_RADIUS: u32 = 128;

/// Position in the chunk grid.
///
/// Attached as a component to chunk entities; also used as the key of the
/// per-map chunk index. Value equality, hashable.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkPos {
  pub x: i32,
  pub y: i32,
}

impl ChunkPos {
  /// Creates a new chunk position.
  pub const fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }

  /// Converts a continuous world position to the containing chunk.
  ///
  /// Floors per axis so the chunk grid is stable across the origin.
  pub fn from_world(pos: Vec2) -> Self {
    let size = CHUNK_SIZE as f32;
    Self {
      x: (pos.x / size).floor() as i32,
      y: (pos.y / size).floor() as i32,
    }
  }

  /// Returns the world position of this chunk's lower-left corner.
  pub fn to_world(self) -> Vec2 {
    let size = CHUNK_SIZE as f32;
    Vec2::new(self.x as f32 * size, self.y as f32 * size)
  }

  /// Chebyshev distance to another chunk position.
  ///
  /// This is the coverage metric used by loaders: a loader of radius `r`
  /// keeps the square of chunks within Chebyshev distance `r` alive.
  pub fn chebyshev(self, other: ChunkPos) -> i32 {
    (self.x - other.x).abs().max((self.y - other.y).abs())
  }
}
