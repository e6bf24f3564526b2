//! Chunk World - Infinite loader-driven chunk streaming plugin for Bevy.
//!
//! This crate keeps a finite window of a conceptually infinite 2D chunk
//! grid loaded around "loader" entities. Each tick, loader positions are
//! reconciled against the loaded set and the difference is worked off under
//! a per-tick time budget. Chunk content is left to consumers, who react to
//! [`ChunkInitialized`] / [`ChunkRemoved`] and pull deterministic noise
//! generators from each map's [`NoiseIndex`].

pub mod config;
pub mod coords;
pub mod noise_index;
pub mod world;

pub use config::{GeneratorProfile, GeneratorProfiles, WorldGenConfig};
pub use coords::{CHUNK_SIZE, ChunkPos, DEFAULT_LOAD_RADIUS};
pub use noise_index::{
  GeneratorHandle, GeneratorPrototype, NoiseAlgorithm, NoiseIndex, derive_seed,
  sample_chunk_field,
};
pub use world::controller::{destroy_chunk, get_or_create_chunk};
pub use world::loader::{ChunkLoader, OnMap};
pub use world::maintenance::MaintenanceMetrics;
pub use world::plugin::ChunkWorldPlugin;
pub use world::{ChunkInitialized, ChunkMap, ChunkOf, ChunkRemoved, TeardownWorldMap};
