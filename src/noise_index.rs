//! Noise generator cache (the "noise index").
//!
//! Chunk population is driven by deterministic coherent noise. Generators
//! are expensive enough to construct (permutation tables) that rebuilding
//! one per sample would dominate chunk creation, so each map owns a
//! [`NoiseIndex`]: a lazy cache from generator-prototype id to a shared,
//! immutable sampler. Entries never expire for the life of the index.
//!
//! Determinism contract: a sampler's seed is derived from the prototype id
//! and the map's world seed by a fixed FNV-1a hash, so the same map seed
//! always yields the same world, across runs and across machines.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::prelude::*;
use noise::{NoiseFn, OpenSimplex};
use rayon::prelude::*;
use serde::Deserialize;

use crate::coords::{CHUNK_SIZE, ChunkPos};

/// Noise algorithm selector for a generator prototype.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseAlgorithm {
  /// Fractal Brownian motion over OpenSimplex octaves.
  #[default]
  Fbm,
  /// A single OpenSimplex octave.
  Simplex,
  /// Ridged multifractal (inverted absolute octaves), for cave/vein shapes.
  Ridged,
}

/// Parameters describing one procedural noise function.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GeneratorPrototype {
  pub algorithm: NoiseAlgorithm,
  /// Input scale: world units are multiplied by this before sampling.
  pub frequency: f64,
  /// Octave count for fractal algorithms; ignored by `Simplex`.
  pub octaves: u32,
  /// Per-octave frequency multiplier.
  pub lacunarity: f64,
  /// Per-octave amplitude multiplier.
  pub persistence: f64,
}

impl Default for GeneratorPrototype {
  fn default() -> Self {
    Self {
      algorithm: NoiseAlgorithm::Fbm,
      frequency: 0.01,
      octaves: 4,
      lacunarity: 2.0,
      persistence: 0.5,
    }
  }
}

/// Shared handle to an initialized noise generator.
///
/// Cheap to clone; sampling is read-only and safe to call from multiple
/// threads concurrently.
#[derive(Clone)]
pub struct GeneratorHandle(Arc<Sampler>);

struct Sampler {
  noise: OpenSimplex,
  prototype: GeneratorPrototype,
}

impl GeneratorHandle {
  fn build(prototype: GeneratorPrototype, seed: u32) -> Self {
    Self(Arc::new(Sampler {
      noise: OpenSimplex::new(seed),
      prototype,
    }))
  }

  /// Samples the generator at a world coordinate.
  ///
  /// Pure function of `(handle, x, y)`: no shared state is mutated, output
  /// is in approximately `[-1.0, 1.0]`.
  pub fn sample(&self, x: f64, y: f64) -> f64 {
    let s = &self.0;
    let p = &s.prototype;
    match p.algorithm {
      NoiseAlgorithm::Simplex => s.noise.get([x * p.frequency, y * p.frequency]),
      NoiseAlgorithm::Fbm => {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut freq = p.frequency;
        let mut max_amplitude = 0.0;
        for _ in 0..p.octaves {
          value += s.noise.get([x * freq, y * freq]) * amplitude;
          max_amplitude += amplitude;
          amplitude *= p.persistence;
          freq *= p.lacunarity;
        }
        value / max_amplitude
      }
      NoiseAlgorithm::Ridged => {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut freq = p.frequency;
        let mut max_amplitude = 0.0;
        for _ in 0..p.octaves {
          let ridge = 1.0 - s.noise.get([x * freq, y * freq]).abs();
          value += ridge * amplitude;
          max_amplitude += amplitude;
          amplitude *= p.persistence;
          freq *= p.lacunarity;
        }
        // Remap [0, 1] ridge sum to [-1, 1] like the other algorithms
        (value / max_amplitude) * 2.0 - 1.0
      }
    }
  }

  /// Returns true if both handles refer to the same cached generator.
  pub fn same_generator(&self, other: &GeneratorHandle) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

/// Derives a generator seed from a prototype id and the map's world seed.
///
/// FNV-1a over the id bytes, folded with the world seed. Kept explicit (not
/// `DefaultHasher`) so the derivation is stable across Rust releases.
pub fn derive_seed(prototype_id: &str, world_seed: u64) -> u32 {
  const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
  const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

  let mut hash = FNV_OFFSET;
  for byte in prototype_id.as_bytes() {
    hash ^= u64::from(*byte);
    hash = hash.wrapping_mul(FNV_PRIME);
  }
  let folded = hash ^ world_seed;
  (folded ^ (folded >> 32)) as u32
}

/// Lazy cache of noise generators, one per prototype id.
pub struct NoiseIndex {
  world_seed: u64,
  prototypes: HashMap<String, GeneratorPrototype>,
  generators: HashMap<String, GeneratorHandle>,
}

impl NoiseIndex {
  /// Creates an empty index over the given prototype set.
  pub fn new(world_seed: u64, prototypes: HashMap<String, GeneratorPrototype>) -> Self {
    Self {
      world_seed,
      prototypes,
      generators: HashMap::new(),
    }
  }

  /// Returns the world seed this index derives generator seeds from.
  pub fn world_seed(&self) -> u64 {
    self.world_seed
  }

  /// Returns the cached generator for a prototype id, constructing it on
  /// first request.
  ///
  /// Ids without a registered prototype fall back to default fBm parameters
  /// (still seeded from the id, so distinct ids stay distinct).
  pub fn get(&mut self, prototype_id: &str) -> GeneratorHandle {
    if let Some(handle) = self.generators.get(prototype_id) {
      return handle.clone();
    }

    let prototype = match self.prototypes.get(prototype_id) {
      Some(p) => p.clone(),
      None => {
        debug!("No prototype registered for {prototype_id:?}, using default parameters");
        GeneratorPrototype::default()
      }
    };

    let seed = derive_seed(prototype_id, self.world_seed);
    let handle = GeneratorHandle::build(prototype, seed);
    self
      .generators
      .insert(prototype_id.to_string(), handle.clone());
    handle
  }

  /// Number of generators constructed so far.
  pub fn len(&self) -> usize {
    self.generators.len()
  }

  /// Returns true if no generator has been constructed yet.
  pub fn is_empty(&self) -> bool {
    self.generators.is_empty()
  }
}

/// Samples a `resolution` x `resolution` grid of values across one chunk.
///
/// Convenience for chunk population consumers reacting to
/// [`ChunkInitialized`](crate::ChunkInitialized): rows are sampled in
/// parallel, which is safe because sampling never mutates the generator.
/// Values are laid out row-major, `resolution * resolution` entries.
pub fn sample_chunk_field(handle: &GeneratorHandle, pos: ChunkPos, resolution: u32) -> Vec<f64> {
  let origin = pos.to_world();
  let step = CHUNK_SIZE as f64 / resolution as f64;

  (0..resolution)
    .into_par_iter()
    .flat_map_iter(|row| {
      let handle = handle.clone();
      let y = origin.y as f64 + row as f64 * step;
      (0..resolution).map(move |col| {
        let x = origin.x as f64 + col as f64 * step;
        handle.sample(x, y)
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_index(seed: u64) -> NoiseIndex {
    let mut prototypes = HashMap::new();
    prototypes.insert("height".to_string(), GeneratorPrototype::default());
    prototypes.insert(
      "cavern".to_string(),
      GeneratorPrototype {
        algorithm: NoiseAlgorithm::Ridged,
        ..GeneratorPrototype::default()
      },
    );
    NoiseIndex::new(seed, prototypes)
  }

  #[test]
  fn repeated_requests_return_the_same_generator() {
    let mut index = test_index(42);
    let a = index.get("height");
    let b = index.get("height");
    assert!(a.same_generator(&b));
    assert_eq!(index.len(), 1);
  }

  #[test]
  fn sampling_is_deterministic_across_instances() {
    // Two independent indexes stand in for two process runs
    let mut first = test_index(42);
    let mut second = test_index(42);

    for id in ["height", "cavern", "unregistered"] {
      let a = first.get(id);
      let b = second.get(id);
      for &(x, y) in &[(0.0, 0.0), (17.5, -3.25), (-1000.0, 4096.0)] {
        assert_eq!(a.sample(x, y), b.sample(x, y), "id={id} at ({x}, {y})");
      }
    }
  }

  #[test]
  fn different_seeds_produce_different_worlds() {
    let a = test_index(1).get("height");
    let b = test_index(2).get("height");
    let differs = (0..16).any(|i| {
      let x = i as f64 * 13.7;
      a.sample(x, x * 0.5) != b.sample(x, x * 0.5)
    });
    assert!(differs);
  }

  #[test]
  fn distinct_prototype_ids_get_distinct_seeds() {
    assert_ne!(derive_seed("height", 42), derive_seed("cavern", 42));
    assert_ne!(derive_seed("height", 42), derive_seed("height", 43));
    // Stable derivation: same inputs, same output
    assert_eq!(derive_seed("height", 42), derive_seed("height", 42));
  }

  #[test]
  fn samples_stay_in_range() {
    let mut index = test_index(7);
    for id in ["height", "cavern"] {
      let handle = index.get(id);
      for i in 0..64 {
        let v = handle.sample(i as f64 * 3.1, i as f64 * -1.7);
        assert!((-1.0..=1.0).contains(&v), "id={id} value {v} out of range");
      }
    }
  }

  #[test]
  fn chunk_field_matches_point_samples() {
    let mut index = test_index(42);
    let handle = index.get("height");
    let pos = ChunkPos::new(-2, 3);
    let field = sample_chunk_field(&handle, pos, 8);
    assert_eq!(field.len(), 64);

    let origin = pos.to_world();
    let step = CHUNK_SIZE as f64 / 8.0;
    let expected = handle.sample(origin.x as f64 + 3.0 * step, origin.y as f64 + 5.0 * step);
    assert_eq!(field[5 * 8 + 3], expected);
  }
}
