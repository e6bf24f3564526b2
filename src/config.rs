//! World-generation configuration.
//!
//! Plain serde structs loaded from TOML, inserted as resources by the
//! plugin. All fields have defaults so an empty config is valid.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::Deserialize;

use crate::coords::{CHUNK_SIZE, DEFAULT_LOAD_RADIUS};
use crate::noise_index::{GeneratorPrototype, NoiseAlgorithm};

/// Top-level world-generation options.
///
/// # Example
/// ```
/// use bevy_chunk_world::WorldGenConfig;
///
/// let config = WorldGenConfig::from_toml_str(
///   r#"
///   enabled = true
///   profile = "default"
///   maintenance_budget_ms = 5
///   loader_radius = 128
///   "#,
/// )
/// .unwrap();
/// assert_eq!(config.loader_radius_chunks(), 4);
/// ```
#[derive(Resource, Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
  /// When false, reconciliation is skipped entirely: no new chunks are
  /// created and existing chunks persist.
  pub enabled: bool,
  /// Which generator profile to use for newly created maps.
  pub profile: String,
  /// Per-tick millisecond budget for chunk activation/deactivation work.
  /// Soft cap, checked between tasks.
  pub maintenance_budget_ms: u64,
  /// Default loader radius in world units.
  pub loader_radius: u32,
}

impl Default for WorldGenConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      profile: "default".to_string(),
      maintenance_budget_ms: 5,
      loader_radius: DEFAULT_LOAD_RADIUS,
    }
  }
}

impl WorldGenConfig {
  /// Parses a config from TOML text.
  pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(text)
  }

  /// Default loader radius converted to chunk units (floored).
  pub fn loader_radius_chunks(&self) -> i32 {
    (self.loader_radius / CHUNK_SIZE) as i32
  }
}

/// A named set of generator prototypes.
///
/// Maps select one profile by name; consumers pull generators out of the
/// map's noise index by prototype id.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GeneratorProfile {
  /// Prototype id -> noise parameters.
  #[serde(default)]
  pub generators: HashMap<String, GeneratorPrototype>,
}

/// Registry of generator profiles, keyed by profile name.
#[derive(Resource, Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GeneratorProfiles {
  #[serde(default)]
  pub profiles: HashMap<String, GeneratorProfile>,
}

impl GeneratorProfiles {
  /// Parses a profile registry from TOML text.
  pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(text)
  }

  /// Looks up a profile by name, falling back to the built-in default.
  pub fn get(&self, name: &str) -> GeneratorProfile {
    match self.profiles.get(name) {
      Some(profile) => profile.clone(),
      None => {
        if name != "default" {
          warn!("Unknown generator profile {name:?}, using built-in default");
        }
        builtin_default_profile()
      }
    }
  }
}

impl Default for GeneratorProfiles {
  fn default() -> Self {
    let mut profiles = HashMap::new();
    profiles.insert("default".to_string(), builtin_default_profile());
    Self { profiles }
  }
}

/// Built-in profile used when no profile configuration is supplied.
fn builtin_default_profile() -> GeneratorProfile {
  let mut generators = HashMap::new();
  generators.insert(
    "terrain_height".to_string(),
    GeneratorPrototype {
      algorithm: NoiseAlgorithm::Fbm,
      frequency: 0.01,
      octaves: 4,
      lacunarity: 2.0,
      persistence: 0.5,
    },
  );
  generators.insert(
    "moisture".to_string(),
    GeneratorPrototype {
      algorithm: NoiseAlgorithm::Simplex,
      frequency: 0.005,
      ..GeneratorPrototype::default()
    },
  );
  generators.insert(
    "cavern".to_string(),
    GeneratorPrototype {
      algorithm: NoiseAlgorithm::Ridged,
      frequency: 0.02,
      octaves: 3,
      ..GeneratorPrototype::default()
    },
  );
  GeneratorProfile { generators }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_uses_defaults() {
    let config = WorldGenConfig::from_toml_str("").unwrap();
    assert!(config.enabled);
    assert_eq!(config.profile, "default");
    assert_eq!(config.maintenance_budget_ms, 5);
    assert_eq!(config.loader_radius, DEFAULT_LOAD_RADIUS);
  }

  #[test]
  fn radius_converts_to_chunk_units() {
    let config = WorldGenConfig::default();
    // 128 world units / 32 units per chunk
    assert_eq!(config.loader_radius_chunks(), 4);
  }

  #[test]
  fn profile_toml_roundtrip() {
    let profiles = GeneratorProfiles::from_toml_str(
      r#"
      [profiles.islands.generators.height]
      algorithm = "fbm"
      frequency = 0.02
      octaves = 6
      "#,
    )
    .unwrap();
    let profile = profiles.get("islands");
    let proto = &profile.generators["height"];
    assert_eq!(proto.octaves, 6);
    assert_eq!(proto.frequency, 0.02);
  }

  #[test]
  fn unknown_profile_falls_back_to_builtin() {
    let profiles = GeneratorProfiles::default();
    let profile = profiles.get("no_such_profile");
    assert!(profile.generators.contains_key("terrain_height"));
  }
}
