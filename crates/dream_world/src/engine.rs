//! World state engine
//!
//! Owns one [`WorldState`] and is the only way it gets mutated. Every
//! operation is synchronous and changes nothing unless it succeeds.

use std::fmt::Write as _;

use uuid::Uuid;

use crate::model::{EnvironmentSettings, TerrainPatch, WorldObject, WorldState};
use crate::spec::{EnvironmentPatch, ObjectPatch, ObjectSpec, TerrainSpec};

/// Maximum narrative entries kept in the world
pub const NARRATIVE_CAP: usize = 20;

/// Narrative entries echoed in the context summary
pub const SUMMARY_NARRATIVE_LINES: usize = 5;

/// Hex characters appended to colliding names
const NAME_SUFFIX_LEN: usize = 6;

/// Hex characters in generated child names
const CHILD_SUFFIX_LEN: usize = 4;

/// Authoritative, mutable scene graph for one session
#[derive(Debug, Default)]
pub struct WorldEngine {
    state: WorldState,
    /// Advisory object cap; exceeding it is logged, never refused
    object_limit: Option<usize>,
}

impl WorldEngine {
    /// Create an engine holding an empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the advisory object cap
    pub fn with_object_limit(mut self, limit: usize) -> Self {
        self.object_limit = Some(limit);
        self
    }

    /// Read-only view of the current state
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Number of top-level objects
    pub fn object_count(&self) -> usize {
        self.state.objects.len()
    }

    /// Look up a top-level object by name
    pub fn get_object(&self, name: &str) -> Option<&WorldObject> {
        self.state.objects.get(name)
    }

    /// Create an object.
    ///
    /// A requested name that collides with an existing top-level object gets a
    /// random suffix; callers must read the name off the returned object.
    pub fn create_object(&mut self, spec: ObjectSpec) -> WorldObject {
        let name = match spec.name.as_deref().map(str::trim) {
            Some(requested) if !requested.is_empty() => {
                if self.state.objects.contains_key(requested) {
                    self.unique_name(requested)
                } else {
                    requested.to_string()
                }
            }
            _ => self.unique_name("object"),
        };

        let object = build_object(spec, name.clone());

        if let Some(limit) = self.object_limit {
            if self.state.objects.len() >= limit {
                log::warn!(
                    "World holds {} objects, above the configured cap of {}",
                    self.state.objects.len() + 1,
                    limit
                );
            }
        }

        self.state.objects.insert(name.clone(), object.clone());
        log::info!("Created object: {}", name);
        object
    }

    /// Apply a sparse patch to an existing object.
    ///
    /// Returns `None` without touching anything when the name is unknown.
    pub fn modify_object(&mut self, patch: &ObjectPatch) -> Option<WorldObject> {
        let Some(object) = self.state.objects.get_mut(&patch.name) else {
            log::warn!("Object not found for modification: {}", patch.name);
            return None;
        };

        patch.fields.apply(object);
        log::info!("Modified object: {}", patch.name);
        Some(object.clone())
    }

    /// Remove an object and all of its children
    pub fn remove_object(&mut self, name: &str) -> bool {
        if self.state.objects.remove(name).is_some() {
            log::info!("Removed object: {}", name);
            true
        } else {
            log::warn!("Object not found for removal: {}", name);
            false
        }
    }

    /// Apply a sparse patch to the environment
    pub fn update_environment(&mut self, patch: &EnvironmentPatch) -> EnvironmentSettings {
        patch.apply(&mut self.state.environment);
        log::info!("Updated environment");
        self.state.environment.clone()
    }

    /// Append a terrain patch
    pub fn add_terrain(&mut self, spec: &TerrainSpec) -> TerrainPatch {
        let terrain = spec.build();
        self.state.terrain.push(terrain.clone());
        log::info!("Added terrain: {}", terrain.kind);
        terrain
    }

    /// Append narration, dropping the oldest entries beyond [`NARRATIVE_CAP`]
    pub fn add_narrative(&mut self, text: impl Into<String>) {
        let history = &mut self.state.narrative_history;
        history.push_back(text.into());
        while history.len() > NARRATIVE_CAP {
            history.pop_front();
        }
    }

    /// Advance the turn counter; once per accepted user input
    pub fn increment_turn(&mut self) {
        self.state.turn_count += 1;
    }

    /// Current turn number
    pub fn turn_count(&self) -> u64 {
        self.state.turn_count
    }

    /// Deterministic digest of the world, re-sent to the agent every turn
    pub fn context_summary(&self) -> String {
        let state = &self.state;
        let mut out = String::new();

        let _ = writeln!(out, "Turn: {}", state.turn_count);
        let _ = write!(out, "Objects in scene: {}", state.objects.len());
        if let Some(limit) = self.object_limit {
            let _ = write!(out, " (soft limit {})", limit);
        }
        out.push('\n');

        if !state.objects.is_empty() {
            out.push_str("\nCurrent objects:\n");
            for (name, object) in &state.objects {
                let p = object.position;
                let _ = writeln!(
                    out,
                    "  - {}: {} at ({:.1}, {:.1}, {:.1})",
                    name,
                    object.label(),
                    p.x,
                    p.y,
                    p.z
                );
            }
        }

        if !state.terrain.is_empty() {
            let kinds: Vec<String> = state.terrain.iter().map(|t| t.kind.to_string()).collect();
            let _ = writeln!(out, "\nTerrain: {}", kinds.join(", "));
        }

        let env = &state.environment;
        let _ = writeln!(
            out,
            "\nEnvironment: {}, sun intensity {}",
            env.time_of_day, env.sun_intensity
        );

        if !state.narrative_history.is_empty() {
            out.push_str("\nRecent narrative:\n");
            let skip = state
                .narrative_history
                .len()
                .saturating_sub(SUMMARY_NARRATIVE_LINES);
            for entry in state.narrative_history.iter().skip(skip) {
                let _ = writeln!(out, "  \"{}\"", entry);
            }
        }

        out.trim_end().to_string()
    }

    /// Serializable copy of the whole world
    pub fn snapshot(&self) -> WorldState {
        self.state.clone()
    }

    /// Replace the world with an empty one
    pub fn reset(&mut self) {
        self.state = WorldState::default();
        log::info!("World reset");
    }

    /// `base` plus a random suffix, guaranteed unused
    fn unique_name(&self, base: &str) -> String {
        loop {
            let candidate = format!("{}_{}", base, short_hex(NAME_SUFFIX_LEN));
            if !self.state.objects.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

/// Build an object and its children from a spec.
///
/// Children are never entered into the name map, so their names are only
/// defaulted, not de-duplicated.
fn build_object(spec: ObjectSpec, name: String) -> WorldObject {
    let mut object = WorldObject::new(name);
    spec.fields.apply(&mut object);

    for child_spec in spec.children.unwrap_or_default() {
        let child_name = child_spec
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{}_child_{}", object.name, short_hex(CHILD_SUFFIX_LEN)));
        object.children.push(build_object(child_spec, child_name));
    }

    object
}

fn short_hex(len: usize) -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex
}
