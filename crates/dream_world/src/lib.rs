//! Dream World - Scene Model and World State Engine
//!
//! This crate owns the authoritative, mutable scene graph for one session.
//!
//! # Features
//!
//! - Value types for objects, environment, terrain and narrative
//! - Sparse patch types decoded straight from agent tool arguments
//! - Name-unique object store with defaulting rules
//! - Deterministic context summary for grounding the agent
//!
//! # Example
//!
//! ```ignore
//! use dream_world::prelude::*;
//!
//! let mut world = WorldEngine::new();
//! world.increment_turn();
//!
//! let spec: ObjectSpec = serde_json::from_value(json!({
//!     "name": "tree",
//!     "geometry": { "type": "cylinder" }
//! }))?;
//! let tree = world.create_object(spec);
//! println!("{}", world.context_summary());
//! ```

pub mod engine;
pub mod model;
pub mod spec;

pub mod prelude {
    pub use crate::engine::{WorldEngine, NARRATIVE_CAP, SUMMARY_NARRATIVE_LINES};
    pub use crate::model::{
        Animation, AnimationKind, Color, EnvironmentSettings, Geometry, GeometryKind, Material,
        Physics, TerrainKind, TerrainPatch, TimeOfDay, Vector3, WorldObject, WorldState,
    };
    pub use crate::spec::{
        AnimationSpec, ColorSpec, EnvironmentPatch, GeometrySpec, MaterialSpec, ObjectPatch,
        ObjectSpec, PhysicsSpec, TerrainSpec, Vec3Spec,
    };
}

pub use prelude::*;
