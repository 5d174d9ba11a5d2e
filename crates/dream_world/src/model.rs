//! Scene model
//!
//! Plain value types for everything a world holds. Every `Default` impl builds
//! a fresh value, so no two objects ever alias the same defaults.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 3D vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// Origin
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// Unit scale
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    /// World up axis
    pub const UP: Self = Self::new(0.0, 1.0, 0.0);

    /// Create a new vector
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl Default for Vector3 {
    fn default() -> Self {
        Self::ZERO
    }
}

/// RGB color, each channel in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    /// Default grass-green ground
    pub const GROUND: Self = Self::new(0.34, 0.49, 0.27);

    /// Create a new color
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Geometry discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Box,
    Sphere,
    Cylinder,
    Cone,
    Torus,
    Plane,
    Custom,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Cylinder => "cylinder",
            Self::Cone => "cone",
            Self::Torus => "torus",
            Self::Plane => "plane",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Shape of an object.
///
/// Parametric variants only carry the dimensions relevant to their shape;
/// unset dimensions are left to the renderer's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geometry {
    Box {
        width: Option<f64>,
        height: Option<f64>,
        depth: Option<f64>,
    },
    Sphere {
        radius: Option<f64>,
        width_segments: Option<u32>,
        height_segments: Option<u32>,
    },
    Cylinder {
        radius_top: Option<f64>,
        radius_bottom: Option<f64>,
        height: Option<f64>,
        radial_segments: Option<u32>,
    },
    Cone {
        radius: Option<f64>,
        height: Option<f64>,
        radial_segments: Option<u32>,
    },
    Torus {
        radius: Option<f64>,
        tube: Option<f64>,
        radial_segments: Option<u32>,
        tubular_segments: Option<u32>,
    },
    Plane {
        width: Option<f64>,
        height: Option<f64>,
        width_segments: Option<u32>,
        height_segments: Option<u32>,
    },
    /// Explicit triangle mesh
    Custom {
        /// Flat `[x, y, z, ...]` positions
        vertices: Vec<f64>,
        /// Triangle indices
        indices: Vec<u32>,
        normals: Option<Vec<f64>>,
        uvs: Option<Vec<f64>>,
    },
}

impl Geometry {
    /// Get the geometry discriminant
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Box { .. } => GeometryKind::Box,
            Self::Sphere { .. } => GeometryKind::Sphere,
            Self::Cylinder { .. } => GeometryKind::Cylinder,
            Self::Cone { .. } => GeometryKind::Cone,
            Self::Torus { .. } => GeometryKind::Torus,
            Self::Plane { .. } => GeometryKind::Plane,
            Self::Custom { .. } => GeometryKind::Custom,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::Box {
            width: None,
            height: None,
            depth: None,
        }
    }
}

/// Surface material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: Color,
    pub emissive: Option<Color>,
    pub emissive_intensity: f64,
    pub metalness: f64,
    pub roughness: f64,
    pub opacity: f64,
    pub transparent: bool,
    pub wireframe: bool,
    pub flat_shading: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            emissive: None,
            emissive_intensity: 0.0,
            metalness: 0.0,
            roughness: 0.5,
            opacity: 1.0,
            transparent: false,
            wireframe: false,
            flat_shading: false,
        }
    }
}

/// Simulation hints. Carried for the client, never read by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    pub has_gravity: bool,
    pub is_static: bool,
    pub mass: f64,
    pub friction: f64,
    pub restitution: f64,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            has_gravity: true,
            is_static: true,
            mass: 1.0,
            friction: 0.5,
            restitution: 0.3,
        }
    }
}

/// Animation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    #[default]
    None,
    /// Spin around `axis`
    Rotate,
    /// Move up and down
    Bob,
    /// Circle around the origin
    Orbit,
}

/// Simple procedural animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    #[serde(rename = "type")]
    pub kind: AnimationKind,
    pub speed: f64,
    pub axis: Vector3,
    pub amplitude: f64,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            kind: AnimationKind::None,
            speed: 1.0,
            axis: Vector3::UP,
            amplitude: 1.0,
        }
    }
}

/// A named object in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    /// Opaque generated identifier
    pub id: Uuid,
    /// Identity within a world; unique among top-level objects
    pub name: String,
    pub description: String,
    pub position: Vector3,
    /// Euler rotation in radians
    pub rotation: Vector3,
    pub scale: Vector3,
    pub geometry: Geometry,
    pub material: Material,
    pub physics: Physics,
    pub animation: Animation,
    /// Sub-parts positioned relative to this object; they live and die with it
    pub children: Vec<WorldObject>,
    pub tags: BTreeSet<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl WorldObject {
    /// Create an object with every component defaulted
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            position: Vector3::ZERO,
            rotation: Vector3::ZERO,
            scale: Vector3::ONE,
            geometry: Geometry::default(),
            material: Material::default(),
            physics: Physics::default(),
            animation: Animation::default(),
            children: Vec::new(),
            tags: BTreeSet::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Short label used in summaries: the description, else the geometry kind
    pub fn label(&self) -> String {
        if self.description.is_empty() {
            self.geometry.kind().to_string()
        } else {
            self.description.clone()
        }
    }
}

/// Time of day preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Dawn,
    #[default]
    Day,
    Dusk,
    Night,
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dawn => "dawn",
            Self::Day => "day",
            Self::Dusk => "dusk",
            Self::Night => "night",
        };
        f.write_str(name)
    }
}

/// Global lighting and atmosphere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    pub sky_color: Color,
    pub ground_color: Color,
    pub fog_color: Option<Color>,
    pub fog_near: f64,
    pub fog_far: f64,
    pub fog_enabled: bool,
    pub ambient_light_color: Color,
    pub ambient_light_intensity: f64,
    pub sun_color: Color,
    pub sun_intensity: f64,
    pub sun_position: Vector3,
    pub time_of_day: TimeOfDay,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            sky_color: Color::new(0.53, 0.81, 0.92),
            ground_color: Color::GROUND,
            fog_color: None,
            fog_near: 50.0,
            fog_far: 200.0,
            fog_enabled: false,
            ambient_light_color: Color::new(0.4, 0.4, 0.4),
            ambient_light_intensity: 0.6,
            sun_color: Color::new(1.0, 0.95, 0.8),
            sun_intensity: 1.0,
            sun_position: Vector3::new(50.0, 100.0, 50.0),
            time_of_day: TimeOfDay::Day,
        }
    }
}

/// Terrain style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainKind {
    #[default]
    Flat,
    Hills,
    Mountains,
    Water,
}

impl fmt::Display for TerrainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Flat => "flat",
            Self::Hills => "hills",
            Self::Mountains => "mountains",
            Self::Water => "water",
        };
        f.write_str(name)
    }
}

/// A generated ground surface. Terrain has no identity and is never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainPatch {
    #[serde(rename = "type")]
    pub kind: TerrainKind,
    pub size: f64,
    /// Maximum height variation
    pub height: f64,
    pub color: Color,
    /// Mesh resolution
    pub segments: u32,
    /// Seed for reproducible noise
    pub seed: Option<u64>,
}

impl Default for TerrainPatch {
    fn default() -> Self {
        Self {
            kind: TerrainKind::Flat,
            size: 100.0,
            height: 10.0,
            color: Color::GROUND,
            segments: 32,
            seed: None,
        }
    }
}

/// Complete state of one world
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// Top-level objects keyed by their unique name
    pub objects: BTreeMap<String, WorldObject>,
    pub environment: EnvironmentSettings,
    pub terrain: Vec<TerrainPatch>,
    /// Most recent narration, oldest first
    pub narrative_history: VecDeque<String>,
    pub turn_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_defaults() {
        let obj = WorldObject::new("rock");
        assert_eq!(obj.scale, Vector3::ONE);
        assert_eq!(obj.position, Vector3::ZERO);
        assert_eq!(obj.geometry.kind(), GeometryKind::Box);
        assert_eq!(obj.material.color, Color::WHITE);
        assert!(obj.physics.is_static);
        assert_eq!(obj.animation.kind, AnimationKind::None);
        assert_eq!(obj.animation.axis, Vector3::UP);
    }

    #[test]
    fn test_defaults_are_not_shared() {
        let mut a = WorldObject::new("a");
        let b = WorldObject::new("b");
        a.tags.insert("tree".to_string());
        a.material.color.r = 0.0;
        assert!(b.tags.is_empty());
        assert_eq!(b.material.color.r, 1.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_geometry_serializes_tagged() {
        let geometry = Geometry::Sphere {
            radius: Some(2.0),
            width_segments: None,
            height_segments: None,
        };
        let value = serde_json::to_value(&geometry).unwrap();
        assert_eq!(value["type"], "sphere");
        assert_eq!(value["radius"], 2.0);
    }

    #[test]
    fn test_enum_wire_names() {
        let env = EnvironmentSettings {
            time_of_day: TimeOfDay::Night,
            ..Default::default()
        };
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["time_of_day"], json!("night"));

        let terrain = TerrainPatch {
            kind: TerrainKind::Mountains,
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&terrain).unwrap()["type"], json!("mountains"));
    }

    #[test]
    fn test_label_falls_back_to_geometry() {
        let mut obj = WorldObject::new("thing");
        assert_eq!(obj.label(), "box");
        obj.description = "a mossy crate".to_string();
        assert_eq!(obj.label(), "a mossy crate");
    }
}
