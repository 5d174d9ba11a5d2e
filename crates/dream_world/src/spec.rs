//! Sparse input types
//!
//! These are decoded directly from agent tool arguments. Every field is
//! optional: an absent or `null` field leaves the target value untouched,
//! and creation is simply a patch applied over freshly defaulted values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    Animation, AnimationKind, Color, EnvironmentSettings, Geometry, GeometryKind, Material,
    Physics, TerrainKind, TerrainPatch, TimeOfDay, Vector3, WorldObject,
};

/// Partial vector; missing components keep the base value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3Spec {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl Vec3Spec {
    /// Resolve against a base vector
    pub fn resolve(&self, base: Vector3) -> Vector3 {
        Vector3 {
            x: self.x.unwrap_or(base.x),
            y: self.y.unwrap_or(base.y),
            z: self.z.unwrap_or(base.z),
        }
    }
}

impl From<Vector3> for Vec3Spec {
    fn from(v: Vector3) -> Self {
        Self {
            x: Some(v.x),
            y: Some(v.y),
            z: Some(v.z),
        }
    }
}

/// Partial color; missing channels keep the base value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorSpec {
    pub r: Option<f64>,
    pub g: Option<f64>,
    pub b: Option<f64>,
}

impl ColorSpec {
    /// Resolve against a base color
    pub fn resolve(&self, base: Color) -> Color {
        Color {
            r: self.r.unwrap_or(base.r),
            g: self.g.unwrap_or(base.g),
            b: self.b.unwrap_or(base.b),
        }
    }
}

/// Flat geometry description as the agent writes it.
///
/// Carries the union of every shape's fields; [`GeometrySpec::build`] keeps
/// only the ones relevant to the resolved kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometrySpec {
    #[serde(rename = "type")]
    pub kind: Option<GeometryKind>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
    pub radius: Option<f64>,
    pub radius_top: Option<f64>,
    pub radius_bottom: Option<f64>,
    pub tube: Option<f64>,
    pub width_segments: Option<u32>,
    pub height_segments: Option<u32>,
    pub radial_segments: Option<u32>,
    pub tubular_segments: Option<u32>,
    pub vertices: Option<Vec<f64>>,
    pub indices: Option<Vec<u32>>,
    pub normals: Option<Vec<f64>>,
    pub uvs: Option<Vec<f64>>,
}

impl GeometrySpec {
    /// Build a geometry, defaulting to a box when no kind is given
    pub fn build(&self) -> Geometry {
        match self.kind.unwrap_or(GeometryKind::Box) {
            GeometryKind::Box => Geometry::Box {
                width: self.width,
                height: self.height,
                depth: self.depth,
            },
            GeometryKind::Sphere => Geometry::Sphere {
                radius: self.radius,
                width_segments: self.width_segments,
                height_segments: self.height_segments,
            },
            GeometryKind::Cylinder => Geometry::Cylinder {
                radius_top: self.radius_top,
                radius_bottom: self.radius_bottom,
                height: self.height,
                radial_segments: self.radial_segments,
            },
            GeometryKind::Cone => Geometry::Cone {
                radius: self.radius.or(self.radius_bottom),
                height: self.height,
                radial_segments: self.radial_segments,
            },
            GeometryKind::Torus => Geometry::Torus {
                radius: self.radius,
                tube: self.tube,
                radial_segments: self.radial_segments,
                tubular_segments: self.tubular_segments,
            },
            GeometryKind::Plane => Geometry::Plane {
                width: self.width,
                height: self.height,
                width_segments: self.width_segments,
                height_segments: self.height_segments,
            },
            GeometryKind::Custom => Geometry::Custom {
                vertices: self.vertices.clone().unwrap_or_default(),
                indices: self.indices.clone().unwrap_or_default(),
                normals: self.normals.clone(),
                uvs: self.uvs.clone(),
            },
        }
    }

    /// Apply this spec over an existing geometry.
    ///
    /// Same kind: only the given fields change. Different kind: the shape is
    /// rebuilt from this spec alone.
    pub fn overlay(&self, current: &Geometry) -> Geometry {
        let kind = self.kind.unwrap_or_else(|| current.kind());
        let base = if kind == current.kind() {
            GeometrySpec::from(current)
        } else {
            GeometrySpec::default()
        };

        GeometrySpec {
            kind: Some(kind),
            width: self.width.or(base.width),
            height: self.height.or(base.height),
            depth: self.depth.or(base.depth),
            radius: self.radius.or(base.radius),
            radius_top: self.radius_top.or(base.radius_top),
            radius_bottom: self.radius_bottom.or(base.radius_bottom),
            tube: self.tube.or(base.tube),
            width_segments: self.width_segments.or(base.width_segments),
            height_segments: self.height_segments.or(base.height_segments),
            radial_segments: self.radial_segments.or(base.radial_segments),
            tubular_segments: self.tubular_segments.or(base.tubular_segments),
            vertices: self.vertices.clone().or(base.vertices),
            indices: self.indices.clone().or(base.indices),
            normals: self.normals.clone().or(base.normals),
            uvs: self.uvs.clone().or(base.uvs),
        }
        .build()
    }
}

impl From<&Geometry> for GeometrySpec {
    fn from(geometry: &Geometry) -> Self {
        let mut spec = GeometrySpec {
            kind: Some(geometry.kind()),
            ..Default::default()
        };
        match geometry {
            Geometry::Box { width, height, depth } => {
                spec.width = *width;
                spec.height = *height;
                spec.depth = *depth;
            }
            Geometry::Sphere { radius, width_segments, height_segments } => {
                spec.radius = *radius;
                spec.width_segments = *width_segments;
                spec.height_segments = *height_segments;
            }
            Geometry::Cylinder { radius_top, radius_bottom, height, radial_segments } => {
                spec.radius_top = *radius_top;
                spec.radius_bottom = *radius_bottom;
                spec.height = *height;
                spec.radial_segments = *radial_segments;
            }
            Geometry::Cone { radius, height, radial_segments } => {
                spec.radius = *radius;
                spec.height = *height;
                spec.radial_segments = *radial_segments;
            }
            Geometry::Torus { radius, tube, radial_segments, tubular_segments } => {
                spec.radius = *radius;
                spec.tube = *tube;
                spec.radial_segments = *radial_segments;
                spec.tubular_segments = *tubular_segments;
            }
            Geometry::Plane { width, height, width_segments, height_segments } => {
                spec.width = *width;
                spec.height = *height;
                spec.width_segments = *width_segments;
                spec.height_segments = *height_segments;
            }
            Geometry::Custom { vertices, indices, normals, uvs } => {
                spec.vertices = Some(vertices.clone());
                spec.indices = Some(indices.clone());
                spec.normals = normals.clone();
                spec.uvs = uvs.clone();
            }
        }
        spec
    }
}

/// Partial material
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub color: Option<ColorSpec>,
    pub emissive: Option<ColorSpec>,
    pub emissive_intensity: Option<f64>,
    pub metalness: Option<f64>,
    pub roughness: Option<f64>,
    pub opacity: Option<f64>,
    pub transparent: Option<bool>,
    pub wireframe: Option<bool>,
    pub flat_shading: Option<bool>,
}

impl MaterialSpec {
    /// Apply the present fields to a material
    pub fn apply(&self, material: &mut Material) {
        if let Some(color) = &self.color {
            material.color = color.resolve(material.color);
        }
        if let Some(emissive) = &self.emissive {
            material.emissive = Some(emissive.resolve(material.emissive.unwrap_or(Color::WHITE)));
        }
        if let Some(v) = self.emissive_intensity {
            material.emissive_intensity = v;
        }
        if let Some(v) = self.metalness {
            material.metalness = v;
        }
        if let Some(v) = self.roughness {
            material.roughness = v;
        }
        if let Some(v) = self.opacity {
            material.opacity = v;
        }
        if let Some(v) = self.transparent {
            material.transparent = v;
        }
        if let Some(v) = self.wireframe {
            material.wireframe = v;
        }
        if let Some(v) = self.flat_shading {
            material.flat_shading = v;
        }
    }
}

/// Partial physics hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSpec {
    pub has_gravity: Option<bool>,
    pub is_static: Option<bool>,
    pub mass: Option<f64>,
    pub friction: Option<f64>,
    pub restitution: Option<f64>,
}

impl PhysicsSpec {
    pub fn apply(&self, physics: &mut Physics) {
        if let Some(v) = self.has_gravity {
            physics.has_gravity = v;
        }
        if let Some(v) = self.is_static {
            physics.is_static = v;
        }
        if let Some(v) = self.mass {
            physics.mass = v;
        }
        if let Some(v) = self.friction {
            physics.friction = v;
        }
        if let Some(v) = self.restitution {
            physics.restitution = v;
        }
    }
}

/// Partial animation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationSpec {
    #[serde(rename = "type")]
    pub kind: Option<AnimationKind>,
    pub speed: Option<f64>,
    pub axis: Option<Vec3Spec>,
    pub amplitude: Option<f64>,
}

impl AnimationSpec {
    pub fn apply(&self, animation: &mut Animation) {
        if let Some(kind) = self.kind {
            animation.kind = kind;
        }
        if let Some(v) = self.speed {
            animation.speed = v;
        }
        if let Some(axis) = &self.axis {
            animation.axis = axis.resolve(animation.axis);
        }
        if let Some(v) = self.amplitude {
            animation.amplitude = v;
        }
    }
}

/// Fields shared by object creation and modification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectFields {
    pub description: Option<String>,
    pub position: Option<Vec3Spec>,
    pub rotation: Option<Vec3Spec>,
    pub scale: Option<Vec3Spec>,
    pub geometry: Option<GeometrySpec>,
    pub material: Option<MaterialSpec>,
    pub physics: Option<PhysicsSpec>,
    pub animation: Option<AnimationSpec>,
    /// Replaces the whole tag set when present
    pub tags: Option<Vec<String>>,
    /// Merged key by key when present
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

impl ObjectFields {
    /// Apply the present fields to an object. Children are not touched.
    pub fn apply(&self, object: &mut WorldObject) {
        if let Some(description) = &self.description {
            object.description = description.clone();
        }
        if let Some(position) = &self.position {
            object.position = position.resolve(object.position);
        }
        if let Some(rotation) = &self.rotation {
            object.rotation = rotation.resolve(object.rotation);
        }
        if let Some(scale) = &self.scale {
            object.scale = scale.resolve(object.scale);
        }
        if let Some(geometry) = &self.geometry {
            object.geometry = geometry.overlay(&object.geometry);
        }
        if let Some(material) = &self.material {
            material.apply(&mut object.material);
        }
        if let Some(physics) = &self.physics {
            physics.apply(&mut object.physics);
        }
        if let Some(animation) = &self.animation {
            animation.apply(&mut object.animation);
        }
        if let Some(tags) = &self.tags {
            object.tags = tags.iter().cloned().collect();
        }
        if let Some(metadata) = &self.metadata {
            object
                .metadata
                .extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
}

/// Arguments for creating an object (and, recursively, its children)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    /// Requested name; the engine may adjust it to keep names unique
    pub name: Option<String>,
    #[serde(flatten)]
    pub fields: ObjectFields,
    pub children: Option<Vec<ObjectSpec>>,
}

impl ObjectSpec {
    /// Spec with just a name and geometry kind
    pub fn named(name: impl Into<String>, kind: GeometryKind) -> Self {
        Self {
            name: Some(name.into()),
            fields: ObjectFields {
                geometry: Some(GeometrySpec {
                    kind: Some(kind),
                    ..Default::default()
                }),
                ..Default::default()
            },
            children: None,
        }
    }
}

/// Arguments for modifying an existing object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatch {
    /// Target object
    pub name: String,
    #[serde(flatten)]
    pub fields: ObjectFields,
}

/// Partial environment settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentPatch {
    pub sky_color: Option<ColorSpec>,
    pub ground_color: Option<ColorSpec>,
    pub fog_enabled: Option<bool>,
    pub fog_color: Option<ColorSpec>,
    pub fog_near: Option<f64>,
    pub fog_far: Option<f64>,
    pub ambient_light_color: Option<ColorSpec>,
    pub ambient_light_intensity: Option<f64>,
    pub sun_color: Option<ColorSpec>,
    pub sun_intensity: Option<f64>,
    pub sun_position: Option<Vec3Spec>,
    pub time_of_day: Option<TimeOfDay>,
}

impl EnvironmentPatch {
    pub fn apply(&self, env: &mut EnvironmentSettings) {
        if let Some(c) = &self.sky_color {
            env.sky_color = c.resolve(env.sky_color);
        }
        if let Some(c) = &self.ground_color {
            env.ground_color = c.resolve(env.ground_color);
        }
        if let Some(v) = self.fog_enabled {
            env.fog_enabled = v;
        }
        if let Some(c) = &self.fog_color {
            env.fog_color = Some(c.resolve(env.fog_color.unwrap_or(Color::WHITE)));
        }
        if let Some(v) = self.fog_near {
            env.fog_near = v;
        }
        if let Some(v) = self.fog_far {
            env.fog_far = v;
        }
        if let Some(c) = &self.ambient_light_color {
            env.ambient_light_color = c.resolve(env.ambient_light_color);
        }
        if let Some(v) = self.ambient_light_intensity {
            env.ambient_light_intensity = v;
        }
        if let Some(c) = &self.sun_color {
            env.sun_color = c.resolve(env.sun_color);
        }
        if let Some(v) = self.sun_intensity {
            env.sun_intensity = v;
        }
        if let Some(p) = &self.sun_position {
            env.sun_position = p.resolve(env.sun_position);
        }
        if let Some(t) = self.time_of_day {
            env.time_of_day = t;
        }
    }
}

/// Arguments for adding a terrain patch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainSpec {
    #[serde(rename = "type")]
    pub kind: Option<TerrainKind>,
    pub size: Option<f64>,
    pub height: Option<f64>,
    pub color: Option<ColorSpec>,
    pub segments: Option<u32>,
    pub seed: Option<u64>,
}

impl TerrainSpec {
    /// Build a terrain patch over the documented defaults
    pub fn build(&self) -> TerrainPatch {
        let defaults = TerrainPatch::default();
        TerrainPatch {
            kind: self.kind.unwrap_or(defaults.kind),
            size: self.size.unwrap_or(defaults.size),
            height: self.height.unwrap_or(defaults.height),
            color: self
                .color
                .map(|c| c.resolve(defaults.color))
                .unwrap_or(defaults.color),
            segments: self.segments.unwrap_or(defaults.segments),
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_fields_are_absent() {
        let patch: ObjectPatch = serde_json::from_value(json!({
            "name": "box",
            "position": null,
            "material": { "color": null, "metalness": 0.8 }
        }))
        .unwrap();
        assert!(patch.fields.position.is_none());
        let material = patch.fields.material.unwrap();
        assert!(material.color.is_none());
        assert_eq!(material.metalness, Some(0.8));
    }

    #[test]
    fn test_partial_vector_keeps_base() {
        let spec = Vec3Spec { x: Some(5.0), y: None, z: None };
        assert_eq!(spec.resolve(Vector3::new(1.0, 2.0, 3.0)), Vector3::new(5.0, 2.0, 3.0));
    }

    #[test]
    fn test_geometry_defaults_to_box() {
        let spec: GeometrySpec = serde_json::from_value(json!({ "width": 2 })).unwrap();
        assert_eq!(
            spec.build(),
            Geometry::Box { width: Some(2.0), height: None, depth: None }
        );
    }

    #[test]
    fn test_geometry_drops_irrelevant_fields() {
        let spec: GeometrySpec =
            serde_json::from_value(json!({ "type": "sphere", "radius": 1.5, "depth": 9 })).unwrap();
        assert_eq!(
            spec.build(),
            Geometry::Sphere { radius: Some(1.5), width_segments: None, height_segments: None }
        );
    }

    #[test]
    fn test_geometry_overlay_same_kind_merges() {
        let current = Geometry::Box { width: Some(1.0), height: Some(2.0), depth: Some(3.0) };
        let spec = GeometrySpec { height: Some(5.0), ..Default::default() };
        assert_eq!(
            spec.overlay(&current),
            Geometry::Box { width: Some(1.0), height: Some(5.0), depth: Some(3.0) }
        );
    }

    #[test]
    fn test_geometry_overlay_new_kind_rebuilds() {
        let current = Geometry::Box { width: Some(1.0), height: Some(2.0), depth: Some(3.0) };
        let spec = GeometrySpec {
            kind: Some(GeometryKind::Cone),
            radius: Some(0.5),
            ..Default::default()
        };
        assert_eq!(
            spec.overlay(&current),
            Geometry::Cone { radius: Some(0.5), height: None, radial_segments: None }
        );
    }

    #[test]
    fn test_unknown_enum_value_rejected() {
        let result: Result<GeometrySpec, _> = serde_json::from_value(json!({ "type": "pyramid" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_terrain_defaults() {
        let terrain = TerrainSpec::default().build();
        assert_eq!(terrain, TerrainPatch::default());
        assert_eq!(terrain.segments, 32);
        assert!(terrain.seed.is_none());
    }
}
