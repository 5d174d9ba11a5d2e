//! Tool catalogue
//!
//! The closed set of tools offered to the agent, their JSON-schema
//! definitions in OpenAI function format, and the typed [`ToolCall`] each
//! invocation is decoded into before it reaches the world.

use std::sync::OnceLock;

use dream_world::{EnvironmentPatch, ObjectPatch, ObjectSpec, TerrainSpec, Vec3Spec};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::dispatcher::ToolError;

/// Fixed world-builder instructions, sent ahead of every request
pub const SYSTEM_PROMPT: &str = "\
You are the Dreamscape World Builder, an AI that creates immersive 3D environments in real-time \
based on what the user describes. You exist inside a 3D game engine.

Your role:
1. Listen to what the user describes or imagines
2. Use your tools to build that world around them
3. Compose rich scenes rather than isolated basic shapes
4. Narrate the experience to set mood and atmosphere
5. Maintain continuity with what is already in the scene

Guidelines:
- Always use the narrate tool to describe what you are creating
- Create many objects to build a scene (a forest needs trees, bushes and rocks)
- Vary positions, sizes and rotations so scenes feel natural
- Use set_environment for lighting and atmosphere, create_terrain for ground surfaces
- Use children to build composite shapes (a tree is a cylinder trunk plus a sphere canopy)
- Use generate_3d_model only for shapes the parametric primitives cannot express
- If a tool reports an error, correct the call and try again

Object naming: use descriptive snake_case names like 'tall_pine_1', 'mossy_boulder', 'red_barn'. \
If a name is taken the world appends a suffix; always refer to objects by the name reported back.

Position guide: the user starts at (0, 1.6, 0). Y=0 is ground level. Spread objects naturally \
in the XZ plane.";

/// Every tool the agent may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    CreateObject,
    ModifyObject,
    RemoveObject,
    SetEnvironment,
    CreateTerrain,
    Narrate,
    Generate3dModel,
}

impl ToolKind {
    /// All tools, in catalogue order
    pub const ALL: [ToolKind; 7] = [
        Self::CreateObject,
        Self::ModifyObject,
        Self::RemoveObject,
        Self::SetEnvironment,
        Self::CreateTerrain,
        Self::Narrate,
        Self::Generate3dModel,
    ];

    /// Wire name
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateObject => "create_object",
            Self::ModifyObject => "modify_object",
            Self::RemoveObject => "remove_object",
            Self::SetEnvironment => "set_environment",
            Self::CreateTerrain => "create_terrain",
            Self::Narrate => "narrate",
            Self::Generate3dModel => "generate_3d_model",
        }
    }

    /// Look up a tool by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Arguments that must be present and non-null
    pub fn required_args(&self) -> &'static [&'static str] {
        match self {
            Self::CreateObject => &["name", "geometry"],
            Self::ModifyObject | Self::RemoveObject => &["name"],
            Self::SetEnvironment => &[],
            Self::CreateTerrain => &["type"],
            Self::Narrate => &["text"],
            Self::Generate3dModel => &["code", "object_name"],
        }
    }
}

/// Arguments of `generate_3d_model`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelRequest {
    /// Source handed to the mesh generator
    pub code: String,
    pub object_name: String,
    #[serde(default)]
    pub position: Option<Vec3Spec>,
    #[serde(default)]
    pub rotation: Option<Vec3Spec>,
    #[serde(default)]
    pub scale: Option<Vec3Spec>,
}

#[derive(Deserialize)]
struct NameArgs {
    name: String,
}

#[derive(Deserialize)]
struct TextArgs {
    text: String,
}

/// A decoded tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    CreateObject(ObjectSpec),
    ModifyObject(ObjectPatch),
    RemoveObject { name: String },
    SetEnvironment(EnvironmentPatch),
    CreateTerrain(TerrainSpec),
    Narrate { text: String },
    Generate3dModel(ModelRequest),
}

impl ToolCall {
    /// Decode a named invocation.
    ///
    /// Fails on unknown names, missing required arguments, and arguments
    /// that do not fit the tool's schema.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, ToolError> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = match arguments {
            Value::Object(_) => arguments.clone(),
            Value::Null => Value::Object(Default::default()),
            other => {
                return Err(ToolError::InvalidArguments {
                    tool: name.to_string(),
                    reason: format!("expected an object, got {}", other),
                })
            }
        };

        for field in kind.required_args() {
            if args.get(field).map_or(true, Value::is_null) {
                return Err(ToolError::InvalidArguments {
                    tool: name.to_string(),
                    reason: format!("missing required argument '{}'", field),
                });
            }
        }

        let invalid = |err: serde_json::Error| ToolError::InvalidArguments {
            tool: name.to_string(),
            reason: err.to_string(),
        };

        let call = match kind {
            ToolKind::CreateObject => Self::CreateObject(serde_json::from_value(args).map_err(invalid)?),
            ToolKind::ModifyObject => Self::ModifyObject(serde_json::from_value(args).map_err(invalid)?),
            ToolKind::RemoveObject => {
                let NameArgs { name } = serde_json::from_value(args).map_err(invalid)?;
                Self::RemoveObject { name }
            }
            ToolKind::SetEnvironment => {
                Self::SetEnvironment(serde_json::from_value(args).map_err(invalid)?)
            }
            ToolKind::CreateTerrain => Self::CreateTerrain(serde_json::from_value(args).map_err(invalid)?),
            ToolKind::Narrate => {
                let TextArgs { text } = serde_json::from_value(args).map_err(invalid)?;
                Self::Narrate { text }
            }
            ToolKind::Generate3dModel => {
                Self::Generate3dModel(serde_json::from_value(args).map_err(invalid)?)
            }
        };
        Ok(call)
    }

    /// Tool this call targets
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::CreateObject(_) => ToolKind::CreateObject,
            Self::ModifyObject(_) => ToolKind::ModifyObject,
            Self::RemoveObject { .. } => ToolKind::RemoveObject,
            Self::SetEnvironment(_) => ToolKind::SetEnvironment,
            Self::CreateTerrain(_) => ToolKind::CreateTerrain,
            Self::Narrate { .. } => ToolKind::Narrate,
            Self::Generate3dModel(_) => ToolKind::Generate3dModel,
        }
    }
}

/// The full tool catalogue, in OpenAI function format
pub fn catalogue() -> &'static Value {
    static CATALOGUE: OnceLock<Value> = OnceLock::new();
    CATALOGUE.get_or_init(|| Value::Array(ToolKind::ALL.iter().map(definition).collect()))
}

fn vec3(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "x": { "type": "number" },
            "y": { "type": "number" },
            "z": { "type": "number" }
        }
    })
}

fn color() -> Value {
    json!({
        "type": "object",
        "properties": {
            "r": { "type": "number", "minimum": 0, "maximum": 1 },
            "g": { "type": "number", "minimum": 0, "maximum": 1 },
            "b": { "type": "number", "minimum": 0, "maximum": 1 }
        }
    })
}

fn geometry() -> Value {
    json!({
        "type": "object",
        "required": ["type"],
        "description": "Parametric shape, or 'custom' with explicit vertex data for novel geometry",
        "properties": {
            "type": {
                "type": "string",
                "enum": ["box", "sphere", "cylinder", "cone", "torus", "plane", "custom"]
            },
            "width": { "type": "number" },
            "height": { "type": "number" },
            "depth": { "type": "number" },
            "radius": { "type": "number" },
            "radius_top": { "type": "number" },
            "radius_bottom": { "type": "number" },
            "tube": { "type": "number" },
            "width_segments": { "type": "integer" },
            "height_segments": { "type": "integer" },
            "radial_segments": { "type": "integer" },
            "tubular_segments": { "type": "integer" },
            "vertices": {
                "type": "array",
                "items": { "type": "number" },
                "description": "Flat vertex positions [x1,y1,z1, x2,y2,z2, ...]"
            },
            "indices": {
                "type": "array",
                "items": { "type": "integer" },
                "description": "Triangle indices"
            },
            "normals": { "type": "array", "items": { "type": "number" } },
            "uvs": { "type": "array", "items": { "type": "number" } }
        }
    })
}

fn material() -> Value {
    json!({
        "type": "object",
        "properties": {
            "color": color(),
            "emissive": color(),
            "emissive_intensity": { "type": "number", "minimum": 0, "maximum": 5 },
            "metalness": { "type": "number", "minimum": 0, "maximum": 1 },
            "roughness": { "type": "number", "minimum": 0, "maximum": 1 },
            "opacity": { "type": "number", "minimum": 0, "maximum": 1 },
            "transparent": { "type": "boolean" },
            "wireframe": { "type": "boolean" },
            "flat_shading": { "type": "boolean" }
        }
    })
}

fn physics() -> Value {
    json!({
        "type": "object",
        "properties": {
            "has_gravity": { "type": "boolean" },
            "is_static": { "type": "boolean", "description": "If true, the object does not move" },
            "mass": { "type": "number" },
            "friction": { "type": "number" },
            "restitution": { "type": "number", "description": "Bounciness, 0-1" }
        }
    })
}

fn animation() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": {
                "type": "string",
                "enum": ["none", "rotate", "bob", "orbit"],
                "description": "rotate (spin), bob (up/down), orbit (circle around origin)"
            },
            "speed": { "type": "number" },
            "axis": vec3("Rotation axis"),
            "amplitude": { "type": "number" }
        }
    })
}

fn object_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert(
        "description".into(),
        json!({ "type": "string", "description": "What this object represents in the scene" }),
    );
    props.insert("position".into(), vec3("Position; y = 0 is ground level"));
    props.insert("rotation".into(), vec3("Rotation in radians"));
    props.insert("scale".into(), vec3("Scale, defaults to 1 on every axis"));
    props.insert("geometry".into(), geometry());
    props.insert("material".into(), material());
    props.insert("physics".into(), physics());
    props.insert("animation".into(), animation());
    props.insert(
        "tags".into(),
        json!({
            "type": "array",
            "items": { "type": "string" },
            "description": "Categories such as 'vegetation', 'building', 'creature'"
        }),
    );
    props.insert(
        "metadata".into(),
        json!({ "type": "object", "description": "Free-form key/value data" }),
    );
    props
}

fn definition(kind: &ToolKind) -> Value {
    let (description, properties) = match kind {
        ToolKind::CreateObject => {
            let mut props = object_properties();
            props.insert(
                "name".into(),
                json!({
                    "type": "string",
                    "description": "Unique descriptive name (e.g. 'old_oak_tree', 'red_barn')"
                }),
            );
            props.insert(
                "children".into(),
                json!({
                    "type": "array",
                    "description": "Child objects positioned relative to this parent, for composite objects",
                    "items": { "type": "object" }
                }),
            );
            (
                "Create a new 3D object in the world. Use parametric shapes (box, sphere, cylinder, \
                 cone, torus, plane) or custom geometry from vertex data. Compose complex objects \
                 with the children array. Vary colors, sizes and positions to build rich scenes.",
                Value::Object(props),
            )
        }
        ToolKind::ModifyObject => {
            let mut props = object_properties();
            props.insert(
                "name".into(),
                json!({ "type": "string", "description": "Name of the object to modify" }),
            );
            (
                "Modify an existing object. Provide the object name and only the properties to \
                 change; everything else is left as it is.",
                Value::Object(props),
            )
        }
        ToolKind::RemoveObject => (
            "Remove an object, and all of its children, from the world by name.",
            json!({
                "name": { "type": "string", "description": "Name of the object to remove" }
            }),
        ),
        ToolKind::SetEnvironment => (
            "Change global environment settings: sky color, fog, lighting and time of day. \
             Use this to set mood and atmosphere.",
            json!({
                "sky_color": color(),
                "ground_color": color(),
                "fog_enabled": { "type": "boolean" },
                "fog_color": color(),
                "fog_near": { "type": "number" },
                "fog_far": { "type": "number" },
                "ambient_light_color": color(),
                "ambient_light_intensity": { "type": "number", "minimum": 0, "maximum": 2 },
                "sun_color": color(),
                "sun_intensity": { "type": "number", "minimum": 0, "maximum": 3 },
                "sun_position": vec3("Sun position"),
                "time_of_day": { "type": "string", "enum": ["dawn", "day", "dusk", "night"] }
            }),
        ),
        ToolKind::CreateTerrain => (
            "Create a terrain surface: 'flat' (ground plane), 'hills' (rolling hills), \
             'mountains' (rugged terrain) or 'water' (flat reflective surface).",
            json!({
                "type": { "type": "string", "enum": ["flat", "hills", "mountains", "water"] },
                "size": { "type": "number", "description": "Size in world units" },
                "height": { "type": "number", "description": "Max height variation" },
                "color": color(),
                "segments": { "type": "integer", "description": "Mesh resolution" },
                "seed": { "type": "integer", "description": "Seed for reproducible terrain" }
            }),
        ),
        ToolKind::Narrate => (
            "Send narrative text to the user describing what is happening in the world. \
             Keep it evocative but concise.",
            json!({
                "text": { "type": "string", "description": "Narrative text shown to the user" }
            }),
        ),
        ToolKind::Generate3dModel => (
            "Generate a detailed 3D mesh by running code in the mesh generator, then place it in \
             the world. Use for shapes the parametric primitives cannot express.",
            json!({
                "code": { "type": "string", "description": "Source code that builds and saves the mesh" },
                "object_name": { "type": "string", "description": "Name for the placed model" },
                "position": vec3("Placement position"),
                "rotation": vec3("Placement rotation in radians"),
                "scale": vec3("Placement scale, defaults to 1 on every axis")
            }),
        ),
    };

    json!({
        "type": "function",
        "function": {
            "name": kind.name(),
            "description": description,
            "parameters": {
                "type": "object",
                "required": kind.required_args(),
                "properties": properties
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dream_world::{GeometryKind, TimeOfDay};

    #[test]
    fn test_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("teleport"), None);
    }

    #[test]
    fn test_catalogue_matches_kinds() {
        let tools = catalogue().as_array().unwrap();
        assert_eq!(tools.len(), ToolKind::ALL.len());
        for (tool, kind) in tools.iter().zip(ToolKind::ALL) {
            assert_eq!(tool["type"], "function");
            assert_eq!(tool["function"]["name"], kind.name());
            assert_eq!(tool["function"]["parameters"]["required"], json!(kind.required_args()));
        }
    }

    #[test]
    fn test_parse_create_object() {
        let call = ToolCall::parse(
            "create_object",
            &json!({ "name": "tree", "geometry": { "type": "cylinder" } }),
        )
        .unwrap();
        match call {
            ToolCall::CreateObject(spec) => {
                assert_eq!(spec.name.as_deref(), Some("tree"));
                let geometry = spec.fields.geometry.unwrap();
                assert_eq!(geometry.kind, Some(GeometryKind::Cylinder));
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_parse_environment_without_args() {
        let call = ToolCall::parse("set_environment", &Value::Null).unwrap();
        assert_eq!(call, ToolCall::SetEnvironment(EnvironmentPatch::default()));

        let call = ToolCall::parse("set_environment", &json!({ "time_of_day": "dusk" })).unwrap();
        match call {
            ToolCall::SetEnvironment(patch) => assert_eq!(patch.time_of_day, Some(TimeOfDay::Dusk)),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_tool() {
        let err = ToolCall::parse("fly", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: fly");
    }

    #[test]
    fn test_parse_rejects_missing_required() {
        let err = ToolCall::parse("create_object", &json!({ "name": "tree" })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert!(err.to_string().contains("geometry"));

        let err = ToolCall::parse("narrate", &json!({ "text": null })).unwrap_err();
        assert!(err.to_string().contains("text"));
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        let err = ToolCall::parse("create_terrain", &json!({ "type": "lava" })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = ToolCall::parse("remove_object", &json!("ghost")).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn test_parse_model_request() {
        let call = ToolCall::parse(
            "generate_3d_model",
            &json!({
                "code": "save_model(mesh)",
                "object_name": "statue",
                "position": { "x": 3 }
            }),
        )
        .unwrap();
        match call {
            ToolCall::Generate3dModel(req) => {
                assert_eq!(req.object_name, "statue");
                assert_eq!(req.position.unwrap().x, Some(3.0));
                assert!(req.scale.is_none());
            }
            other => panic!("unexpected call {:?}", other),
        }
    }
}
