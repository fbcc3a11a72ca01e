use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A typed value for a named shader uniform.
///
/// The serialized form matches what hosts send over the wire:
/// `{"type": "float", "value": 8}`, `{"type": "vec2", "value": [1, 2]}`,
/// `{"type": "sampler2D", "value": "textures/noise.png"}`. Vector variants
/// carry fixed-size arrays, so a value whose shape does not match its tag is
/// rejected at the parsing boundary instead of reaching the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// An image-backed sampler; the string is a URL or a filesystem path.
    #[serde(rename = "sampler2D")]
    Sampler2D(String),
}

/// Initial uniform assignments applied right after program linking.
pub type UniformConfig = HashMap<String, UniformValue>;

/// Immutable configuration passed to the engine at start-up.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Initial surface size in physical pixels.
    pub surface_size: (u32, u32),
    /// Window title shown by the host environment.
    pub title: String,
    /// Fragment shader source; `None` selects the built-in pattern.
    pub fragment_source: Option<String>,
    /// Uniforms applied once at construction.
    pub initial_uniforms: UniformConfig,
    /// Sampler uniform name to bind the default camera to, if any.
    pub camera_uniform: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            surface_size: (800, 600),
            title: "glslview".to_string(),
            fragment_source: None,
            initial_uniforms: UniformConfig::default(),
            camera_uniform: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_scalars() {
        let float: UniformValue = serde_json::from_str(r#"{"type":"float","value":8}"#).unwrap();
        assert_eq!(float, UniformValue::Float(8.0));

        let int: UniformValue = serde_json::from_str(r#"{"type":"int","value":-3}"#).unwrap();
        assert_eq!(int, UniformValue::Int(-3));

        let flag: UniformValue = serde_json::from_str(r#"{"type":"bool","value":true}"#).unwrap();
        assert_eq!(flag, UniformValue::Bool(true));
    }

    #[test]
    fn parses_vectors_with_exact_arity() {
        let vec3: UniformValue =
            serde_json::from_str(r#"{"type":"vec3","value":[0.1, 0.2, 0.3]}"#).unwrap();
        assert_eq!(vec3, UniformValue::Vec3([0.1, 0.2, 0.3]));

        // A vec2 payload with three components is a shape error, not a truncation.
        let wrong_arity =
            serde_json::from_str::<UniformValue>(r#"{"type":"vec2","value":[1, 2, 3]}"#);
        assert!(wrong_arity.is_err());
    }

    #[test]
    fn sampler_tag_keeps_original_casing() {
        let sampler: UniformValue =
            serde_json::from_str(r#"{"type":"sampler2D","value":"noise.png"}"#).unwrap();
        assert_eq!(sampler, UniformValue::Sampler2D("noise.png".into()));
    }

    #[test]
    fn rejects_unknown_tags() {
        assert!(serde_json::from_str::<UniformValue>(r#"{"type":"mat4","value":[]}"#).is_err());
    }
}
