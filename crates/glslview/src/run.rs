use std::fs;

use anyhow::{Context, Result};
use engine::{Engine, EngineConfig, UniformConfig, UniformValue};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(args: Cli) -> Result<()> {
    let fragment_source = args
        .shader
        .as_ref()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("failed to read shader at {}", path.display()))
        })
        .transpose()?;

    let initial_uniforms = args
        .uniforms
        .as_deref()
        .map(parse_uniform_config)
        .transpose()?
        .unwrap_or_default();

    let config = EngineConfig {
        surface_size: args.size.unwrap_or((800, 600)),
        title: args.title,
        fragment_source,
        initial_uniforms,
        camera_uniform: args.camera,
    };

    tracing::info!(
        width = config.surface_size.0,
        height = config.surface_size.1,
        uniforms = config.initial_uniforms.len(),
        camera = config.camera_uniform.is_some(),
        "starting shader canvas"
    );
    Engine::new(config).run()
}

/// Parses the host-facing uniform JSON leniently: entries with an unknown
/// tag or a value shape that does not match their tag are warned about and
/// skipped, so one bad widget binding cannot take down the rest.
fn parse_uniform_config(raw: &str) -> Result<UniformConfig> {
    let text = if let Some(path) = raw.strip_prefix('@') {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read uniform config at {path}"))?
    } else {
        raw.to_string()
    };

    let entries: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text).context("uniform config is not a JSON object")?;

    let mut config = UniformConfig::new();
    for (name, value) in entries {
        match serde_json::from_value::<UniformValue>(value) {
            Ok(parsed) => {
                config.insert(name, parsed);
            }
            Err(err) => {
                tracing::warn!(uniform = %name, error = %err, "skipping unsupported uniform value");
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_a_mixed_uniform_config() {
        let config = parse_uniform_config(
            r#"{
                "u_grid": {"type": "float", "value": 8},
                "u_tint": {"type": "vec3", "value": [1, 0, 0.5]},
                "u_texture": {"type": "sampler2D", "value": "noise.png"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.len(), 3);
        assert_eq!(config["u_grid"], UniformValue::Float(8.0));
        assert_eq!(config["u_tint"], UniformValue::Vec3([1.0, 0.0, 0.5]));
        assert_eq!(
            config["u_texture"],
            UniformValue::Sampler2D("noise.png".into())
        );
    }

    #[test]
    fn skips_entries_with_unknown_tags() {
        let config = parse_uniform_config(
            r#"{
                "u_ok": {"type": "int", "value": 2},
                "u_bad": {"type": "mat4", "value": []}
            }"#,
        )
        .unwrap();

        assert_eq!(config.len(), 1);
        assert!(config.contains_key("u_ok"));
    }

    #[test]
    fn skips_entries_whose_shape_mismatches_the_tag() {
        let config = parse_uniform_config(
            r#"{"u_pair": {"type": "vec2", "value": [1, 2, 3]}}"#,
        )
        .unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn rejects_non_object_top_level() {
        assert!(parse_uniform_config("[1, 2, 3]").is_err());
    }

    #[test]
    fn reads_config_from_a_file_reference() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"u_level": {{"type": "float", "value": 0.5}}}}"#).unwrap();

        let reference = format!("@{}", file.path().display());
        let config = parse_uniform_config(&reference).unwrap();
        assert_eq!(config["u_level"], UniformValue::Float(0.5));
    }
}
