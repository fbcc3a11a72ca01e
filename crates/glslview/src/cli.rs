use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "glslview",
    author,
    version,
    about = "Windowed GLSL shader canvas with live typed uniforms"
)]
pub struct Cli {
    /// Fragment shader file; omit to render the built-in pattern.
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    /// Initial uniforms as inline JSON or `@file.json`
    /// (e.g. `{"u_grid": {"type": "float", "value": 8}}`).
    #[arg(long, value_name = "JSON|@FILE")]
    pub uniforms: Option<String>,

    /// Surface size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Window title.
    #[arg(long, default_value = "glslview")]
    pub title: String,

    /// Bind the default webcam to the named sampler uniform.
    #[arg(long, value_name = "UNIFORM")]
    pub camera: Option<String>,
}

fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be non-zero".to_string());
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_sizes() {
        assert_eq!(parse_surface_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_surface_size(" 640 X 480 "), Ok((640, 480)));
    }

    #[test]
    fn rejects_malformed_sizes() {
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("axb").is_err());
        assert!(parse_surface_size("0x720").is_err());
    }
}
