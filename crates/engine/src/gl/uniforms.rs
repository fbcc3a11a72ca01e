use std::collections::HashMap;

use glow::HasContext;

/// Names the render loop writes on every tick; pre-resolved at construction.
pub(crate) const BUILTIN_UNIFORMS: [&str; 3] = ["u_time", "u_resolution", "u_mouse"];

/// Maps uniform names to their locations in the linked program.
///
/// A name the program does not expose is recorded as an inert binding: the
/// first reference emits one warning, later writes silently no-op. This keeps
/// hosts working against shaders whose optimizer stripped an unused uniform.
pub(crate) struct UniformRegistry {
    program: glow::Program,
    locations: HashMap<String, Option<glow::UniformLocation>>,
}

impl UniformRegistry {
    pub(crate) fn new(gl: &glow::Context, program: glow::Program) -> Self {
        let mut registry = Self {
            program,
            locations: HashMap::new(),
        };
        for name in BUILTIN_UNIFORMS {
            let location = unsafe { gl.get_uniform_location(program, name) };
            registry.locations.insert(name.to_string(), location);
        }
        registry
    }

    /// Resolves a name, warning the first time it turns out to be absent.
    fn resolve(&mut self, gl: &glow::Context, name: &str) -> Option<glow::UniformLocation> {
        if let Some(known) = self.locations.get(name) {
            return known.clone();
        }
        let location = unsafe { gl.get_uniform_location(self.program, name) };
        if location.is_none() {
            tracing::warn!(uniform = name, "uniform not found in program; writes ignored");
        }
        self.locations.insert(name.to_string(), location.clone());
        location
    }

    /// Resolves without the warning, for companion uniforms whose absence is
    /// expected (`X_size`).
    fn resolve_quiet(&mut self, gl: &glow::Context, name: &str) -> Option<glow::UniformLocation> {
        if let Some(known) = self.locations.get(name) {
            return known.clone();
        }
        let location = unsafe { gl.get_uniform_location(self.program, name) };
        self.locations.insert(name.to_string(), location.clone());
        location
    }

    pub(crate) fn set_float(&mut self, gl: &glow::Context, name: &str, value: f32) {
        if let Some(location) = self.resolve(gl, name) {
            unsafe { gl.uniform_1_f32(Some(&location), value) };
        }
    }

    pub(crate) fn set_int(&mut self, gl: &glow::Context, name: &str, value: i32) {
        if let Some(location) = self.resolve(gl, name) {
            unsafe { gl.uniform_1_i32(Some(&location), value) };
        }
    }

    pub(crate) fn set_bool(&mut self, gl: &glow::Context, name: &str, value: bool) {
        self.set_int(gl, name, i32::from(value));
    }

    pub(crate) fn set_vec2(&mut self, gl: &glow::Context, name: &str, value: [f32; 2]) {
        if let Some(location) = self.resolve(gl, name) {
            unsafe { gl.uniform_2_f32(Some(&location), value[0], value[1]) };
        }
    }

    pub(crate) fn set_vec3(&mut self, gl: &glow::Context, name: &str, value: [f32; 3]) {
        if let Some(location) = self.resolve(gl, name) {
            unsafe { gl.uniform_3_f32(Some(&location), value[0], value[1], value[2]) };
        }
    }

    pub(crate) fn set_vec4(&mut self, gl: &glow::Context, name: &str, value: [f32; 4]) {
        if let Some(location) = self.resolve(gl, name) {
            unsafe {
                gl.uniform_4_f32(Some(&location), value[0], value[1], value[2], value[3]);
            }
        }
    }

    /// Points a sampler uniform at a texture unit.
    pub(crate) fn set_sampler_unit(&mut self, gl: &glow::Context, name: &str, unit: u32) {
        self.set_int(gl, name, unit as i32);
    }

    /// Publishes the `X_size` companion for a loaded asset, if declared.
    pub(crate) fn publish_size(&mut self, gl: &glow::Context, name: &str, width: u32, height: u32) {
        let size_name = size_uniform_name(name);
        if let Some(location) = self.resolve_quiet(gl, &size_name) {
            unsafe { gl.uniform_2_f32(Some(&location), width as f32, height as f32) };
        }
    }
}

/// Companion-uniform naming convention: asset `X` publishes `X_size`.
pub(crate) fn size_uniform_name(name: &str) -> String {
    format!("{name}_size")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_uniform_follows_convention() {
        assert_eq!(size_uniform_name("u_texture"), "u_texture_size");
        assert_eq!(size_uniform_name("u_webcam"), "u_webcam_size");
    }

    #[test]
    fn builtins_cover_loop_written_names() {
        assert!(BUILTIN_UNIFORMS.contains(&"u_time"));
        assert!(BUILTIN_UNIFORMS.contains(&"u_resolution"));
        assert!(BUILTIN_UNIFORMS.contains(&"u_mouse"));
    }
}
