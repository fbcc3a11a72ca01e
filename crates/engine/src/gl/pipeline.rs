use glow::HasContext;
use thiserror::Error;

/// Failures raised while building the shader program.
///
/// Both variants carry the driver's diagnostic log verbatim; construction
/// aborts on either and any shader object compiled before the failure is
/// deleted first.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader compilation error:\n{log}")]
    Compile { stage: &'static str, log: String },
    #[error("program linking error:\n{log}")]
    Link { log: String },
    #[error("failed to allocate GL object: {0}")]
    Allocate(String),
}

/// Fixed vertex stage shared by every program.
pub(crate) const VERTEX_SHADER: &str = r"#version 330 core
in vec2 a_position;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Fragment stage used when the host supplies no shader of its own.
pub(crate) const DEFAULT_FRAGMENT_SHADER: &str = r"#version 330 core
uniform float u_time;
uniform vec2 u_resolution;
out vec4 frag_color;

void main() {
    vec2 uv = gl_FragCoord.xy / max(u_resolution, vec2(1.0));
    vec3 color = 0.5 + 0.5 * cos(u_time + uv.xyx + vec3(0.0, 2.0, 4.0));
    frag_color = vec4(color, 1.0);
}
";

/// Two clip-space triangles covering the unit square.
const QUAD_VERTICES: [f32; 12] = [
    -1.0, -1.0, 1.0, -1.0, -1.0, 1.0, //
    -1.0, 1.0, 1.0, -1.0, 1.0, 1.0,
];

pub(crate) const QUAD_VERTEX_COUNT: i32 = (QUAD_VERTICES.len() / 2) as i32;

/// Compiles and links the fixed vertex stage with the given fragment stage.
pub(crate) fn compile_program(
    gl: &glow::Context,
    fragment_source: &str,
) -> Result<glow::Program, ShaderError> {
    unsafe {
        let program = gl.create_program().map_err(ShaderError::Allocate)?;

        let vertex = match compile_shader(gl, glow::VERTEX_SHADER, "vertex", VERTEX_SHADER) {
            Ok(shader) => shader,
            Err(err) => {
                gl.delete_program(program);
                return Err(err);
            }
        };
        let fragment =
            match compile_shader(gl, glow::FRAGMENT_SHADER, "fragment", fragment_source) {
                Ok(shader) => shader,
                Err(err) => {
                    gl.delete_shader(vertex);
                    gl.delete_program(program);
                    return Err(err);
                }
            };

        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);

        let linked = gl.get_program_link_status(program);
        let log = gl.get_program_info_log(program);

        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);

        if !linked {
            gl.delete_program(program);
            return Err(ShaderError::Link { log });
        }

        Ok(program)
    }
}

fn compile_shader(
    gl: &glow::Context,
    kind: u32,
    stage: &'static str,
    source: &str,
) -> Result<glow::Shader, ShaderError> {
    unsafe {
        let shader = gl.create_shader(kind).map_err(ShaderError::Allocate)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(ShaderError::Compile { stage, log });
        }
        Ok(shader)
    }
}

/// The static full-screen quad, uploaded once at construction.
pub(crate) struct Quad {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
}

impl Quad {
    pub(crate) fn upload(gl: &glow::Context, program: glow::Program) -> Result<Self, ShaderError> {
        unsafe {
            let vao = gl.create_vertex_array().map_err(ShaderError::Allocate)?;
            let vbo = gl.create_buffer().map_err(ShaderError::Allocate)?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&QUAD_VERTICES),
                glow::STATIC_DRAW,
            );

            if let Some(location) = gl.get_attrib_location(program, "a_position") {
                gl.enable_vertex_attrib_array(location);
                gl.vertex_attrib_pointer_f32(location, 2, glow::FLOAT, false, 0, 0);
            }

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            Ok(Self { vao, vbo })
        }
    }

    pub(crate) fn draw(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(glow::TRIANGLES, 0, QUAD_VERTEX_COUNT);
        }
    }

    pub(crate) fn release(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_two_triangles() {
        assert_eq!(QUAD_VERTEX_COUNT, 6);
        // Every coordinate sits on the clip-space unit square.
        assert!(QUAD_VERTICES.iter().all(|c| c.abs() == 1.0));
    }

    #[test]
    fn default_fragment_declares_builtins() {
        assert!(DEFAULT_FRAGMENT_SHADER.contains("uniform float u_time"));
        assert!(DEFAULT_FRAGMENT_SHADER.contains("uniform vec2 u_resolution"));
        assert!(VERTEX_SHADER.contains("a_position"));
    }
}
