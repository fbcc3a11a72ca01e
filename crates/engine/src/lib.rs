//! Shader canvas engine for glslview.
//!
//! The crate glues a winit window, an OpenGL context, and a single
//! caller-supplied fragment shader together, then keeps the result animating
//! while the host pushes typed uniform values in. The overall flow is:
//!
//! ```text
//!   CLI / host
//!        │ EngineConfig
//!        ▼
//!   Engine::run ──▶ ShaderView ──▶ winit event loop ──▶ render_frame()
//!        ▲                │                  │
//!        │                │                  └─▶ u_time / u_mouse / draw
//!        │                └─▶ set_uniform() ─▶ UniformRegistry / AssetManager
//! ```
//!
//! `ShaderView` owns every GPU resource (context, program, quad, textures)
//! plus the camera stream, while `Engine` is the thin entry point that runs
//! the event loop. Image uniforms bind a placeholder immediately and swap in
//! their decoded content when the background load completes; the loop keeps
//! running through any steady-state failure.

mod camera;
mod gl;
mod types;

use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glow::HasContext;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::gl::assets::AssetManager;
use crate::gl::context::DrawSurface;
use crate::gl::pipeline::{compile_program, Quad, DEFAULT_FRAGMENT_SHADER};
use crate::gl::uniforms::UniformRegistry;

pub use crate::camera::CameraError;
pub use crate::gl::pipeline::ShaderError;
pub use crate::types::{EngineConfig, UniformConfig, UniformValue};

/// High-level entry point that owns the chosen configuration.
///
/// The heavy lifting lives inside [`ShaderView`]; `Engine` creates the event
/// loop, builds the view, and forwards events until the window closes.
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Builds an engine for the supplied configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Opens the surface and drives the render loop until teardown.
    ///
    /// Construction failures (context acquisition, shader compile/link,
    /// camera setup) surface synchronously; once the loop is running, only
    /// window closure ends it.
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to initialize event loop")?;
        let mut view = ShaderView::new(&event_loop, &self.config)?;
        view.window().request_redraw();

        event_loop
            .run(move |event, elwt| {
                // Drive redraws via vblank by waiting between events.
                elwt.set_control_flow(ControlFlow::Wait);

                match event {
                    Event::WindowEvent { window_id, event } if window_id == view.window().id() => {
                        match event {
                            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                                elwt.exit();
                            }
                            WindowEvent::CursorMoved { position, .. } => {
                                view.pointer_moved(position);
                            }
                            WindowEvent::Resized(new_size) => {
                                view.resize(new_size);
                            }
                            WindowEvent::RedrawRequested => {
                                if let Err(err) = view.render_frame() {
                                    tracing::warn!(error = %err, "frame failed; continuing");
                                }
                            }
                            _ => {}
                        }
                    }
                    Event::AboutToWait => {
                        // Schedule the next tick once winit is about to wait
                        // for events again.
                        view.window().request_redraw();
                    }
                    _ => {}
                }
            })
            .map_err(|err| anyhow!("event loop error: {err}"))
    }
}

/// Aggregates every resource needed to present a frame.
///
/// The layout mirrors the lifetime relationship between objects:
///
/// ```text
///   Window ─▶ DrawSurface (GL context)
///                  │
///                  ├─▶ Program + Quad
///                  ├─▶ UniformRegistry (name → location)
///                  └─▶ AssetManager (texture units, camera)
/// ```
///
/// Dropping the view is the teardown path: textures, geometry, and the
/// program are deleted, and an active camera stream is stopped.
pub struct ShaderView {
    // Field order fixes teardown order: the GL surface and context go away
    // before the window whose handle they were created from.
    surface: DrawSurface,
    window: Window,
    program: glow::Program,
    quad: Quad,
    uniforms: UniformRegistry,
    assets: AssetManager,
    mouse: MouseState,
    size: PhysicalSize<u32>,
    started_at: Option<Instant>,
}

impl ShaderView {
    /// Creates a fully initialised view on the given event loop target.
    ///
    /// Compiles the program, uploads the quad, seeds the built-in uniforms,
    /// applies the initial uniform set, and opens the camera feed when one
    /// is requested. Any failure here aborts construction; GL objects
    /// created before the failing step are released along the way.
    pub fn new(target: &EventLoopWindowTarget<()>, config: &EngineConfig) -> Result<Self> {
        let (width, height) = config.surface_size;
        let window_builder = WindowBuilder::new()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(width, height));
        let (window, surface) = DrawSurface::new(target, window_builder)?;

        let fragment_source = config
            .fragment_source
            .as_deref()
            .unwrap_or(DEFAULT_FRAGMENT_SHADER);
        let program = compile_program(&surface.gl, fragment_source)?;
        unsafe { surface.gl.use_program(Some(program)) };

        let quad = Quad::upload(&surface.gl, program)?;
        let uniforms = UniformRegistry::new(&surface.gl, program);
        let assets = AssetManager::new(&surface.gl);

        let size = window.inner_size();
        let mut view = Self {
            window,
            surface,
            program,
            quad,
            uniforms,
            assets,
            mouse: MouseState::default(),
            size,
            started_at: None,
        };
        view.surface.resize(size);
        view.uniforms.set_vec2(
            &view.surface.gl,
            "u_resolution",
            [size.width as f32, size.height as f32],
        );

        for (name, value) in &config.initial_uniforms {
            view.set_uniform(name, value);
        }
        if let Some(name) = &config.camera_uniform {
            view.assets
                .setup_camera(&view.surface.gl, &mut view.uniforms, name)
                .with_context(|| format!("failed to bind camera to uniform {name}"))?;
        }

        Ok(view)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Writes a typed value to the named uniform.
    ///
    /// Callable at any time; the value is observed by the next draw. Image
    /// sources route to the asset loader, which binds a placeholder now and
    /// the real content when its background load completes.
    pub fn set_uniform(&mut self, name: &str, value: &UniformValue) {
        let gl = &self.surface.gl;
        match value {
            UniformValue::Float(v) => self.uniforms.set_float(gl, name, *v),
            UniformValue::Int(v) => self.uniforms.set_int(gl, name, *v),
            UniformValue::Bool(v) => self.uniforms.set_bool(gl, name, *v),
            UniformValue::Vec2(v) => self.uniforms.set_vec2(gl, name, *v),
            UniformValue::Vec3(v) => self.uniforms.set_vec3(gl, name, *v),
            UniformValue::Vec4(v) => self.uniforms.set_vec4(gl, name, *v),
            UniformValue::Sampler2D(source) => {
                self.assets.load_image(gl, &mut self.uniforms, name, source);
            }
        }
    }

    /// Records the latest pointer position in surface coordinates.
    pub fn pointer_moved(&mut self, position: PhysicalPosition<f64>) {
        self.mouse.handle_cursor_moved(position);
    }

    /// Reacts to surface size changes: drawable, viewport, `u_resolution`.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.surface.resize(new_size);
        self.uniforms.set_vec2(
            &self.surface.gl,
            "u_resolution",
            [new_size.width as f32, new_size.height as f32],
        );
    }

    /// One render tick: clear, apply finished loads, write built-ins,
    /// rebind textures, draw, present.
    pub fn render_frame(&mut self) -> Result<()> {
        let now = Instant::now();
        let started_at = *self.started_at.get_or_insert(now);

        let gl = &self.surface.gl;
        unsafe {
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT);
        }

        self.assets.drain_events(gl, &mut self.uniforms);
        self.assets.pump_camera(gl, &mut self.uniforms);

        let elapsed = now.duration_since(started_at).as_secs_f32();
        self.uniforms.set_float(gl, "u_time", elapsed);
        let mouse = self.mouse.as_uniform(self.size.height as f32);
        self.uniforms.set_vec2(gl, "u_mouse", mouse);

        self.assets.rebind_all(gl);
        self.quad.draw(gl);
        self.surface.swap()
    }

    /// Texture units currently tracked by the asset loader.
    pub fn tracked_texture_units(&self) -> usize {
        self.assets.tracked_units()
    }
}

impl Drop for ShaderView {
    fn drop(&mut self) {
        let gl = &self.surface.gl;
        self.assets.release(gl);
        self.quad.release(gl);
        unsafe { gl.delete_program(self.program) };
    }
}

/// Pointer tracking for the `u_mouse` uniform.
#[derive(Default)]
struct MouseState {
    position: Option<PhysicalPosition<f64>>,
}

impl MouseState {
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.position = Some(position);
    }

    /// Produces surface-local coordinates with the vertical axis flipped to
    /// a bottom-left origin, matching the shading convention.
    fn as_uniform(&self, height: f32) -> [f32; 2] {
        match self.position {
            Some(position) => [position.x as f32, height - position.y as f32],
            None => [0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_uniform_flips_vertical_axis() {
        let mut mouse = MouseState::default();
        mouse.handle_cursor_moved(PhysicalPosition::new(120.0, 100.0));
        assert_eq!(mouse.as_uniform(480.0), [120.0, 380.0]);
    }

    #[test]
    fn mouse_uniform_defaults_to_origin() {
        let mouse = MouseState::default();
        assert_eq!(mouse.as_uniform(480.0), [0.0, 0.0]);
    }
}
