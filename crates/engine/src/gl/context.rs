use std::ffi::CString;
use std::num::NonZeroU32;

use anyhow::{anyhow, Context, Result};
use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasRawWindowHandle;
use winit::dpi::PhysicalSize;
use winit::event_loop::EventLoopWindowTarget;
use winit::window::{Window, WindowBuilder};

/// Owns the GL context and the drawable surface behind the window.
///
/// Swaps happen once per display refresh (swap interval 1), which is what
/// paces the render loop: `swap` blocks until the compositor consumes the
/// frame.
pub(crate) struct DrawSurface {
    pub(crate) gl: glow::Context,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
}

impl DrawSurface {
    /// Builds the window plus a current GL 3.3 core context for it.
    pub(crate) fn new(
        target: &EventLoopWindowTarget<()>,
        window_builder: WindowBuilder,
    ) -> Result<(Window, Self)> {
        let template = ConfigTemplateBuilder::new().with_alpha_size(8).with_depth_size(0);
        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

        let (window, gl_config) = display_builder
            .build(target, template, |mut configs| {
                configs.next().expect("no GL framebuffer configs offered")
            })
            .map_err(|err| anyhow!("failed to build GL display: {err}"))?;
        let window = window.context("display builder produced no window")?;

        let raw_window_handle = window.raw_window_handle();
        let gl_display = gl_config.display();

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(raw_window_handle));
        let not_current = unsafe {
            gl_display
                .create_context(&gl_config, &context_attributes)
                .context("failed to create GL context")?
        };

        let size = window.inner_size();
        let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window_handle,
            non_zero(size.width),
            non_zero(size.height),
        );
        let surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &attrs)
                .context("failed to create window surface")?
        };

        let context = not_current
            .make_current(&surface)
            .context("failed to make GL context current")?;

        if let Err(err) =
            surface.set_swap_interval(&context, SwapInterval::Wait(non_zero(1)))
        {
            tracing::warn!(error = %err, "vsync unavailable; frames pace off the compositor");
        }

        let gl = unsafe {
            glow::Context::from_loader_function(|symbol| {
                let symbol = CString::new(symbol).expect("GL symbol name contained NUL");
                gl_display.get_proc_address(&symbol).cast()
            })
        };

        Ok((window, Self { gl, surface, context }))
    }

    /// Resizes the drawable and reissues the viewport call.
    pub(crate) fn resize(&self, size: PhysicalSize<u32>) {
        self.surface
            .resize(&self.context, non_zero(size.width), non_zero(size.height));
        unsafe {
            self.gl.viewport(0, 0, size.width as i32, size.height as i32);
        }
    }

    /// Presents the frame; blocks until the next vertical refresh slot.
    pub(crate) fn swap(&self) -> Result<()> {
        self.surface
            .swap_buffers(&self.context)
            .context("failed to swap buffers")
    }
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value.max(1)).expect("clamped to at least 1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_clamps_zero_dimensions() {
        assert_eq!(non_zero(0).get(), 1);
        assert_eq!(non_zero(720).get(), 720);
    }
}
