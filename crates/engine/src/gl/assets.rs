use std::path::PathBuf;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use glow::HasContext;
use image::imageops::flip_vertical_in_place;

use crate::camera::{CameraError, CameraFeed};
use crate::gl::uniforms::UniformRegistry;

/// Texel bound to every slot until its real content arrives.
const PLACEHOLDER_PIXEL: [u8; 4] = [0, 0, 0, 255];

/// Where an image-backed uniform gets its bytes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AssetSource {
    Url(String),
    File(PathBuf),
}

impl AssetSource {
    pub(crate) fn classify(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw.to_string())
        } else {
            Self::File(PathBuf::from(raw))
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Sampling setup chosen per upload.
///
/// Mipmap generation is only defined for power-of-two dimensions on the
/// backends this engine targets, so anything else falls back to clamped
/// linear sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FilterPolicy {
    Mipmapped,
    ClampLinear,
}

pub(crate) fn filter_policy(width: u32, height: u32) -> FilterPolicy {
    if width.is_power_of_two() && height.is_power_of_two() {
        FilterPolicy::Mipmapped
    } else {
        FilterPolicy::ClampLinear
    }
}

/// Hands out texture units in allocation order, never reusing one.
struct UnitAllocator {
    next: u32,
    limit: u32,
}

impl UnitAllocator {
    fn new(limit: u32) -> Self {
        Self { next: 0, limit }
    }

    fn allocate(&mut self) -> u32 {
        let unit = self.next;
        self.next += 1;
        if unit >= self.limit {
            tracing::warn!(
                unit,
                limit = self.limit,
                "texture unit allocation passed the device's combined limit"
            );
        }
        unit
    }
}

/// Completion message from a loader thread, consumed by the render tick.
enum AssetEvent {
    Loaded {
        unit: u32,
        name: String,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    Failed {
        name: String,
        source: String,
        error: String,
    },
}

struct TextureSlot {
    unit: u32,
    texture: glow::Texture,
}

struct CameraSlot {
    feed: CameraFeed,
    unit: u32,
    name: String,
    announced: bool,
}

/// Owns every texture unit backing an image or camera uniform.
///
/// Loading is placeholder-first: the unit is valid for sampling from the
/// moment the sampler uniform is pointed at it, and the decoded content is
/// swapped in whenever its loader thread reports back. Units are allocated
/// monotonically; re-binding a name abandons the old unit rather than
/// reusing it, which is how a superseded in-flight load stays harmless.
pub(crate) struct AssetManager {
    slots: Vec<TextureSlot>,
    units: UnitAllocator,
    events_tx: Sender<AssetEvent>,
    events_rx: Receiver<AssetEvent>,
    camera: Option<CameraSlot>,
}

impl AssetManager {
    pub(crate) fn new(gl: &glow::Context) -> Self {
        let limit = unsafe { gl.get_parameter_i32(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS) };
        let (events_tx, events_rx) = unbounded();
        Self {
            slots: Vec::new(),
            units: UnitAllocator::new(limit.max(0) as u32),
            events_tx,
            events_rx,
            camera: None,
        }
    }

    /// Number of texture units currently tracked (and rebound every tick).
    pub(crate) fn tracked_units(&self) -> usize {
        self.slots.len()
    }

    /// Binds `name` to a fresh unit and starts loading `source` behind it.
    ///
    /// The placeholder and the sampler uniform are set before this returns;
    /// the fetch and decode happen on a worker thread whose completion event
    /// is drained by a later tick.
    pub(crate) fn load_image(
        &mut self,
        gl: &glow::Context,
        uniforms: &mut UniformRegistry,
        name: &str,
        source: &str,
    ) {
        let source = AssetSource::classify(source);
        let Some(unit) = self.bind_placeholder_slot(gl, uniforms, name) else {
            return;
        };

        let events = self.events_tx.clone();
        let name = name.to_string();
        let spawned = std::thread::Builder::new()
            .name(format!("asset-load-{unit}"))
            .spawn(move || {
                // `unit` was fixed at spawn time; a newer load for the same
                // name targets a different unit and cannot be clobbered here.
                let event = match load_asset_pixels(&source) {
                    Ok((width, height, pixels)) => AssetEvent::Loaded {
                        unit,
                        name,
                        width,
                        height,
                        pixels,
                    },
                    Err(error) => AssetEvent::Failed {
                        name,
                        source: source.describe(),
                        error: format!("{error:#}"),
                    },
                };
                let _ = events.send(event);
            });
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "failed to spawn asset loader thread");
        }
    }

    /// Binds `name` to the default capture device on a fresh unit.
    pub(crate) fn setup_camera(
        &mut self,
        gl: &glow::Context,
        uniforms: &mut UniformRegistry,
        name: &str,
    ) -> Result<(), CameraError> {
        if self.camera.is_some() {
            return Err(CameraError::AlreadyActive);
        }
        let feed = CameraFeed::open()?;
        let Some(unit) = self.bind_placeholder_slot(gl, uniforms, name) else {
            return Err(CameraError::Device("failed to create camera texture".into()));
        };
        self.camera = Some(CameraSlot {
            feed,
            unit,
            name: name.to_string(),
            announced: false,
        });
        Ok(())
    }

    /// Applies finished loads; called at the top of every tick so a
    /// completion is visible no later than the next draw.
    pub(crate) fn drain_events(&mut self, gl: &glow::Context, uniforms: &mut UniformRegistry) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AssetEvent::Loaded {
                    unit,
                    name,
                    width,
                    height,
                    pixels,
                } => {
                    let Some(texture) = self.texture_for_unit(unit) else {
                        continue;
                    };
                    upload_rgba(gl, texture, unit, width, height, &pixels);
                    apply_filter_policy(gl, filter_policy(width, height));
                    uniforms.publish_size(gl, &name, width, height);
                    tracing::debug!(uniform = %name, unit, width, height, "asset upload complete");
                }
                AssetEvent::Failed {
                    name,
                    source,
                    error,
                } => {
                    tracing::warn!(
                        uniform = %name,
                        source = %source,
                        error = %error,
                        "asset load failed; placeholder stays bound"
                    );
                }
            }
        }
    }

    /// Uploads the newest camera frame, if one arrived since the last tick.
    ///
    /// Video content goes stale, so unlike the static image path this
    /// re-uploads on every tick that has a frame available.
    pub(crate) fn pump_camera(&mut self, gl: &glow::Context, uniforms: &mut UniformRegistry) {
        let Some(slot) = &self.camera else { return };
        let Some(frame) = slot.feed.latest_frame() else { return };
        let unit = slot.unit;
        let announced = slot.announced;
        let name = slot.name.clone();

        let Some(texture) = self.texture_for_unit(unit) else {
            return;
        };
        upload_rgba(gl, texture, unit, frame.width, frame.height, &frame.pixels);
        if !announced {
            uniforms.publish_size(gl, &name, frame.width, frame.height);
            if let Some(slot) = self.camera.as_mut() {
                slot.announced = true;
            }
        }
    }

    /// Re-activates every tracked unit; texture bindings are not guaranteed
    /// to survive across draws on all backends.
    pub(crate) fn rebind_all(&self, gl: &glow::Context) {
        for slot in &self.slots {
            unsafe {
                gl.active_texture(glow::TEXTURE0 + slot.unit);
                gl.bind_texture(glow::TEXTURE_2D, Some(slot.texture));
            }
        }
    }

    /// Deletes every texture and shuts down the camera stream.
    pub(crate) fn release(&mut self, gl: &glow::Context) {
        for slot in self.slots.drain(..) {
            unsafe { gl.delete_texture(slot.texture) };
        }
        self.camera = None;
    }

    /// Allocates a unit, uploads the placeholder, and points the sampler
    /// uniform at it. Returns `None` when the texture cannot be created.
    fn bind_placeholder_slot(
        &mut self,
        gl: &glow::Context,
        uniforms: &mut UniformRegistry,
        name: &str,
    ) -> Option<u32> {
        let texture = match unsafe { gl.create_texture() } {
            Ok(texture) => texture,
            Err(err) => {
                tracing::warn!(uniform = %name, error = %err, "failed to create texture");
                return None;
            }
        };
        let unit = self.units.allocate();

        upload_rgba(gl, texture, unit, 1, 1, &PLACEHOLDER_PIXEL);
        apply_filter_policy(gl, FilterPolicy::ClampLinear);

        self.slots.push(TextureSlot { unit, texture });
        uniforms.set_sampler_unit(gl, name, unit);
        Some(unit)
    }

    fn texture_for_unit(&self, unit: u32) -> Option<glow::Texture> {
        self.slots
            .iter()
            .find(|slot| slot.unit == unit)
            .map(|slot| slot.texture)
    }
}

fn upload_rgba(
    gl: &glow::Context,
    texture: glow::Texture,
    unit: u32,
    width: u32,
    height: u32,
    pixels: &[u8],
) {
    unsafe {
        gl.active_texture(glow::TEXTURE0 + unit);
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            width as i32,
            height as i32,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            Some(pixels),
        );
    }
}

/// Sets sampling state for the currently bound texture.
fn apply_filter_policy(gl: &glow::Context, policy: FilterPolicy) {
    unsafe {
        match policy {
            FilterPolicy::Mipmapped => {
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MIN_FILTER,
                    glow::LINEAR_MIPMAP_LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MAG_FILTER,
                    glow::LINEAR as i32,
                );
                gl.generate_mipmap(glow::TEXTURE_2D);
            }
            FilterPolicy::ClampLinear => {
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_S,
                    glow::CLAMP_TO_EDGE as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_T,
                    glow::CLAMP_TO_EDGE as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MIN_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MAG_FILTER,
                    glow::LINEAR as i32,
                );
            }
        }
    }
}

/// Fetches and decodes an asset off the render thread.
///
/// Rows are flipped so texel (0,0) lands at the bottom-left, matching the
/// coordinate convention the shaders see.
fn load_asset_pixels(source: &AssetSource) -> Result<(u32, u32, Vec<u8>)> {
    let bytes = match source {
        AssetSource::Url(url) => {
            let response = reqwest::blocking::get(url.as_str())
                .with_context(|| format!("requesting {url}"))?
                .error_for_status()
                .context("asset server returned an error status")?;
            response.bytes().context("reading asset body")?.to_vec()
        }
        AssetSource::File(path) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
    };
    let image = image::load_from_memory(&bytes).context("decoding image")?;
    let mut rgba = image.to_rgba8();
    flip_vertical_in_place(&mut rgba);
    Ok((rgba.width(), rgba.height(), rgba.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_allocate_strictly_increasing() {
        let mut units = UnitAllocator::new(16);
        assert_eq!(units.allocate(), 0);
        assert_eq!(units.allocate(), 1);
        assert_eq!(units.allocate(), 2);
    }

    #[test]
    fn allocation_past_the_limit_still_proceeds() {
        let mut units = UnitAllocator::new(2);
        for expected in 0..4 {
            assert_eq!(units.allocate(), expected);
        }
    }

    #[test]
    fn power_of_two_images_get_mipmaps() {
        assert_eq!(filter_policy(256, 256), FilterPolicy::Mipmapped);
        assert_eq!(filter_policy(1, 1), FilterPolicy::Mipmapped);
    }

    #[test]
    fn any_npot_dimension_forces_clamped_linear() {
        assert_eq!(filter_policy(300, 200), FilterPolicy::ClampLinear);
        assert_eq!(filter_policy(256, 200), FilterPolicy::ClampLinear);
        assert_eq!(filter_policy(0, 256), FilterPolicy::ClampLinear);
    }

    #[test]
    fn sources_split_on_scheme() {
        assert_eq!(
            AssetSource::classify("https://example.com/noise.png"),
            AssetSource::Url("https://example.com/noise.png".into())
        );
        assert_eq!(
            AssetSource::classify("textures/noise.png"),
            AssetSource::File(PathBuf::from("textures/noise.png"))
        );
    }

    #[test]
    fn placeholder_is_opaque_black() {
        assert_eq!(PLACEHOLDER_PIXEL, [0, 0, 0, 255]);
    }
}
