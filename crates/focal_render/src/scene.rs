//! Scene-Side Collaborators
//!
//! Minimal host-facing types the effect talks to at construction time:
//! the scene facade (texture ownership, pipeline texture configuration,
//! camera identity) and the depth renderer that owns the scene depth
//! map. Passes only ever hold non-owning view handles; the depth
//! buffer's lifetime belongs to the [`DepthRenderer`].

use alloc::string::String;
use parking_lot::RwLock;

use focal_core::{Handle, HandleMap, Id, IdGenerator};

use crate::pass::{PassError, TextureViewHandle, SCENE_DEPTH};
use crate::resource::{FilterMode, TextureDesc, TextureFormat};

/// Identity of a camera, used to scope per-camera pass disposal
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CameraId(Id);

impl CameraId {
    /// Derive a stable camera id from a name
    pub fn from_name(name: &str) -> Self {
        Self(Id::from_name(name))
    }

    /// Get the underlying id
    pub fn id(&self) -> Id {
        self.0
    }
}

/// Owns the scene depth map
///
/// The depth map slot is refreshed by the host at the start of each
/// frame; passes fetch the current handle and never hold on to it
/// across frames.
pub struct DepthRenderer {
    format: TextureFormat,
    depth_map: RwLock<Option<TextureViewHandle>>,
}

impl DepthRenderer {
    fn new(format: TextureFormat) -> Self {
        Self {
            format,
            depth_map: RwLock::new(None),
        }
    }

    /// Publish the current frame's depth map
    pub fn set_depth_map(&self, view: TextureViewHandle) {
        *self.depth_map.write() = Some(view);
    }

    /// Get the current depth map, if one has been rendered
    pub fn depth_map(&self) -> Option<TextureViewHandle> {
        *self.depth_map.read()
    }

    /// Get the depth buffer format
    pub fn format(&self) -> TextureFormat {
        self.format
    }
}

/// Host scene facade
///
/// Owns texture descriptions, mints camera identities, and carries the
/// pipeline texture format and sampling mode that post-process effects
/// propagate to every pass they create.
pub struct Scene {
    textures: HandleMap<TextureDesc>,
    cameras: IdGenerator,
    depth_renderer: Option<DepthRenderer>,
    depth_supported: bool,
    pipeline_format: TextureFormat,
    sampling: FilterMode,
    surface_size: (u32, u32),
}

impl Scene {
    /// Create a scene with the default pipeline configuration
    pub fn new() -> Self {
        Self {
            textures: HandleMap::new(),
            cameras: IdGenerator::new(),
            depth_renderer: None,
            depth_supported: true,
            pipeline_format: TextureFormat::Rgba16Float,
            sampling: FilterMode::Linear,
            surface_size: (1920, 1080),
        }
    }

    /// Create a scene with an explicit pipeline texture configuration
    pub fn with_pipeline_config(format: TextureFormat, sampling: FilterMode) -> Self {
        Self {
            pipeline_format: format,
            sampling,
            ..Self::new()
        }
    }

    /// Create a scene that cannot render depth
    ///
    /// Effects that require a depth map fail to construct against such
    /// a scene.
    pub fn without_depth_support() -> Self {
        Self {
            depth_supported: false,
            ..Self::new()
        }
    }

    /// Set the surface size used for newly created scene textures
    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface_size = (width, height);
    }

    /// Get the surface size
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Get the pipeline texture format propagated to passes
    pub fn pipeline_format(&self) -> TextureFormat {
        self.pipeline_format
    }

    /// Get the sampling mode propagated to passes
    pub fn sampling(&self) -> FilterMode {
        self.sampling
    }

    /// Mint a new camera identity
    pub fn create_camera(&self) -> CameraId {
        CameraId(self.cameras.next())
    }

    /// Enable depth rendering, creating the depth renderer on first use
    ///
    /// Idempotent: repeated calls return the same renderer. Fails when
    /// the scene was built without depth-capture capability.
    pub fn enable_depth_renderer(&mut self) -> Result<&DepthRenderer, PassError> {
        if !self.depth_supported {
            log::warn!("depth rendering requested on a scene without depth support");
            return Err(PassError::Setup(String::from(
                "scene has no depth rendering capability",
            )));
        }

        if self.depth_renderer.is_none() {
            let desc = TextureDesc::render_target(
                SCENE_DEPTH,
                self.surface_size,
                TextureFormat::Depth32Float,
            );
            let (_, view) = self.register_texture(desc);

            let renderer = DepthRenderer::new(TextureFormat::Depth32Float);
            renderer.set_depth_map(view);
            self.depth_renderer = Some(renderer);
        }

        self.depth_renderer
            .as_ref()
            .ok_or_else(|| PassError::Setup(String::from("depth renderer unavailable")))
    }

    /// Get the depth renderer, if depth rendering has been enabled
    pub fn depth_renderer(&self) -> Option<&DepthRenderer> {
        self.depth_renderer.as_ref()
    }

    /// Register a texture with the scene, receiving its owning handle
    /// and the non-owning view handle passes use
    pub fn register_texture(
        &mut self,
        desc: TextureDesc,
    ) -> (Handle<TextureDesc>, TextureViewHandle) {
        let handle = self.textures.insert(desc);
        (handle, TextureViewHandle(handle.to_bits() as u64))
    }

    /// Release a scene texture
    pub fn release_texture(&mut self, handle: Handle<TextureDesc>) -> bool {
        self.textures.remove(handle).is_some()
    }

    /// Look up a texture description
    pub fn texture_desc(&self, handle: Handle<TextureDesc>) -> Option<&TextureDesc> {
        self.textures.get(handle)
    }

    /// Get the number of live scene textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_ids_are_unique() {
        let scene = Scene::new();
        let a = scene.create_camera();
        let b = scene.create_camera();
        assert_ne!(a, b);
    }

    #[test]
    fn test_camera_id_from_name_is_stable() {
        assert_eq!(CameraId::from_name("main"), CameraId::from_name("main"));
        assert_ne!(CameraId::from_name("main"), CameraId::from_name("ui"));
    }

    #[test]
    fn test_enable_depth_renderer() {
        let mut scene = Scene::new();

        let view = {
            let renderer = scene.enable_depth_renderer().unwrap();
            renderer.depth_map().unwrap()
        };

        // Idempotent: the second call returns the same depth map
        let again = scene.enable_depth_renderer().unwrap().depth_map().unwrap();
        assert_eq!(view, again);
        assert_eq!(scene.texture_count(), 1);
    }

    #[test]
    fn test_depth_unsupported_is_a_setup_error() {
        let mut scene = Scene::without_depth_support();
        assert!(matches!(
            scene.enable_depth_renderer(),
            Err(PassError::Setup(_))
        ));
        assert!(scene.depth_renderer().is_none());
    }

    #[test]
    fn test_depth_renderer_republish() {
        let mut scene = Scene::new();
        scene.enable_depth_renderer().unwrap();

        let renderer = scene.depth_renderer().unwrap();
        renderer.set_depth_map(TextureViewHandle(42));
        assert_eq!(renderer.depth_map(), Some(TextureViewHandle(42)));
        assert_eq!(renderer.format(), TextureFormat::Depth32Float);
    }

    #[test]
    fn test_pipeline_config_is_carried() {
        let scene =
            Scene::with_pipeline_config(TextureFormat::Rgba8UnormSrgb, FilterMode::Nearest);
        assert_eq!(scene.pipeline_format(), TextureFormat::Rgba8UnormSrgb);
        assert_eq!(scene.sampling(), FilterMode::Nearest);
    }

    #[test]
    fn test_texture_registration_and_release() {
        let mut scene = Scene::new();

        let desc = TextureDesc::render_target("color", (64, 64), TextureFormat::Rgba16Float);
        let (handle, view) = scene.register_texture(desc);

        assert_ne!(view, TextureViewHandle(u64::MAX));
        assert!(scene.texture_desc(handle).is_some());

        assert!(scene.release_texture(handle));
        assert!(!scene.release_texture(handle));
        assert!(scene.texture_desc(handle).is_none());
    }
}
