//! Circle-of-Confusion Pass
//!
//! Writes a full-screen buffer holding, for every pixel, how
//! out-of-focus that pixel is. For a thin lens with aperture
//! `lens_size / f_stop`, a point at linear depth `d` projects to a
//! circle of radius
//!
//! ```text
//! radius(d) = aperture * m * |d - focus_distance| / d
//! ```
//!
//! where `m` is the lens magnification `focal_length /
//! (focus_distance - focal_length)`. The buffer stores the radius
//! normalized against a configurable saturation radius, so downstream
//! passes read a value in [0, 1]: 0 on the focal plane, 1 at or beyond
//! the largest blur the kernel can realize.

use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use bytemuck::{Pod, Zeroable};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::dof::ids;
use crate::pass::{
    CameraBinding, PassConfigData, PassError, PassExecuteContext, PassSetupContext,
    PostProcessPass, ResourceRef,
};
use crate::resource::{FilterMode, TextureDesc, TextureFormat};
use crate::scene::CameraId;

/// Smallest depth fed into the model; guards the division at d = 0
pub const MIN_DEPTH: f32 = 0.01;

/// Smallest allowed value for any lens parameter
pub const MIN_LENS_PARAM: f32 = 1.0e-3;

/// Physical lens parameters driving the circle-of-confusion model
///
/// All distances are in scene units / 1000 (millimeters). Every
/// parameter is independently settable and always positive; degenerate
/// values are treated as "no blur" rather than an error.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LensParameters {
    /// Focal length of the lens in millimeters
    pub focal_length: f32,
    /// F-stop; the effective aperture diameter is lens_size / f_stop
    pub f_stop: f32,
    /// Distance to the focal plane in millimeters
    pub focus_distance: f32,
    /// Max lens size in millimeters. Standard cameras are 50mm
    pub lens_size: f32,
}

impl Default for LensParameters {
    fn default() -> Self {
        Self {
            focal_length: 50.0,
            f_stop: 1.4,
            focus_distance: 2000.0,
            lens_size: 50.0,
        }
    }
}

impl LensParameters {
    /// Effective aperture diameter in millimeters
    pub fn aperture(&self) -> f32 {
        self.lens_size / self.f_stop.max(MIN_LENS_PARAM)
    }

    /// Thin-lens magnification at the focal plane
    fn magnification(&self) -> f32 {
        self.focal_length / (self.focus_distance - self.focal_length).max(MIN_LENS_PARAM)
    }

    /// Unclamped circle-of-confusion radius in millimeters at depth `d`
    ///
    /// Zero exactly on the focal plane, growing monotonically as `d`
    /// moves away from it in either direction. Degenerate parameters
    /// (non-positive f-stop, focus distance, or lens size) yield zero.
    pub fn coc_radius(&self, depth: f32) -> f32 {
        if self.f_stop <= 0.0 || self.focus_distance <= 0.0 || self.lens_size <= 0.0 {
            return 0.0;
        }
        let d = depth.max(MIN_DEPTH);
        self.aperture() * self.magnification() * (d - self.focus_distance).abs() / d
    }
}

/// Circle-of-confusion model state
///
/// Shared between the owning effect (which writes parameters) and the
/// pass (which reads them every frame).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CocSettings {
    /// Lens parameters
    pub lens: LensParameters,
    /// Radius in millimeters at which the stored value saturates to 1
    pub max_coc: f32,
}

impl Default for CocSettings {
    fn default() -> Self {
        Self {
            lens: LensParameters::default(),
            // 1% of a 36mm full-frame sensor
            max_coc: 0.36,
        }
    }
}

impl CocSettings {
    /// Normalized circle of confusion in [0, 1] at depth `d`
    pub fn normalized_coc(&self, depth: f32) -> f32 {
        if self.max_coc <= 0.0 {
            return 0.0;
        }
        (self.lens.coc_radius(depth) / self.max_coc).clamp(0.0, 1.0)
    }
}

/// Uniform block mirror for the circle-of-confusion shader
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CocUniforms {
    /// aperture * magnification, precomputed on the CPU
    pub coc_scale: f32,
    /// Distance to the focal plane in millimeters
    pub focus_distance: f32,
    /// Saturation radius in millimeters
    pub max_coc: f32,
    /// Depth clamp guarding the division at d = 0
    pub min_depth: f32,
    /// 1.0 / surface_size
    pub inv_surface_size: [f32; 2],
    /// Padding for 16-byte alignment
    pub _padding: [f32; 2],
}

/// Serializable configuration snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocPassConfig {
    /// Lens parameters
    pub lens: LensParameters,
    /// Saturation radius
    pub max_coc: f32,
    /// Enabled state
    pub enabled: bool,
}

/// Emits the per-pixel circle-of-confusion buffer
///
/// Reads the scene depth buffer and writes one full-screen factor
/// buffer per frame. Owned by a [`crate::dof::DepthOfFieldEffect`].
pub struct CircleOfConfusionPass {
    /// Shared model state
    settings: Arc<RwLock<CocSettings>>,

    /// Pipeline texture format for the output buffer
    format: TextureFormat,

    /// Sampling mode used when reading the depth buffer
    sampling: FilterMode,

    /// Cameras this pass serves
    binding: CameraBinding,

    /// Enabled state
    enabled: bool,

    /// Initialized state
    initialized: bool,

    /// Surface size
    surface_size: (u32, u32),
}

impl CircleOfConfusionPass {
    /// Create a new circle-of-confusion pass
    pub fn new(
        settings: Arc<RwLock<CocSettings>>,
        camera: CameraId,
        format: TextureFormat,
        sampling: FilterMode,
    ) -> Self {
        Self {
            settings,
            format,
            sampling,
            binding: CameraBinding::new(camera),
            enabled: true,
            initialized: false,
            surface_size: (1920, 1080),
        }
    }

    /// Normalized circle of confusion at depth `d`, under the current
    /// lens parameters
    pub fn normalized_coc(&self, depth: f32) -> f32 {
        self.settings.read().normalized_coc(depth)
    }

    /// Sampling mode used for the depth buffer
    pub fn sampling(&self) -> FilterMode {
        self.sampling
    }

    /// Pipeline texture format propagated by the owning effect
    pub fn pipeline_format(&self) -> TextureFormat {
        self.format
    }

    /// Describe the output buffer
    ///
    /// The factor fits a single channel; the buffer does not need the
    /// full pipeline format.
    pub fn output_desc(&self) -> TextureDesc {
        TextureDesc::render_target(ids::COC, self.surface_size, TextureFormat::R16Float)
    }

    /// Build the uniform block for the current frame
    pub fn uniforms(&self) -> CocUniforms {
        let settings = self.settings.read();
        let (w, h) = self.surface_size;
        CocUniforms {
            coc_scale: settings.lens.aperture() * settings.lens.magnification(),
            focus_distance: settings.lens.focus_distance,
            max_coc: settings.max_coc,
            min_depth: MIN_DEPTH,
            inv_surface_size: [1.0 / w.max(1) as f32, 1.0 / h.max(1) as f32],
            _padding: [0.0; 2],
        }
    }

    fn snapshot(&self) -> CocPassConfig {
        let settings = self.settings.read();
        CocPassConfig {
            lens: settings.lens,
            max_coc: settings.max_coc,
            enabled: self.enabled,
        }
    }
}

impl PostProcessPass for CircleOfConfusionPass {
    fn name(&self) -> &str {
        ids::COC
    }

    fn reads(&self) -> Vec<ResourceRef> {
        vec![ResourceRef::SceneDepth]
    }

    fn writes(&self) -> Vec<ResourceRef> {
        vec![ResourceRef::texture(ids::COC)]
    }

    fn setup(&mut self, context: &PassSetupContext) -> Result<(), PassError> {
        self.surface_size = context.surface_size;
        self.initialized = true;
        Ok(())
    }

    fn execute(&self, context: &PassExecuteContext) -> Result<(), PassError> {
        if self.binding.is_released() {
            return Err(PassError::Disposed(ids::COC.to_string()));
        }
        if !self.enabled || !self.initialized {
            return Ok(());
        }

        context
            .resources
            .scene_depth()
            .ok_or_else(|| PassError::Resource("scene_depth not found".into()))?;

        // The backend binds the depth buffer and this frame's uniforms,
        // then records one full-screen draw into the coc target.
        let _uniforms = self.uniforms();

        Ok(())
    }

    fn cleanup(&mut self) {
        self.initialized = false;
    }

    fn attach(&mut self, camera: CameraId) {
        self.binding.attach(camera);
    }

    fn dispose(&mut self, camera: CameraId) -> bool {
        if self.binding.detach(camera) && self.binding.is_released() {
            self.initialized = false;
            true
        } else {
            false
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn on_resize(&mut self, new_size: (u32, u32)) {
        self.surface_size = new_size;
    }

    fn get_config(&self) -> Option<PassConfigData> {
        Some(PassConfigData {
            name: ids::COC.to_string(),
            enabled: self.enabled,
            config: serde_json::to_value(self.snapshot()).unwrap_or_default(),
        })
    }

    fn apply_config(&mut self, config: &PassConfigData) -> Result<(), PassError> {
        self.enabled = config.enabled;

        if let Ok(snapshot) = serde_json::from_value::<CocPassConfig>(config.config.clone()) {
            let mut settings = self.settings.write();
            settings.lens = snapshot.lens;
            settings.max_coc = snapshot.max_coc;
        }

        Ok(())
    }
}
