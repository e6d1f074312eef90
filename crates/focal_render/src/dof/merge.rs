//! Merge Pass
//!
//! Final composite: blends the sharp scene color with the blurred
//! result, per pixel, by the captured circle of confusion. A pixel on
//! the focal plane (coc 0) reproduces the sharp image exactly; a pixel
//! at or beyond saturation (coc 1) takes the fully blurred color.
//! Stateless beyond references to its three inputs.

use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;

use crate::pass::{
    CameraBinding, PassError, PassExecuteContext, PassSetupContext, PostProcessPass, ResourceRef,
};
use crate::resource::{FilterMode, TextureDesc, TextureFormat};
use crate::scene::CameraId;

/// Blends sharp and blurred color by the circle of confusion
pub struct MergePass {
    /// Stable pass identifier; also names the output texture
    name: &'static str,

    /// Blurred color input
    blurred: &'static str,

    /// Captured circle-of-confusion input
    coc: &'static str,

    /// Passes that must run first
    deps: [&'static str; 2],

    /// Pipeline texture format for the output buffer
    format: TextureFormat,

    /// Sampling mode for input reads
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

impl MergePass {
    /// Create a merge pass over a blurred buffer and a CoC capture
    pub fn new(
        name: &'static str,
        blurred: &'static str,
        coc: &'static str,
        camera: CameraId,
        format: TextureFormat,
        sampling: FilterMode,
    ) -> Self {
        Self {
            name,
            blurred,
            coc,
            deps: [blurred, coc],
            format,
            sampling,
            binding: CameraBinding::new(camera),
            enabled: true,
            initialized: false,
            surface_size: (1920, 1080),
        }
    }

    /// Blend one pixel
    ///
    /// `coc` is the pixel's normalized circle of confusion; values
    /// outside [0, 1] are clamped.
    pub fn resolve(sharp: [f32; 4], blurred: [f32; 4], coc: f32) -> [f32; 4] {
        let t = coc.clamp(0.0, 1.0);
        [
            sharp[0] + (blurred[0] - sharp[0]) * t,
            sharp[1] + (blurred[1] - sharp[1]) * t,
            sharp[2] + (blurred[2] - sharp[2]) * t,
            sharp[3] + (blurred[3] - sharp[3]) * t,
        ]
    }

    /// Sampling mode for input reads
    pub fn sampling(&self) -> FilterMode {
        self.sampling
    }

    /// Describe the output buffer
    pub fn output_desc(&self) -> TextureDesc {
        TextureDesc::render_target(self.name, self.surface_size, self.format)
    }
}

impl PostProcessPass for MergePass {
    fn name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> &[&str] {
        &self.deps
    }

    fn reads(&self) -> Vec<ResourceRef> {
        vec![
            ResourceRef::texture(self.blurred),
            ResourceRef::texture(self.coc),
            ResourceRef::SceneColor,
        ]
    }

    fn writes(&self) -> Vec<ResourceRef> {
        vec![ResourceRef::texture(self.name)]
    }

    fn setup(&mut self, context: &PassSetupContext) -> Result<(), PassError> {
        self.surface_size = context.surface_size;
        self.initialized = true;
        Ok(())
    }

    fn execute(&self, context: &PassExecuteContext) -> Result<(), PassError> {
        if self.binding.is_released() {
            return Err(PassError::Disposed(self.name.to_string()));
        }
        if !self.enabled || !self.initialized {
            return Ok(());
        }

        for read in self.reads() {
            context
                .resources
                .resolve(&read)
                .ok_or_else(|| PassError::Resource(alloc::format!("{:?} not found", read)))?;
        }

        // The backend records one full-screen draw evaluating resolve()
        // per pixel.
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
}
