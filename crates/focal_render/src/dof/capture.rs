//! Capture Pass
//!
//! Copies a source buffer into a stable snapshot at a fixed point in
//! the frame. The merge pass reads the circle-of-confusion buffer a
//! stage later than it is produced; snapshotting decouples the two so
//! the compositor sees a consistent value instead of a buffer still
//! being written. Pure copy, no transformation.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use crate::pass::{
    CameraBinding, PassError, PassExecuteContext, PassSetupContext, PostProcessPass, ResourceRef,
};
use crate::resource::{FilterMode, TextureDesc, TextureFormat};
use crate::scene::CameraId;

/// Pass-through snapshot of another pass's output
pub struct CapturePass {
    /// Stable pass identifier; also names the snapshot texture
    name: &'static str,

    /// Buffer being snapshotted
    source: &'static str,

    /// Dependency on the producing pass
    deps: [&'static str; 1],

    /// Snapshot buffer format
    format: TextureFormat,

    /// Sampling mode for the copy
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

impl CapturePass {
    /// Create a capture of `source` published under `name`
    pub fn new(
        name: &'static str,
        source: &'static str,
        camera: CameraId,
        format: TextureFormat,
        sampling: FilterMode,
    ) -> Self {
        Self {
            name,
            source,
            deps: [source],
            format,
            sampling,
            binding: CameraBinding::new(camera),
            enabled: true,
            initialized: false,
            surface_size: (1920, 1080),
        }
    }

    /// The buffer this pass snapshots
    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Sampling mode for the copy
    pub fn sampling(&self) -> FilterMode {
        self.sampling
    }

    /// Describe the snapshot buffer
    pub fn output_desc(&self) -> TextureDesc {
        TextureDesc::render_target(self.name, self.surface_size, self.format)
    }
}

impl PostProcessPass for CapturePass {
    fn name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> &[&str] {
        &self.deps
    }

    fn reads(&self) -> Vec<ResourceRef> {
        vec![ResourceRef::texture(self.source)]
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

        context
            .resources
            .get_texture(self.source)
            .ok_or_else(|| PassError::Resource(String::from(self.source)))?;

        // The backend records a plain blit from source to snapshot.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dof::ids;
    use crate::pass::TextureViewHandle;

    fn capture() -> CapturePass {
        CapturePass::new(
            ids::COC_CAPTURE,
            ids::COC,
            CameraId::from_name("main"),
            TextureFormat::R16Float,
            FilterMode::Linear,
        )
    }

    #[test]
    fn test_capture_runs_after_its_source() {
        let pass = capture();
        assert_eq!(pass.dependencies(), &[ids::COC]);
        assert_eq!(pass.reads(), vec![ResourceRef::texture(ids::COC)]);
        assert_eq!(pass.writes(), vec![ResourceRef::texture(ids::COC_CAPTURE)]);
    }

    #[test]
    fn test_capture_requires_source_buffer() {
        let mut pass = capture();
        pass.setup(&PassSetupContext::default()).unwrap();

        let ctx = PassExecuteContext::default();
        assert!(matches!(pass.execute(&ctx), Err(PassError::Resource(_))));

        let mut ctx = PassExecuteContext::default();
        ctx.resources.register_texture(ids::COC, TextureViewHandle(7));
        assert!(pass.execute(&ctx).is_ok());
    }

    #[test]
    fn test_snapshot_keeps_source_format() {
        let pass = capture();
        assert_eq!(pass.output_desc().format, TextureFormat::R16Float);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let camera = CameraId::from_name("main");
        let mut pass = capture();

        assert!(pass.dispose(camera));
        assert!(!pass.dispose(camera));
    }
}
