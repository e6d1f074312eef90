//! Depth-Aware Directional Blur Pass
//!
//! One-dimensional blur along a single axis. Two instances run
//! back-to-back (vertical, then horizontal over the vertical result) to
//! approximate a 2D blur. A sample's contribution combines a Gaussian
//! falloff with the sampled pixel's own circle of confusion, and drops
//! to zero for samples on the far side of a sharp depth step so an
//! out-of-focus background never bleeds onto an in-focus silhouette.
//!
//! See section 2.6.2 of
//! <http://fileadmin.cs.lth.se/cs/education/edan35/lectures/12dof.pdf>

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use bytemuck::{Pod, Zeroable};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::pass::{
    CameraBinding, PassConfigData, PassError, PassExecuteContext, PassSetupContext,
    PostProcessPass, ResourceRef,
};
use crate::resource::{AddressMode, FilterMode, SamplerDesc, TextureDesc, TextureFormat};
use crate::scene::CameraId;

/// Blur parameters shared between the owning effect and the pass
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlurSettings {
    /// Kernel radius in texels; 0 degenerates to a pass-through
    pub kernel: u32,
    /// Depth step, in scene millimeters, past which a sample is
    /// rejected as lying behind a silhouette
    pub depth_reject: f32,
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self {
            kernel: 15,
            depth_reject: 100.0,
        }
    }
}

/// Uniform block mirror for the blur shader
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BlurUniforms {
    /// Blur axis as a unit vector in texel space
    pub direction: [f32; 2],
    /// 1.0 / surface_size
    pub inv_surface_size: [f32; 2],
    /// Kernel radius in texels
    pub kernel: u32,
    /// Depth rejection threshold in millimeters
    pub depth_reject: f32,
    /// Padding for 16-byte alignment
    pub _padding: [f32; 2],
}

/// Serializable configuration snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlurPassConfig {
    /// Kernel radius in texels
    pub kernel: u32,
    /// Depth rejection threshold
    pub depth_reject: f32,
    /// Enabled state
    pub enabled: bool,
}

/// One-dimensional depth-aware blur
///
/// The vertical instance takes the circle-of-confusion buffer as a
/// mask; the horizontal instance consumes the vertical result, where
/// the masking is already folded in, and only re-checks depth.
pub struct DepthAwareBlurPass {
    /// Stable pass identifier; also names the output texture
    name: &'static str,

    /// Blur axis
    direction: [f32; 2],

    /// Shared blur parameters
    settings: Arc<RwLock<BlurSettings>>,

    /// Buffer being blurred
    source: ResourceRef,

    /// Circle-of-confusion mask, present on the first instance only
    coc_mask: Option<&'static str>,

    /// Passes that must run first
    depends_on: &'static [&'static str],

    /// Pipeline texture format for the output buffer
    format: TextureFormat,

    /// Sampling mode for source reads
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

impl DepthAwareBlurPass {
    /// Create a directional blur pass
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &'static str,
        direction: [f32; 2],
        settings: Arc<RwLock<BlurSettings>>,
        source: ResourceRef,
        coc_mask: Option<&'static str>,
        depends_on: &'static [&'static str],
        camera: CameraId,
        format: TextureFormat,
        sampling: FilterMode,
    ) -> Self {
        Self {
            name,
            direction,
            settings,
            source,
            coc_mask,
            depends_on,
            format,
            sampling,
            binding: CameraBinding::new(camera),
            enabled: true,
            initialized: false,
            surface_size: (1920, 1080),
        }
    }

    /// Blur axis
    pub fn direction(&self) -> [f32; 2] {
        self.direction
    }

    /// Current kernel radius in texels
    pub fn kernel(&self) -> u32 {
        self.settings.read().kernel
    }

    /// Whether this instance masks samples by their circle of confusion
    pub fn is_coc_masked(&self) -> bool {
        self.coc_mask.is_some()
    }

    /// Gaussian falloff for a sample `offset` texels from the center
    ///
    /// A kernel of 0 degenerates to the identity: only the center
    /// sample contributes.
    fn falloff(offset: i32, kernel: u32) -> f32 {
        if kernel == 0 {
            return if offset == 0 { 1.0 } else { 0.0 };
        }
        if offset.unsigned_abs() > kernel {
            return 0.0;
        }
        let sigma = kernel as f32 / 3.0;
        let x = offset as f32;
        (-(x * x) / (2.0 * sigma * sigma)).exp()
    }

    /// Weight of one sample against the center pixel
    ///
    /// `sample_depth` and `center_depth` are linear depths in scene
    /// millimeters; `sample_coc` is the sampled pixel's normalized
    /// circle of confusion. A sample further than the rejection
    /// threshold behind the center lies past a silhouette edge and
    /// contributes nothing.
    pub fn sample_weight(
        &self,
        offset: i32,
        center_depth: f32,
        sample_depth: f32,
        sample_coc: f32,
    ) -> f32 {
        let settings = self.settings.read();

        let mut weight = Self::falloff(offset, settings.kernel);
        if weight == 0.0 || offset == 0 {
            return weight;
        }

        if sample_depth - center_depth > settings.depth_reject {
            return 0.0;
        }

        if self.coc_mask.is_some() {
            weight *= sample_coc.clamp(0.0, 1.0);
        }

        weight
    }

    /// Normalized weights for a full row of samples
    ///
    /// `samples` holds `(depth, coc)` for offsets `-kernel..=kernel`.
    /// Weights sum to 1; when every neighbor is rejected the center
    /// pixel keeps its color.
    pub fn normalized_weights(&self, center_depth: f32, samples: &[(f32, f32)]) -> Vec<f32> {
        let kernel = self.settings.read().kernel as i32;
        debug_assert_eq!(samples.len(), (2 * kernel + 1) as usize);

        let mut weights: Vec<f32> = samples
            .iter()
            .enumerate()
            .map(|(i, &(depth, coc))| {
                let offset = i as i32 - kernel;
                self.sample_weight(offset, center_depth, depth, coc)
            })
            .collect();

        let sum: f32 = weights.iter().sum();
        if sum <= f32::EPSILON {
            weights.iter_mut().for_each(|w| *w = 0.0);
            weights[kernel as usize] = 1.0;
        } else {
            weights.iter_mut().for_each(|w| *w /= sum);
        }

        weights
    }

    /// Describe the output buffer
    pub fn output_desc(&self) -> TextureDesc {
        TextureDesc::render_target(self.name, self.surface_size, self.format)
    }

    /// Sampler used for neighborhood reads
    pub fn sampler_desc(&self) -> SamplerDesc {
        SamplerDesc {
            label: Some(String::from(self.name)),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: self.sampling,
            min_filter: self.sampling,
            compare: None,
        }
    }

    /// Build the uniform block for the current frame
    pub fn uniforms(&self) -> BlurUniforms {
        let settings = self.settings.read();
        let (w, h) = self.surface_size;
        BlurUniforms {
            direction: self.direction,
            inv_surface_size: [1.0 / w.max(1) as f32, 1.0 / h.max(1) as f32],
            kernel: settings.kernel,
            depth_reject: settings.depth_reject,
            _padding: [0.0; 2],
        }
    }

    fn snapshot(&self) -> BlurPassConfig {
        let settings = self.settings.read();
        BlurPassConfig {
            kernel: settings.kernel,
            depth_reject: settings.depth_reject,
            enabled: self.enabled,
        }
    }
}

impl PostProcessPass for DepthAwareBlurPass {
    fn name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> &[&str] {
        self.depends_on
    }

    fn reads(&self) -> Vec<ResourceRef> {
        let mut reads = vec![self.source.clone(), ResourceRef::SceneDepth];
        if let Some(mask) = self.coc_mask {
            reads.push(ResourceRef::texture(mask));
        }
        reads
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

        // The backend hands the generic blur kernel the direction,
        // radius and masking buffers; the weighting model above is what
        // the kernel evaluates per sample.
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
            name: self.name.to_string(),
            enabled: self.enabled,
            config: serde_json::to_value(self.snapshot()).unwrap_or_default(),
        })
    }

    fn apply_config(&mut self, config: &PassConfigData) -> Result<(), PassError> {
        self.enabled = config.enabled;

        if let Ok(snapshot) = serde_json::from_value::<BlurPassConfig>(config.config.clone()) {
            let mut settings = self.settings.write();
            settings.kernel = snapshot.kernel;
            settings.depth_reject = snapshot.depth_reject;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dof::ids;
    use crate::pass::{TextureViewHandle, SCENE_COLOR, SCENE_DEPTH};

    fn shared(settings: BlurSettings) -> Arc<RwLock<BlurSettings>> {
        Arc::new(RwLock::new(settings))
    }

    fn vertical(settings: Arc<RwLock<BlurSettings>>) -> DepthAwareBlurPass {
        DepthAwareBlurPass::new(
            ids::BLUR_Y,
            [0.0, 1.0],
            settings,
            ResourceRef::SceneColor,
            Some(ids::COC),
            &[ids::COC],
            CameraId::from_name("main"),
            TextureFormat::Rgba16Float,
            FilterMode::Linear,
        )
    }

    fn horizontal(settings: Arc<RwLock<BlurSettings>>) -> DepthAwareBlurPass {
        DepthAwareBlurPass::new(
            ids::BLUR_X,
            [1.0, 0.0],
            settings,
            ResourceRef::texture(ids::BLUR_Y),
            None,
            &[ids::BLUR_Y],
            CameraId::from_name("main"),
            TextureFormat::Rgba16Float,
            FilterMode::Linear,
        )
    }

    #[test]
    fn test_falloff_is_monotone() {
        let w0 = DepthAwareBlurPass::falloff(0, 15);
        let w5 = DepthAwareBlurPass::falloff(5, 15);
        let w10 = DepthAwareBlurPass::falloff(10, 15);

        assert_eq!(w0, 1.0);
        assert!(w0 > w5);
        assert!(w5 > w10);
        assert_eq!(DepthAwareBlurPass::falloff(16, 15), 0.0);
    }

    #[test]
    fn test_zero_kernel_is_pass_through() {
        let pass = vertical(shared(BlurSettings {
            kernel: 0,
            ..BlurSettings::default()
        }));

        let weights = pass.normalized_weights(1000.0, &[(1000.0, 0.5)]);
        assert_eq!(weights, vec![1.0]);

        assert_eq!(pass.sample_weight(1, 1000.0, 1000.0, 1.0), 0.0);
        assert_eq!(pass.sample_weight(0, 1000.0, 1000.0, 1.0), 1.0);
    }

    #[test]
    fn test_far_side_samples_are_rejected() {
        let pass = vertical(shared(BlurSettings::default()));

        // Sample 8000mm behind the center pixel: background behind a
        // silhouette, must not bleed in
        assert_eq!(pass.sample_weight(1, 2000.0, 10_000.0, 1.0), 0.0);

        // Sample slightly behind: allowed
        assert!(pass.sample_weight(1, 2000.0, 2050.0, 1.0) > 0.0);

        // Foreground sample in front of the center: allowed (natural
        // near-field spill)
        assert!(pass.sample_weight(1, 2000.0, 500.0, 1.0) > 0.0);
    }

    #[test]
    fn test_masked_instance_weighs_samples_by_their_coc() {
        let pass = vertical(shared(BlurSettings::default()));

        let sharp = pass.sample_weight(2, 2000.0, 2000.0, 0.0);
        let blurry = pass.sample_weight(2, 2000.0, 2000.0, 1.0);

        assert_eq!(sharp, 0.0);
        assert!(blurry > sharp);
    }

    #[test]
    fn test_unmasked_instance_ignores_coc() {
        let pass = horizontal(shared(BlurSettings::default()));

        let a = pass.sample_weight(2, 2000.0, 2000.0, 0.0);
        let b = pass.sample_weight(2, 2000.0, 2000.0, 1.0);

        assert_eq!(a, b);
        assert!(a > 0.0);
    }

    #[test]
    fn test_unmasked_instance_still_rejects_depth_steps() {
        let pass = horizontal(shared(BlurSettings::default()));
        assert_eq!(pass.sample_weight(3, 2000.0, 9000.0, 1.0), 0.0);
    }

    #[test]
    fn test_weights_normalize_to_one() {
        let pass = vertical(shared(BlurSettings {
            kernel: 2,
            ..BlurSettings::default()
        }));

        let samples = [
            (2000.0, 0.8),
            (2000.0, 0.6),
            (2000.0, 0.0),
            (2000.0, 0.6),
            (2000.0, 0.8),
        ];
        let weights = pass.normalized_weights(2000.0, &samples);

        let sum: f32 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn test_all_neighbors_rejected_keeps_center() {
        let pass = vertical(shared(BlurSettings {
            kernel: 1,
            ..BlurSettings::default()
        }));

        // Neighbors are sharp (coc 0) so only the center survives
        let samples = [(2000.0, 0.0), (2000.0, 0.0), (2000.0, 0.0)];
        let weights = pass.normalized_weights(2000.0, &samples);

        assert_eq!(weights, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_shared_kernel_between_instances() {
        let settings = shared(BlurSettings::default());
        let y = vertical(settings.clone());
        let x = horizontal(settings.clone());

        settings.write().kernel = 21;

        assert_eq!(y.kernel(), 21);
        assert_eq!(x.kernel(), y.kernel());
    }

    #[test]
    fn test_reads_and_dependencies() {
        let y = vertical(shared(BlurSettings::default()));
        assert_eq!(y.dependencies(), &[ids::COC]);
        assert!(y.reads().contains(&ResourceRef::SceneColor));
        assert!(y.reads().contains(&ResourceRef::SceneDepth));
        assert!(y.reads().contains(&ResourceRef::texture(ids::COC)));

        let x = horizontal(shared(BlurSettings::default()));
        assert_eq!(x.dependencies(), &[ids::BLUR_Y]);
        assert!(x.reads().contains(&ResourceRef::texture(ids::BLUR_Y)));
        assert!(x.reads().contains(&ResourceRef::SceneDepth));
        assert!(!x.is_coc_masked());
    }

    #[test]
    fn test_execute_requires_every_input() {
        let mut pass = vertical(shared(BlurSettings::default()));
        pass.setup(&PassSetupContext::default()).unwrap();

        let mut ctx = PassExecuteContext::default();
        ctx.resources
            .register_texture(SCENE_COLOR, TextureViewHandle(1));
        ctx.resources
            .register_texture(SCENE_DEPTH, TextureViewHandle(2));

        // CoC mask still missing
        assert!(matches!(pass.execute(&ctx), Err(PassError::Resource(_))));

        ctx.resources.register_texture(ids::COC, TextureViewHandle(3));
        assert!(pass.execute(&ctx).is_ok());
    }

    #[test]
    fn test_uniforms_layout() {
        assert_eq!(core::mem::size_of::<BlurUniforms>(), 32);

        let pass = vertical(shared(BlurSettings::default()));
        let uniforms = pass.uniforms();
        assert_eq!(uniforms.direction, [0.0, 1.0]);
        assert_eq!(uniforms.kernel, 15);
    }

    #[test]
    fn test_sampler_clamps_to_edge() {
        let pass = vertical(shared(BlurSettings::default()));
        let sampler = pass.sampler_desc();
        assert_eq!(sampler.address_mode_u, AddressMode::ClampToEdge);
        assert_eq!(sampler.mag_filter, FilterMode::Linear);
    }

    #[test]
    fn test_config_writes_through_to_shared_settings() {
        let settings = shared(BlurSettings::default());
        let mut y = vertical(settings.clone());

        let mut config = y.get_config().unwrap();
        config.config["kernel"] = serde_json::json!(31);

        y.apply_config(&config).unwrap();
        assert_eq!(settings.read().kernel, 31);
    }
}
