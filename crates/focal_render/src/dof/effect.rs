//! Depth-of-Field Effect Orchestrator
//!
//! Owns the five passes making up the effect, registers them with the
//! host chain in their fixed order, and exposes one parameter surface
//! that fans out to the passes that consume each parameter. Disposal is
//! scoped per camera and idempotent.

use alloc::string::String;
use alloc::sync::Arc;
use parking_lot::RwLock;

use crate::dof::blur::{BlurSettings, DepthAwareBlurPass};
use crate::dof::capture::CapturePass;
use crate::dof::coc::{CircleOfConfusionPass, CocSettings, MIN_LENS_PARAM};
use crate::dof::ids;
use crate::dof::merge::MergePass;
use crate::pass::{PassError, PostProcessChain, ResourceRef};
use crate::scene::{CameraId, Scene};

/// Depth-of-field effect over a post-process chain
///
/// Construction requires the scene to support depth rendering; when it
/// does not, nothing is registered and the error is returned to the
/// caller.
pub struct DepthOfFieldEffect {
    /// Camera the effect was created for
    camera: CameraId,

    /// Circle-of-confusion model state, shared with the CoC pass
    coc: Arc<RwLock<CocSettings>>,

    /// Vertical blur parameters
    blur_y: Arc<RwLock<BlurSettings>>,

    /// Horizontal blur parameters
    blur_x: Arc<RwLock<BlurSettings>>,
}

impl DepthOfFieldEffect {
    /// Create the effect and register its passes with the chain
    ///
    /// Enables the scene's depth renderer, then registers the circle of
    /// confusion, its capture, the two blur instances, and the merge,
    /// in that order. If any registration fails the ones already made
    /// are rolled back so no partial pipeline is left behind.
    pub fn new(
        chain: &mut PostProcessChain,
        scene: &mut Scene,
        camera: CameraId,
    ) -> Result<Self, PassError> {
        // Depth rendering is a hard precondition for the whole effect
        let depth_map = {
            let renderer = scene.enable_depth_renderer()?;
            renderer
                .depth_map()
                .ok_or_else(|| PassError::Setup(String::from("depth map unavailable")))?
        };
        log::debug!("depth of field sourcing depth from {:?}", depth_map);

        let format = scene.pipeline_format();
        let sampling = scene.sampling();

        let coc = Arc::new(RwLock::new(CocSettings::default()));
        let blur_y = Arc::new(RwLock::new(BlurSettings::default()));
        let blur_x = Arc::new(RwLock::new(BlurSettings::default()));

        let mut registered: alloc::vec::Vec<&'static str> = alloc::vec::Vec::new();
        let result = (|| -> Result<(), PassError> {
            chain.register(CircleOfConfusionPass::new(
                coc.clone(),
                camera,
                format,
                sampling,
            ))?;
            registered.push(ids::COC);

            chain.register(CapturePass::new(
                ids::COC_CAPTURE,
                ids::COC,
                camera,
                format,
                sampling,
            ))?;
            registered.push(ids::COC_CAPTURE);

            chain.register(DepthAwareBlurPass::new(
                ids::BLUR_Y,
                [0.0, 1.0],
                blur_y.clone(),
                ResourceRef::SceneColor,
                Some(ids::COC),
                &[ids::COC],
                camera,
                format,
                sampling,
            ))?;
            registered.push(ids::BLUR_Y);

            // The vertical result already folds the CoC masking in, so
            // the horizontal instance only re-checks depth
            chain.register(DepthAwareBlurPass::new(
                ids::BLUR_X,
                [1.0, 0.0],
                blur_x.clone(),
                ResourceRef::texture(ids::BLUR_Y),
                None,
                &[ids::BLUR_Y],
                camera,
                format,
                sampling,
            ))?;
            registered.push(ids::BLUR_X);

            chain.register(MergePass::new(
                ids::MERGE,
                ids::BLUR_X,
                ids::COC_CAPTURE,
                camera,
                format,
                sampling,
            ))?;
            registered.push(ids::MERGE);

            Ok(())
        })();

        if let Err(e) = result {
            log::warn!("depth of field registration failed, rolling back: {}", e);
            for name in registered {
                chain.unregister(name);
            }
            return Err(e);
        }

        log::debug!("depth of field effect registered for camera {:?}", camera);

        Ok(Self {
            camera,
            coc,
            blur_y,
            blur_x,
        })
    }

    /// Camera the effect was created for
    pub fn camera(&self) -> CameraId {
        self.camera
    }

    /// Attach the effect's passes to an additional camera
    pub fn attach_camera(&self, chain: &mut PostProcessChain, camera: CameraId) {
        for name in [
            ids::COC,
            ids::COC_CAPTURE,
            ids::BLUR_Y,
            ids::BLUR_X,
            ids::MERGE,
        ] {
            chain.attach_pass(name, camera);
        }
    }

    /// Set the kernel radius of both blur instances
    ///
    /// The two instances must always agree on the radius; this is the
    /// only place it can be set.
    pub fn set_kernel_size(&self, kernel: u32) {
        self.blur_y.write().kernel = kernel;
        self.blur_x.write().kernel = kernel;
    }

    /// Kernel radius shared by both blur instances
    pub fn kernel_size(&self) -> u32 {
        self.blur_x.read().kernel
    }

    /// Set the focal length of the camera used in the effect, in
    /// millimeters
    pub fn set_focal_length(&self, value: f32) {
        self.coc.write().lens.focal_length = value.max(MIN_LENS_PARAM);
    }

    /// Focal length in millimeters
    pub fn focal_length(&self) -> f32 {
        self.coc.read().lens.focal_length
    }

    /// Set the f-stop; the aperture diameter is lens_size / f_stop
    pub fn set_f_stop(&self, value: f32) {
        self.coc.write().lens.f_stop = value.max(MIN_LENS_PARAM);
    }

    /// F-stop of the effect's camera
    pub fn f_stop(&self) -> f32 {
        self.coc.read().lens.f_stop
    }

    /// Set the distance to the focal plane in millimeters
    pub fn set_focus_distance(&self, value: f32) {
        self.coc.write().lens.focus_distance = value.max(MIN_LENS_PARAM);
    }

    /// Distance to the focal plane in millimeters
    pub fn focus_distance(&self) -> f32 {
        self.coc.read().lens.focus_distance
    }

    /// Set the lens size in millimeters
    pub fn set_lens_size(&self, value: f32) {
        self.coc.write().lens.lens_size = value.max(MIN_LENS_PARAM);
    }

    /// Lens size in millimeters
    pub fn lens_size(&self) -> f32 {
        self.coc.read().lens.lens_size
    }

    /// Set the radius at which the circle of confusion saturates
    pub fn set_max_coc(&self, value: f32) {
        self.coc.write().max_coc = value.max(0.0);
    }

    /// Saturation radius in millimeters
    pub fn max_coc(&self) -> f32 {
        self.coc.read().max_coc
    }

    /// Normalized circle of confusion at a given depth under the
    /// current parameters
    pub fn coc_at_depth(&self, depth: f32) -> f32 {
        self.coc.read().normalized_coc(depth)
    }

    /// Dispose each of the internal passes for a given camera
    ///
    /// Safe to call repeatedly; a second call for the same camera is a
    /// no-op, and other cameras sharing the effect keep their
    /// resources.
    pub fn dispose_effects(&self, chain: &mut PostProcessChain, camera: CameraId) {
        chain.dispose_pass(ids::COC_CAPTURE, camera);
        chain.dispose_pass(ids::COC, camera);
        chain.dispose_pass(ids::BLUR_X, camera);
        chain.dispose_pass(ids::BLUR_Y, camera);
        chain.dispose_pass(ids::MERGE, camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dof::merge::MergePass;
    use crate::pass::{
        PassExecuteContext, PassSetupContext, TextureViewHandle, SCENE_COLOR, SCENE_DEPTH,
    };

    fn build() -> (PostProcessChain, Scene, CameraId, DepthOfFieldEffect) {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut chain = PostProcessChain::new();
        let mut scene = Scene::new();
        let camera = scene.create_camera();
        let effect = DepthOfFieldEffect::new(&mut chain, &mut scene, camera).unwrap();
        (chain, scene, camera, effect)
    }

    fn frame_context() -> PassExecuteContext {
        let mut ctx = PassExecuteContext::default();
        let resources = &mut ctx.resources;
        resources.register_texture(SCENE_COLOR, TextureViewHandle(1));
        resources.register_texture(SCENE_DEPTH, TextureViewHandle(2));
        resources.register_texture(ids::COC, TextureViewHandle(3));
        resources.register_texture(ids::COC_CAPTURE, TextureViewHandle(4));
        resources.register_texture(ids::BLUR_Y, TextureViewHandle(5));
        resources.register_texture(ids::BLUR_X, TextureViewHandle(6));
        ctx
    }

    #[test]
    fn test_passes_register_in_fixed_order() {
        let (chain, _, _, _) = build();

        assert_eq!(
            chain.order(),
            &[
                ids::COC,
                ids::COC_CAPTURE,
                ids::BLUR_Y,
                ids::BLUR_X,
                ids::MERGE,
            ]
        );
    }

    #[test]
    fn test_construction_fails_without_depth_support() {
        let mut chain = PostProcessChain::new();
        let mut scene = Scene::without_depth_support();
        let camera = scene.create_camera();

        let result = DepthOfFieldEffect::new(&mut chain, &mut scene, camera);

        assert!(matches!(result, Err(PassError::Setup(_))));
        // No partial pipeline left behind
        assert!(chain.is_empty());
    }

    #[test]
    fn test_rollback_on_registration_conflict() {
        let mut chain = PostProcessChain::new();
        let mut scene = Scene::new();
        let camera = scene.create_camera();

        // A foreign pass already squats on the blur identifier
        chain
            .register(CapturePass::new(
                ids::BLUR_Y,
                ids::COC,
                camera,
                scene.pipeline_format(),
                scene.sampling(),
            ))
            .unwrap();

        let result = DepthOfFieldEffect::new(&mut chain, &mut scene, camera);
        assert!(result.is_err());

        // Only the squatter remains; the partial registration rolled back
        assert_eq!(chain.len(), 1);
        assert!(chain.has_pass(ids::BLUR_Y));
        assert!(!chain.has_pass(ids::COC));
        assert!(!chain.has_pass(ids::MERGE));
    }

    #[test]
    fn test_kernel_size_fans_out_to_both_instances() {
        let (chain, _, _, effect) = build();

        effect.set_kernel_size(21);

        assert_eq!(effect.kernel_size(), 21);
        for name in [ids::BLUR_Y, ids::BLUR_X] {
            let config = chain.get_pass(name).unwrap().get_config().unwrap();
            assert_eq!(config.config["kernel"], 21, "kernel mismatch on {}", name);
        }
    }

    #[test]
    fn test_lens_parameters_fan_out_to_coc_pass() {
        let (chain, _, _, effect) = build();

        effect.set_focal_length(85.0);
        effect.set_f_stop(2.8);
        effect.set_focus_distance(1500.0);
        effect.set_lens_size(60.0);

        assert_eq!(effect.focal_length(), 85.0);
        assert_eq!(effect.f_stop(), 2.8);
        assert_eq!(effect.focus_distance(), 1500.0);
        assert_eq!(effect.lens_size(), 60.0);

        let config = chain.get_pass(ids::COC).unwrap().get_config().unwrap();
        let lens = &config.config["lens"];
        assert_eq!(lens["focal_length"].as_f64().unwrap() as f32, 85.0);
        assert_eq!(lens["f_stop"].as_f64().unwrap() as f32, 2.8);
    }

    #[test]
    fn test_degenerate_parameters_are_clamped() {
        let (_, _, _, effect) = build();

        effect.set_f_stop(0.0);
        assert!(effect.f_stop() > 0.0);

        effect.set_focus_distance(-100.0);
        assert!(effect.focus_distance() > 0.0);
    }

    #[test]
    fn test_full_frame_executes() {
        let (mut chain, _, _, _) = build();

        chain.setup_all(&PassSetupContext::default()).unwrap();
        assert!(chain.execute(&frame_context()).is_ok());
    }

    #[test]
    fn test_dispose_is_idempotent_per_camera() {
        let (mut chain, _, camera, effect) = build();

        effect.dispose_effects(&mut chain, camera);
        for name in chain.pass_names() {
            assert!(!chain.is_pass_enabled(name));
        }

        // Second disposal for the same camera must not panic or error
        effect.dispose_effects(&mut chain, camera);
    }

    #[test]
    fn test_disposing_one_camera_spares_the_other() {
        let (mut chain, scene, camera_a, effect) = build();

        let camera_b = scene.create_camera();
        effect.attach_camera(&mut chain, camera_b);

        chain.setup_all(&PassSetupContext::default()).unwrap();

        // Camera A goes away; the passes keep serving camera B
        effect.dispose_effects(&mut chain, camera_a);
        for name in [ids::COC, ids::BLUR_Y, ids::BLUR_X, ids::MERGE] {
            assert!(chain.is_pass_enabled(name), "{} died with camera A", name);
        }
        assert!(chain.execute(&frame_context()).is_ok());

        // Disposing the last camera releases everything
        effect.dispose_effects(&mut chain, camera_b);
        for name in chain.pass_names() {
            assert!(!chain.is_pass_enabled(name));
        }
    }

    #[test]
    fn test_scenario_standard_portrait_lens() {
        let (_, _, _, effect) = build();

        // 50mm lens wide open at f/1.4, focused at 2m
        effect.set_focal_length(50.0);
        effect.set_f_stop(1.4);
        effect.set_focus_distance(2000.0);
        effect.set_lens_size(50.0);
        effect.set_kernel_size(15);

        let sharp = [0.8, 0.3, 0.2, 1.0];
        let blurred = [0.4, 0.4, 0.4, 1.0];

        // On the focal plane: perfectly sharp
        let coc_focus = effect.coc_at_depth(2000.0);
        assert!(coc_focus.abs() < 1.0e-6);
        assert_eq!(MergePass::resolve(sharp, blurred, coc_focus), sharp);

        // Far background: saturated, fully blurred
        let coc_far = effect.coc_at_depth(10_000.0);
        assert_eq!(coc_far, 1.0);
        assert_eq!(MergePass::resolve(sharp, blurred, coc_far), blurred);

        // Just behind the focal plane: proportional blend
        let coc_near_miss = effect.coc_at_depth(2100.0);
        assert!(coc_near_miss > 0.0 && coc_near_miss < 1.0);
        let out = MergePass::resolve(sharp, blurred, coc_near_miss);
        for c in 0..3 {
            let expected = sharp[c] + (blurred[c] - sharp[c]) * coc_near_miss;
            assert!((out[c] - expected).abs() < 1.0e-6);
        }
    }

    #[test]
    fn test_stopping_down_sharpens_every_depth() {
        let (_, _, _, effect) = build();

        let depths = [500.0, 1500.0, 2100.0, 5000.0];
        let wide: alloc::vec::Vec<f32> =
            depths.iter().map(|&d| effect.coc_at_depth(d)).collect();

        effect.set_f_stop(2.8);
        for (i, &d) in depths.iter().enumerate() {
            assert!(
                effect.coc_at_depth(d) <= wide[i],
                "f/2.8 must not blur more than f/1.4 at {}",
                d
            );
        }
    }
}
