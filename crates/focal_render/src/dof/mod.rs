//! Depth-of-Field Effect
//!
//! Blurs objects that are closer or further than the camera's focal
//! plane, driven by a per-pixel circle of confusion computed from the
//! scene depth and the lens parameters.
//!
//! # Pipeline
//!
//! 1. Circle of confusion: depth + lens parameters -> per-pixel blur factor
//! 2. Capture: snapshot of the circle-of-confusion buffer for the merge
//! 3. Vertical blur: depth- and CoC-aware 1D blur
//! 4. Horizontal blur: second 1D blur over the vertical result
//! 5. Merge: blend sharp and blurred color by the captured CoC
//!
//! # Example
//!
//! ```ignore
//! use focal_render::dof::DepthOfFieldEffect;
//! use focal_render::pass::PostProcessChain;
//! use focal_render::scene::Scene;
//!
//! let mut chain = PostProcessChain::new();
//! let mut scene = Scene::new();
//! let camera = scene.create_camera();
//!
//! let dof = DepthOfFieldEffect::new(&mut chain, &mut scene, camera)?;
//! dof.set_focus_distance(1500.0);
//! dof.set_f_stop(2.8);
//! ```

pub mod blur;
pub mod capture;
pub mod coc;
pub mod effect;
pub mod merge;

pub use blur::{BlurSettings, BlurUniforms, DepthAwareBlurPass};
pub use capture::CapturePass;
pub use coc::{CircleOfConfusionPass, CocSettings, CocUniforms, LensParameters};
pub use effect::DepthOfFieldEffect;
pub use merge::MergePass;

/// Stable pass identifiers
///
/// Each identifier doubles as the name of the texture the pass writes.
pub mod ids {
    /// Circle-of-confusion pass
    pub const COC: &str = "dof_coc";
    /// Circle-of-confusion capture pass
    pub const COC_CAPTURE: &str = "dof_coc_capture";
    /// Vertical blur pass
    pub const BLUR_Y: &str = "dof_blur_y";
    /// Horizontal blur pass
    pub const BLUR_X: &str = "dof_blur_x";
    /// Merge pass
    pub const MERGE: &str = "dof_merge";
}
