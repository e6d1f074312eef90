//! # focal_render - Depth-of-Field Post-Processing
//!
//! Backend-agnostic depth-of-field pipeline with:
//! - A post-process pass trait and a chain that keeps passes in
//!   dependency order under stable identifiers
//! - A physically-motivated circle-of-confusion model
//! - Depth-aware separable blur that respects silhouette edges
//! - A compositor blending sharp and blurred color per pixel
//!
//! ## Architecture
//!
//! The effect is five passes over shared, read-only scene inputs:
//!
//! ```text
//! scene depth -> coc -> [capture, blur-y -> blur-x] -> merge -> output
//!                                 scene color ----------^
//! ```
//!
//! GPU submission is the host's business: passes describe the textures
//! they exchange through abstract handles, and any backend can realize
//! them.
//!
//! ## Example
//!
//! ```ignore
//! use focal_render::prelude::*;
//!
//! let mut chain = PostProcessChain::new();
//! let mut scene = Scene::new();
//! let camera = scene.create_camera();
//!
//! let dof = DepthOfFieldEffect::new(&mut chain, &mut scene, camera)?;
//! dof.set_focus_distance(1500.0);
//! dof.set_kernel_size(21);
//!
//! // Each frame
//! chain.execute(&frame_context)?;
//!
//! // Teardown
//! dof.dispose_effects(&mut chain, camera);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod dof;
pub mod pass;
pub mod resource;
pub mod scene;

pub use resource::*;

pub use pass::{
    CameraBinding, ChainState, PassConfigData, PassError, PassExecuteContext, PassResources,
    PassSetupContext, PostProcessChain, PostProcessPass, ResourceRef, TextureViewHandle,
    SCENE_COLOR, SCENE_DEPTH,
};

pub use scene::{CameraId, DepthRenderer, Scene};

pub use dof::{
    BlurSettings, BlurUniforms, CapturePass, CircleOfConfusionPass, CocSettings, CocUniforms,
    DepthAwareBlurPass, DepthOfFieldEffect, LensParameters, MergePass,
};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::dof::{DepthOfFieldEffect, LensParameters};
    pub use crate::pass::{
        PassError, PassExecuteContext, PassResources, PassSetupContext, PostProcessChain,
        PostProcessPass, ResourceRef, TextureViewHandle,
    };
    pub use crate::resource::{FilterMode, TextureDesc, TextureFormat};
    pub use crate::scene::{CameraId, DepthRenderer, Scene};
}
