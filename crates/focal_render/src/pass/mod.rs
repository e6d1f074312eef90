//! Post-Processing Pass System
//!
//! Infrastructure for full-screen passes executed after the scene is
//! rendered:
//! - [`PostProcessPass`]: the trait every pass implements
//! - [`PostProcessChain`]: registration under stable identifiers and
//!   dependency-ordered execution
//!
//! The chain dictates intra-frame ordering only; when a frame runs is
//! the host scheduler's business.

pub mod chain;
pub mod post;

pub use chain::{ChainState, PostProcessChain};
pub use post::{
    CameraBinding, PassConfigData, PassError, PassExecuteContext, PassResources,
    PassSetupContext, PostProcessPass, ResourceRef, TextureViewHandle, SCENE_COLOR, SCENE_DEPTH,
};
