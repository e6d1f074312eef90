//! Post-Process Pass Trait
//!
//! Defines the interface for full-screen passes that can be registered
//! with a [`crate::pass::PostProcessChain`]. A pass declares the buffers
//! it reads and writes; the chain derives execution order from the
//! dependencies between passes.
//!
//! # Example
//!
//! ```ignore
//! use focal_render::pass::*;
//!
//! struct Vignette {
//!     strength: f32,
//! }
//!
//! impl PostProcessPass for Vignette {
//!     fn name(&self) -> &str { "vignette" }
//!
//!     fn reads(&self) -> Vec<ResourceRef> {
//!         vec![ResourceRef::SceneColor]
//!     }
//!
//!     fn execute(&self, context: &PassExecuteContext) -> Result<(), PassError> {
//!         // Record the full-screen draw...
//!         Ok(())
//!     }
//!
//!     fn dispose(&mut self, _camera: CameraId) -> bool { true }
//! }
//! ```

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

use crate::resource::TextureFormat;
use crate::scene::CameraId;

/// Name under which the host registers the scene color buffer
pub const SCENE_COLOR: &str = "scene_color";

/// Name under which the host registers the scene depth buffer
pub const SCENE_DEPTH: &str = "scene_depth";

/// Abstract texture view handle
///
/// The backend resolves this to an actual texture view; passes only
/// route handles between each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureViewHandle(pub u64);

/// Reference to a buffer a pass reads or writes
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceRef {
    /// The scene color buffer as rendered before post-processing
    SceneColor,

    /// The scene's linearized depth buffer
    SceneDepth,

    /// Named texture owned by another pass
    Texture(String),
}

impl ResourceRef {
    /// Create a named texture reference
    pub fn texture(name: impl Into<String>) -> Self {
        Self::Texture(name.into())
    }
}

/// Resources available to passes during execution
#[derive(Clone, Debug, Default)]
pub struct PassResources {
    /// Available texture views by name
    textures: BTreeMap<String, TextureViewHandle>,
    /// Surface dimensions
    pub surface_size: (u32, u32),
}

impl PassResources {
    /// Create empty pass resources
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a texture view under a name
    pub fn register_texture(&mut self, name: impl Into<String>, handle: TextureViewHandle) {
        self.textures.insert(name.into(), handle);
    }

    /// Get a texture view by name
    pub fn get_texture(&self, name: &str) -> Option<TextureViewHandle> {
        self.textures.get(name).copied()
    }

    /// Get the scene color buffer
    pub fn scene_color(&self) -> Option<TextureViewHandle> {
        self.get_texture(SCENE_COLOR)
    }

    /// Get the scene depth buffer
    pub fn scene_depth(&self) -> Option<TextureViewHandle> {
        self.get_texture(SCENE_DEPTH)
    }

    /// Resolve a resource reference to a texture view
    pub fn resolve(&self, reference: &ResourceRef) -> Option<TextureViewHandle> {
        match reference {
            ResourceRef::SceneColor => self.scene_color(),
            ResourceRef::SceneDepth => self.scene_depth(),
            ResourceRef::Texture(name) => self.get_texture(name),
        }
    }

    /// List all available textures
    pub fn texture_names(&self) -> impl Iterator<Item = &str> {
        self.textures.keys().map(|s| s.as_str())
    }
}

/// Context for pass setup
#[derive(Clone, Debug)]
pub struct PassSetupContext {
    /// Surface dimensions
    pub surface_size: (u32, u32),
    /// Surface format
    pub surface_format: TextureFormat,
}

impl Default for PassSetupContext {
    fn default() -> Self {
        Self {
            surface_size: (1920, 1080),
            surface_format: TextureFormat::Rgba16Float,
        }
    }
}

/// Context for pass execution
#[derive(Clone, Debug)]
pub struct PassExecuteContext {
    /// Available resources
    pub resources: PassResources,
    /// Frame number
    pub frame: u64,
    /// Surface dimensions
    pub surface_size: (u32, u32),
}

impl Default for PassExecuteContext {
    fn default() -> Self {
        Self {
            resources: PassResources::default(),
            frame: 0,
            surface_size: (1920, 1080),
        }
    }
}

/// Errors that can occur during pass operations
///
/// Numeric degeneracies never surface here; passes absorb them by
/// clamping. Only structural and lifecycle violations reach the caller.
#[derive(Clone, Debug)]
pub enum PassError {
    /// Error during pass setup or effect construction
    Setup(String),
    /// Error during pass execution
    Execute(String),
    /// Resource not found or unavailable
    Resource(String),
    /// Dependency error (unknown pass, cycle)
    Dependency(String),
    /// Pass was used after disposal
    Disposed(String),
}

impl fmt::Display for PassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(msg) => write!(f, "Setup error: {}", msg),
            Self::Execute(msg) => write!(f, "Execute error: {}", msg),
            Self::Resource(msg) => write!(f, "Resource error: {}", msg),
            Self::Dependency(msg) => write!(f, "Dependency error: {}", msg),
            Self::Disposed(name) => write!(f, "Pass used after disposal: {}", name),
        }
    }
}

/// Tracks which cameras a pass is attached to
///
/// A pass is constructed attached to one camera and may be shared with
/// more. Detaching the last camera releases the pass; detaching a
/// camera that is not attached is a no-op, which makes per-camera
/// disposal idempotent.
#[derive(Clone, Debug)]
pub struct CameraBinding {
    cameras: BTreeSet<CameraId>,
}

impl CameraBinding {
    /// Create a binding attached to a single camera
    pub fn new(camera: CameraId) -> Self {
        let mut cameras = BTreeSet::new();
        cameras.insert(camera);
        Self { cameras }
    }

    /// Attach an additional camera
    pub fn attach(&mut self, camera: CameraId) {
        self.cameras.insert(camera);
    }

    /// Detach a camera; returns true if it was attached
    pub fn detach(&mut self, camera: CameraId) -> bool {
        self.cameras.remove(&camera)
    }

    /// Check whether a camera is attached
    pub fn is_attached(&self, camera: CameraId) -> bool {
        self.cameras.contains(&camera)
    }

    /// Check whether every camera has been detached
    pub fn is_released(&self) -> bool {
        self.cameras.is_empty()
    }
}

/// Serializable pass configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PassConfigData {
    /// Pass name
    pub name: String,
    /// Enabled state
    pub enabled: bool,
    /// Pass-specific configuration as JSON
    pub config: serde_json::Value,
}

impl Default for PassConfigData {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            config: serde_json::Value::Null,
        }
    }
}

/// Trait for implementing post-process passes
pub trait PostProcessPass: Send + Sync {
    /// Get the unique name of this pass
    fn name(&self) -> &str;

    /// Get dependencies on other passes (must run after these)
    fn dependencies(&self) -> &[&str] {
        &[]
    }

    /// Get resources this pass reads from
    fn reads(&self) -> Vec<ResourceRef> {
        Vec::new()
    }

    /// Get resources this pass writes to
    fn writes(&self) -> Vec<ResourceRef> {
        Vec::new()
    }

    /// Called once when the pass is registered
    fn setup(&mut self, _context: &PassSetupContext) -> Result<(), PassError> {
        Ok(())
    }

    /// Called each frame to record the pass
    fn execute(&self, context: &PassExecuteContext) -> Result<(), PassError>;

    /// Called when the pass is unregistered or reset
    fn cleanup(&mut self) {}

    /// Attach the pass to an additional camera
    fn attach(&mut self, _camera: CameraId) {}

    /// Release the pass resources held for a camera
    ///
    /// Returns true when the last camera was detached and the pass
    /// released its GPU resources. Disposing for a camera that is not
    /// attached (or was already disposed) is a no-op returning false.
    fn dispose(&mut self, camera: CameraId) -> bool;

    /// Check if this pass is currently enabled
    fn is_enabled(&self) -> bool {
        true
    }

    /// Enable or disable this pass
    fn set_enabled(&mut self, _enabled: bool) {}

    /// Called when the surface is resized
    fn on_resize(&mut self, _new_size: (u32, u32)) {}

    /// Get pass configuration for serialization
    fn get_config(&self) -> Option<PassConfigData> {
        None
    }

    /// Apply configuration from deserialization
    fn apply_config(&mut self, _config: &PassConfigData) -> Result<(), PassError> {
        Ok(())
    }
}
