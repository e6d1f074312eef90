//! Post-Process Chain
//!
//! Owns the registered passes and keeps them in dependency order. The
//! host registers each pass under a stable string identifier; the chain
//! resolves an execution order from pass dependencies, breaking ties by
//! registration order so a frame always runs the same sequence.
//!
//! # Example
//!
//! ```ignore
//! use focal_render::pass::PostProcessChain;
//!
//! let mut chain = PostProcessChain::new();
//! chain.register(my_pass)?;
//! chain.setup_all(&setup_ctx)?;
//!
//! // Each frame
//! chain.execute(&execute_ctx)?;
//! ```

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use super::post::{
    PassConfigData, PassError, PassExecuteContext, PassSetupContext, PostProcessPass,
};
use crate::scene::CameraId;

/// Pass registration data
struct PassData {
    /// The pass implementation
    pass: Box<dyn PostProcessPass>,
    /// Whether the pass participates in execution
    enabled: bool,
}

/// Serializable chain state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainState {
    /// Pass configurations
    pub configs: Vec<PassConfigData>,
    /// Enabled passes
    pub enabled: Vec<String>,
    /// Resolved execution order
    pub order: Vec<String>,
}

/// Manages post-process passes
pub struct PostProcessChain {
    /// Registered passes by name
    passes: BTreeMap<String, PassData>,

    /// Registration order; topological ties resolve in this order
    registered: Vec<String>,

    /// Resolved execution order
    order: Vec<String>,
}

impl Default for PostProcessChain {
    fn default() -> Self {
        Self::new()
    }
}

impl PostProcessChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            passes: BTreeMap::new(),
            registered: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Register a pass under its stable name
    ///
    /// Registering a second pass under an existing name is rejected; a
    /// stable identifier must keep referring to the same pass.
    pub fn register<P: PostProcessPass + 'static>(&mut self, pass: P) -> Result<(), PassError> {
        self.register_boxed(Box::new(pass))
    }

    /// Register a boxed pass
    pub fn register_boxed(&mut self, pass: Box<dyn PostProcessPass>) -> Result<(), PassError> {
        let name = pass.name().to_string();

        if self.passes.contains_key(&name) {
            log::warn!("pass '{}' is already registered", name);
            return Err(PassError::Setup(alloc::format!(
                "pass '{}' is already registered",
                name
            )));
        }

        self.passes.insert(
            name.clone(),
            PassData {
                pass,
                enabled: true,
            },
        );
        self.registered.push(name);
        self.rebuild_order();

        Ok(())
    }

    /// Unregister a pass
    pub fn unregister(&mut self, name: &str) {
        if let Some(mut data) = self.passes.remove(name) {
            data.pass.cleanup();
            self.registered.retain(|n| n != name);
            self.rebuild_order();
        }
    }

    /// Rebuild execution order with a topological sort over dependencies
    ///
    /// Passes are visited in registration order, so independent passes
    /// execute in the order they were registered.
    fn rebuild_order(&mut self) {
        let mut order = Vec::new();
        let mut visited = BTreeSet::new();
        let mut in_progress = BTreeSet::new();

        let names: Vec<String> = self.registered.clone();

        for name in &names {
            if !visited.contains(name) {
                if let Err(e) = self.visit_pass(name, &mut visited, &mut in_progress, &mut order) {
                    log::warn!("pass ordering failed: {}", e);
                    continue;
                }
            }
        }

        self.order = order;
    }

    /// Recursive helper for topological sort
    fn visit_pass(
        &self,
        name: &str,
        visited: &mut BTreeSet<String>,
        in_progress: &mut BTreeSet<String>,
        order: &mut Vec<String>,
    ) -> Result<(), PassError> {
        if in_progress.contains(name) {
            return Err(PassError::Dependency(alloc::format!(
                "circular dependency through '{}'",
                name
            )));
        }
        if visited.contains(name) {
            return Ok(());
        }

        in_progress.insert(name.to_string());

        if let Some(data) = self.passes.get(name) {
            for dep in data.pass.dependencies() {
                self.visit_pass(dep, visited, in_progress, order)?;
            }
        }

        in_progress.remove(name);
        visited.insert(name.to_string());
        order.push(name.to_string());

        Ok(())
    }

    /// Set up all passes, in execution order
    ///
    /// Fails on the first pass whose setup fails; passes set up before
    /// the failure are cleaned up so no partial chain survives.
    pub fn setup_all(&mut self, ctx: &PassSetupContext) -> Result<(), PassError> {
        let order = self.order.clone();
        for (i, name) in order.iter().enumerate() {
            let result = match self.passes.get_mut(name) {
                Some(data) => data.pass.setup(ctx),
                None => continue,
            };

            if let Err(e) = result {
                log::warn!("setup of pass '{}' failed: {}", name, e);
                for done in &order[..i] {
                    if let Some(data) = self.passes.get_mut(done) {
                        data.pass.cleanup();
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Execute all enabled passes in dependency order
    pub fn execute(&self, context: &PassExecuteContext) -> Result<(), PassError> {
        for name in &self.order {
            if let Some(data) = self.passes.get(name) {
                if !data.enabled || !data.pass.is_enabled() {
                    continue;
                }
                data.pass.execute(context)?;
            }
        }
        Ok(())
    }

    /// Clean up all passes
    pub fn cleanup_all(&mut self) {
        for data in self.passes.values_mut() {
            data.pass.cleanup();
        }
    }

    /// Attach a pass to an additional camera
    pub fn attach_pass(&mut self, name: &str, camera: CameraId) {
        match self.passes.get_mut(name) {
            Some(data) => data.pass.attach(camera),
            None => log::warn!("cannot attach camera to unknown pass '{}'", name),
        }
    }

    /// Dispose a pass's resources for one camera
    ///
    /// Returns true when the pass released its resources (no cameras
    /// remain attached); the pass is then taken out of execution.
    pub fn dispose_pass(&mut self, name: &str, camera: CameraId) -> bool {
        match self.passes.get_mut(name) {
            Some(data) => {
                let released = data.pass.dispose(camera);
                if released {
                    data.enabled = false;
                    log::debug!("pass '{}' released for camera {:?}", name, camera);
                }
                released
            }
            None => {
                log::warn!("cannot dispose unknown pass '{}'", name);
                false
            }
        }
    }

    /// Dispose every pass for one camera, in execution order
    pub fn dispose_all(&mut self, camera: CameraId) {
        let order = self.order.clone();
        for name in &order {
            self.dispose_pass(name, camera);
        }
    }

    /// Notify all passes of a surface resize
    pub fn on_resize(&mut self, new_size: (u32, u32)) {
        for data in self.passes.values_mut() {
            data.pass.on_resize(new_size);
        }
    }

    /// Enable/disable a single pass
    pub fn set_pass_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(data) = self.passes.get_mut(name) {
            data.enabled = enabled;
            data.pass.set_enabled(enabled);
        }
    }

    /// Check if a pass is enabled
    pub fn is_pass_enabled(&self, name: &str) -> bool {
        self.passes.get(name).map(|d| d.enabled).unwrap_or(false)
    }

    /// Get the resolved execution order
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Get a reference to a pass
    pub fn get_pass(&self, name: &str) -> Option<&dyn PostProcessPass> {
        self.passes.get(name).map(|d| d.pass.as_ref())
    }

    /// Get a mutable reference to a pass
    pub fn get_pass_mut(&mut self, name: &str) -> Option<&mut dyn PostProcessPass> {
        match self.passes.get_mut(name) {
            Some(data) => Some(data.pass.as_mut()),
            None => None,
        }
    }

    /// Check if a pass is registered
    pub fn has_pass(&self, name: &str) -> bool {
        self.passes.contains_key(name)
    }

    /// Get all pass names in registration order
    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.registered.iter().map(|s| s.as_str())
    }

    /// Get the number of registered passes
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if no passes are registered
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Snapshot the chain state for serialization
    pub fn get_state(&self) -> ChainState {
        let configs: Vec<PassConfigData> = self
            .passes
            .iter()
            .map(|(name, data)| {
                data.pass.get_config().unwrap_or_else(|| PassConfigData {
                    name: name.clone(),
                    enabled: data.enabled,
                    config: serde_json::Value::Null,
                })
            })
            .collect();

        let enabled: Vec<String> = self
            .passes
            .iter()
            .filter(|(_, d)| d.enabled)
            .map(|(n, _)| n.clone())
            .collect();

        ChainState {
            configs,
            enabled,
            order: self.order.clone(),
        }
    }

    /// Restore pass configurations and enabled states from a snapshot
    pub fn restore_state(&mut self, state: &ChainState) {
        for config in &state.configs {
            if let Some(data) = self.passes.get_mut(&config.name) {
                if let Err(e) = data.pass.apply_config(config) {
                    log::warn!("failed to restore config for '{}': {}", config.name, e);
                }
                data.enabled = config.enabled;
            }
        }

        for (name, data) in &mut self.passes {
            data.enabled = state.enabled.contains(name);
        }
    }
}
