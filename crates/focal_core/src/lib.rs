//! # focal_core - Focal Core
//!
//! Zero-dependency primitives shared by the Focal post-processing crates:
//! - Stable identifiers for passes, cameras, and GPU resources
//! - Generational handles for host-owned resources
//!
//! Everything here is backend-agnostic; the render crates build their
//! resource and pass layers on top of these types.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod handle;
pub mod id;

pub use handle::*;
pub use id::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::handle::{Handle, HandleAllocator, HandleMap};
    pub use crate::id::{Id, IdGenerator};
}
