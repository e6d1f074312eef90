//! Unique identifier generation with generational indices
//!
//! Identifiers name the long-lived actors of the pipeline: cameras,
//! registered passes, and the textures they exchange. Name-derived ids
//! are stable across runs so that serialized pipeline state can be
//! matched back up after a reload.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::sync::atomic::{AtomicU64, Ordering};

/// A unique identifier with a generation counter for safe reuse
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Id {
    /// Lower 32 bits: index, Upper 32 bits: generation
    bits: u64,
}

impl Id {
    /// Create a new ID from index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: (generation as u64) << 32 | index as u64,
        }
    }

    /// Create a null/invalid ID
    #[inline]
    pub const fn null() -> Self {
        Self { bits: u64::MAX }
    }

    /// Check if this ID is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.bits == u64::MAX
    }

    /// Get the index portion
    #[inline]
    pub const fn index(&self) -> u32 {
        self.bits as u32
    }

    /// Get the generation portion
    #[inline]
    pub const fn generation(&self) -> u32 {
        (self.bits >> 32) as u32
    }

    /// Get the raw bits
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    /// Create an ID from a name using a simple hash
    ///
    /// The same name always produces the same ID, which makes
    /// name-derived ids suitable as stable registration keys.
    pub fn from_name(name: &str) -> Self {
        // FNV-1a
        let mut hash = 0xcbf29ce484222325u64;
        for byte in name.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        Self { bits: hash }
    }
}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Id(null)")
        } else {
            write!(f, "Id({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}v{}", self.index(), self.generation())
        }
    }
}

/// Thread-safe ID generator
///
/// Hands out sequential ids, generation zero. Used by the scene to mint
/// camera identities.
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a new ID generator
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Generate the next unique ID
    pub fn next(&self) -> Id {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        Id::new(index as u32, 0)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id = Id::new(42, 7);
        assert_eq!(id.index(), 42);
        assert_eq!(id.generation(), 7);
        assert!(!id.is_null());
    }

    #[test]
    fn test_null_id() {
        let id = Id::null();
        assert!(id.is_null());
        assert!(!Id::new(0, 0).is_null());
    }

    #[test]
    fn test_bits_round_trip() {
        let id = Id::new(123, 456);
        assert_eq!(Id::from_bits(id.to_bits()), id);
    }

    #[test]
    fn test_name_hash_is_stable() {
        let a = Id::from_name("dof_coc");
        let b = Id::from_name("dof_coc");
        let c = Id::from_name("dof_merge");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_generator_is_sequential() {
        let generator = IdGenerator::new();
        let first = generator.next();
        let second = generator.next();

        assert_ne!(first, second);
        assert_eq!(first.index() + 1, second.index());
    }
}
