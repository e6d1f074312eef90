//! Render Resources - GPU resource abstractions
//!
//! Abstract representations of the textures and samplers the
//! post-processing passes exchange. Any graphics backend (Vulkan, WGPU,
//! DirectX, etc.) can realize these descriptions; the passes themselves
//! never touch backend objects.

use alloc::string::String;

/// Texture format
///
/// Trimmed to the formats post-processing actually touches: color
/// targets, single-channel factor buffers, and depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TextureFormat {
    // Single and dual channel
    R8Unorm,
    R16Float,
    R32Float,
    Rg16Float,

    // Color targets
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    Rgba32Float,

    // Depth
    Depth24Plus,
    Depth32Float,
}

impl TextureFormat {
    /// Check if this is a depth format
    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth24Plus | Self::Depth32Float)
    }

    /// Check if this is sRGB
    pub fn is_srgb(&self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb)
    }

    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::R8Unorm => 1,
            Self::R16Float => 2,
            Self::R32Float
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Depth24Plus
            | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }
}

/// Texture dimension
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D1,
    D2,
    D3,
}

/// Texture usage flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureUsage(pub u32);

impl TextureUsage {
    pub const COPY_SRC: Self = Self(1 << 0);
    pub const COPY_DST: Self = Self(1 << 1);
    pub const TEXTURE_BINDING: Self = Self(1 << 2);
    pub const STORAGE_BINDING: Self = Self(1 << 3);
    pub const RENDER_ATTACHMENT: Self = Self(1 << 4);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl core::ops::BitOr for TextureUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Texture descriptor
#[derive(Clone, Debug)]
pub struct TextureDesc {
    /// Debug label
    pub label: Option<String>,
    /// Size in pixels
    pub size: [u32; 3],
    /// Mip level count
    pub mip_level_count: u32,
    /// Sample count
    pub sample_count: u32,
    /// Dimension
    pub dimension: TextureDimension,
    /// Format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: TextureUsage,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            label: None,
            size: [1, 1, 1],
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba16Float,
            usage: TextureUsage::TEXTURE_BINDING,
        }
    }
}

impl TextureDesc {
    /// Describe a full-screen render target
    pub fn render_target(
        label: impl Into<String>,
        size: (u32, u32),
        format: TextureFormat,
    ) -> Self {
        Self {
            label: Some(label.into()),
            size: [size.0, size.1, 1],
            format,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
            ..Default::default()
        }
    }
}

/// Sampler filter mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Sampler address mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressMode {
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Compare function for depth samplers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Sampler descriptor
#[derive(Clone, Debug)]
pub struct SamplerDesc {
    /// Debug label
    pub label: Option<String>,
    /// Address mode U
    pub address_mode_u: AddressMode,
    /// Address mode V
    pub address_mode_v: AddressMode,
    /// Magnification filter
    pub mag_filter: FilterMode,
    /// Minification filter
    pub min_filter: FilterMode,
    /// Compare function for depth samplers
    pub compare: Option<CompareFunction>,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            label: None,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            compare: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_formats() {
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(TextureFormat::Depth24Plus.is_depth());
        assert!(!TextureFormat::Rgba16Float.is_depth());
        assert!(!TextureFormat::R16Float.is_depth());
    }

    #[test]
    fn test_srgb_formats() {
        assert!(TextureFormat::Rgba8UnormSrgb.is_srgb());
        assert!(!TextureFormat::Rgba8Unorm.is_srgb());
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(TextureFormat::R16Float.bytes_per_pixel(), 2);
        assert_eq!(TextureFormat::Rgba16Float.bytes_per_pixel(), 8);
        assert_eq!(TextureFormat::Rgba32Float.bytes_per_pixel(), 16);
    }

    #[test]
    fn test_usage_flags() {
        let usage = TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING;
        assert!(usage.contains(TextureUsage::RENDER_ATTACHMENT));
        assert!(usage.contains(TextureUsage::TEXTURE_BINDING));
        assert!(!usage.contains(TextureUsage::STORAGE_BINDING));
    }

    #[test]
    fn test_render_target_desc() {
        let desc = TextureDesc::render_target("dof_coc", (1280, 720), TextureFormat::R16Float);
        assert_eq!(desc.size, [1280, 720, 1]);
        assert_eq!(desc.format, TextureFormat::R16Float);
        assert!(desc.usage.contains(TextureUsage::RENDER_ATTACHMENT));
    }
}
