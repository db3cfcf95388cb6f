#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Pixel formats usable for render targets, depth-stencil surfaces and textures. This is the
/// subset of formats every supported backend can express; backends translate these into their
/// native equivalents.
#[allow(non_camel_case_types)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum KilnFormat {
    UNDEFINED,
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    R16_SFLOAT,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R10G10B10A2_UNORM,
    D16_UNORM,
    D24_UNORM_S8_UINT,
    D32_SFLOAT,
    D32_SFLOAT_S8_UINT,
}

impl Default for KilnFormat {
    fn default() -> Self {
        KilnFormat::UNDEFINED
    }
}

impl KilnFormat {
    pub fn has_depth(self) -> bool {
        matches!(
            self,
            KilnFormat::D16_UNORM
                | KilnFormat::D24_UNORM_S8_UINT
                | KilnFormat::D32_SFLOAT
                | KilnFormat::D32_SFLOAT_S8_UINT
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            KilnFormat::D24_UNORM_S8_UINT | KilnFormat::D32_SFLOAT_S8_UINT
        )
    }

    pub fn has_depth_or_stencil(self) -> bool {
        self.has_depth() || self.has_stencil()
    }
}
