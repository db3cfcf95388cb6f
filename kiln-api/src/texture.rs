use crate::backends::null::KilnTextureNull;
use crate::{KilnExtents2D, KilnTextureDef};

/// A texture or render target, backend-specific. Cloning is cheap, all variants are
/// internally reference counted.
#[derive(Clone)]
pub enum KilnTexture {
    Null(KilnTextureNull),
}

impl KilnTexture {
    pub fn texture_def(&self) -> &KilnTextureDef {
        match self {
            KilnTexture::Null(inner) => inner.texture_def(),
        }
    }

    pub fn extents(&self) -> KilnExtents2D {
        self.texture_def().extents
    }

    /// Monotonically increasing id unique to this texture within its device. Caches key
    /// on generations rather than pointers so a freed and reallocated texture can never
    /// alias a stale cache entry.
    pub fn generation(&self) -> u64 {
        match self {
            KilnTexture::Null(inner) => inner.generation(),
        }
    }

    pub fn null_texture(&self) -> Option<&KilnTextureNull> {
        match self {
            KilnTexture::Null(inner) => Some(inner),
        }
    }
}

impl std::fmt::Debug for KilnTexture {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        f.debug_struct("KilnTexture")
            .field("debug_name", &self.texture_def().debug_name)
            .field("generation", &self.generation())
            .finish()
    }
}
