use crate::backends::null::KilnBufferNull;
use crate::{KilnBufferDef, KilnResult};

/// A GPU buffer, backend-specific. Cloning is cheap, all variants are internally
/// reference counted.
#[derive(Clone)]
pub enum KilnBuffer {
    Null(KilnBufferNull),
}

impl KilnBuffer {
    pub fn buffer_def(&self) -> &KilnBufferDef {
        match self {
            KilnBuffer::Null(inner) => inner.buffer_def(),
        }
    }

    /// Unique id within the owning device, used as binding identity by caches
    pub fn buffer_id(&self) -> u64 {
        match self {
            KilnBuffer::Null(inner) => inner.buffer_id(),
        }
    }

    pub fn copy_to_host_visible_buffer(
        &self,
        data: &[u8],
        buffer_byte_offset: u64,
    ) -> KilnResult<()> {
        match self {
            KilnBuffer::Null(inner) => inner.copy_to_host_visible_buffer(data, buffer_byte_offset),
        }
    }

    pub fn null_buffer(&self) -> Option<&KilnBufferNull> {
        match self {
            KilnBuffer::Null(inner) => Some(inner),
        }
    }
}

impl std::fmt::Debug for KilnBuffer {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        f.debug_struct("KilnBuffer")
            .field("debug_name", &self.buffer_def().debug_name)
            .field("buffer_id", &self.buffer_id())
            .finish()
    }
}
