use fnv::FnvHashMap;
use kiln_api::{
    KilnBuffer, KilnBufferDef, KilnDeviceContext, KilnError, KilnMemoryUsage, KilnResourceType,
    KilnResult, ShaderParameterGroup, ShaderStage,
};
use std::sync::{Arc, Mutex};

/// Size used for a (stage, group) default buffer when no program has demanded more
pub const DEFAULT_CONSTANT_BUFFER_SIZE: u64 = 256;

struct ConstantBufferInner {
    shadow: Vec<u8>,
    dirty: bool,
}

/// A uniform buffer with a CPU shadow copy. Parameter writes land in the shadow and
/// are uploaded at most once per draw, when [`ConstantBuffer::flush`] runs.
pub struct ConstantBuffer {
    buffer: KilnBuffer,
    inner: Mutex<ConstantBufferInner>,
}

impl ConstantBuffer {
    fn new(
        device_context: &KilnDeviceContext,
        size: u64,
        debug_name: String,
    ) -> KilnResult<Self> {
        let buffer = device_context.create_buffer(&KilnBufferDef {
            size,
            memory_usage: KilnMemoryUsage::CpuToGpu,
            resource_type: KilnResourceType::UNIFORM_BUFFER,
            debug_name,
            ..Default::default()
        })?;

        Ok(ConstantBuffer {
            buffer,
            inner: Mutex::new(ConstantBufferInner {
                shadow: vec![0; size as usize],
                dirty: false,
            }),
        })
    }

    pub fn buffer(&self) -> &KilnBuffer {
        &self.buffer
    }

    pub fn size(&self) -> u64 {
        self.buffer.buffer_def().size
    }

    pub fn write(
        &self,
        byte_offset: u32,
        data: &[u8],
    ) -> KilnResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let begin = byte_offset as usize;
        let end = begin + data.len();
        if end > inner.shadow.len() {
            return Err(KilnError::ConfigurationError(format!(
                "Write of {} bytes at offset {} overflows constant buffer '{}' of size {}",
                data.len(),
                byte_offset,
                self.buffer.buffer_def().debug_name,
                inner.shadow.len()
            )));
        }

        inner.shadow[begin..end].copy_from_slice(data);
        inner.dirty = true;
        Ok(())
    }

    /// Upload the shadow copy if any write landed since the last flush
    pub fn flush(&self) -> KilnResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.dirty {
            self.buffer.copy_to_host_visible_buffer(&inner.shadow, 0)?;
            inner.dirty = false;
        }

        Ok(())
    }
}

/// Owns the default constant buffer for every (stage, group) slot. Buffers grow but
/// never shrink; growing replaces the backend buffer, and the caller must rebind the
/// new buffer into every live SRB.
pub struct ConstantBufferCache {
    device_context: KilnDeviceContext,
    defaults: Mutex<FnvHashMap<(ShaderStage, ShaderParameterGroup), Arc<ConstantBuffer>>>,
}

impl ConstantBufferCache {
    pub fn new(device_context: &KilnDeviceContext) -> Self {
        ConstantBufferCache {
            device_context: device_context.clone(),
            defaults: Mutex::new(Default::default()),
        }
    }

    pub fn get(
        &self,
        stage: ShaderStage,
        group: ShaderParameterGroup,
    ) -> Option<Arc<ConstantBuffer>> {
        self.defaults.lock().unwrap().get(&(stage, group)).cloned()
    }

    /// Return the default buffer for a slot, creating or growing it so it holds at
    /// least `min_size` bytes. The bool is true when the backend buffer was replaced;
    /// the caller must then broadcast the rebind to every cached SRB.
    pub fn get_or_create(
        &self,
        stage: ShaderStage,
        group: ShaderParameterGroup,
        min_size: u64,
    ) -> KilnResult<(Arc<ConstantBuffer>, bool)> {
        let mut defaults = self.defaults.lock().unwrap();
        if let Some(existing) = defaults.get(&(stage, group)) {
            if existing.size() >= min_size {
                return Ok((existing.clone(), false));
            }
        }

        let replaced = defaults.contains_key(&(stage, group));
        // Uniform data is written in 16-byte units, keep the buffer a multiple of that
        let size = kiln_base::memory::round_size_up_to_alignment_u64(
            min_size.max(DEFAULT_CONSTANT_BUFFER_SIZE),
            16,
        );
        let buffer = Arc::new(ConstantBuffer::new(
            &self.device_context,
            size,
            format!("{:?}/{:?} constants", stage, group),
        )?);
        defaults.insert((stage, group), buffer.clone());
        Ok((buffer, replaced))
    }

    pub fn clear(&self) {
        self.defaults.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use kiln_api::backends::null::KilnDeviceContextNull;
    use kiln_api::KilnDeviceInfo;

    fn device() -> KilnDeviceContext {
        KilnDeviceContext::Null(KilnDeviceContextNull::new(KilnDeviceInfo::default()))
    }

    #[test]
    fn default_buffer_is_reused_until_it_must_grow() {
        let cache = ConstantBufferCache::new(&device());

        let (a, replaced) = cache
            .get_or_create(ShaderStage::Vertex, ShaderParameterGroup::Object, 64)
            .unwrap();
        assert!(!replaced);
        assert_eq!(a.size(), DEFAULT_CONSTANT_BUFFER_SIZE);

        let (b, replaced) = cache
            .get_or_create(ShaderStage::Vertex, ShaderParameterGroup::Object, 128)
            .unwrap();
        assert!(!replaced);
        assert!(Arc::ptr_eq(&a, &b));

        let (c, replaced) = cache
            .get_or_create(ShaderStage::Vertex, ShaderParameterGroup::Object, 512)
            .unwrap();
        assert!(replaced);
        assert_eq!(c.size(), 512);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn grown_size_is_rounded_to_a_16_byte_multiple() {
        let cache = ConstantBufferCache::new(&device());
        let (buffer, _) = cache
            .get_or_create(ShaderStage::Vertex, ShaderParameterGroup::Object, 520)
            .unwrap();
        assert_eq!(buffer.size(), 528);
    }

    #[test]
    fn writes_flush_to_the_backend_buffer_once() {
        let cache = ConstantBufferCache::new(&device());
        let (buffer, _) = cache
            .get_or_create(ShaderStage::Pixel, ShaderParameterGroup::Material, 16)
            .unwrap();

        buffer.write(4, &[1, 2, 3, 4]).unwrap();
        buffer.flush().unwrap();

        let contents = buffer.buffer().null_buffer().unwrap().read_contents();
        assert_eq!(&contents[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn overflowing_write_is_rejected() {
        let cache = ConstantBufferCache::new(&device());
        let (buffer, _) = cache
            .get_or_create(ShaderStage::Pixel, ShaderParameterGroup::Material, 16)
            .unwrap();

        let oversized = vec![0u8; DEFAULT_CONSTANT_BUFFER_SIZE as usize + 1];
        assert!(buffer.write(0, &oversized).is_err());
    }
}
