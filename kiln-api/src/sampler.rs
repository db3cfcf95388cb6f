use crate::backends::null::KilnSamplerNull;
use crate::SamplerDesc;

/// A texture sampler, backend-specific. Cloning is cheap, all variants are internally
/// reference counted.
#[derive(Clone)]
pub enum KilnSampler {
    Null(KilnSamplerNull),
}

impl KilnSampler {
    pub fn sampler_def(&self) -> &SamplerDesc {
        match self {
            KilnSampler::Null(inner) => inner.sampler_def(),
        }
    }

    pub fn null_sampler(&self) -> Option<&KilnSamplerNull> {
        match self {
            KilnSampler::Null(inner) => Some(inner),
        }
    }
}

impl std::fmt::Debug for KilnSampler {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        f.debug_struct("KilnSampler")
            .field("sampler_def", self.sampler_def())
            .finish()
    }
}
