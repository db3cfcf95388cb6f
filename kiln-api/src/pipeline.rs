use crate::backends::null::KilnPipelineNull;

/// A backend pipeline state object. Immutable after creation; shared by every draw
/// command whose descriptor hashes to the same value.
#[derive(Clone)]
pub enum KilnPipeline {
    Null(KilnPipelineNull),
}

impl KilnPipeline {
    /// The descriptor hash this pipeline was created under
    pub fn hash(&self) -> u64 {
        match self {
            KilnPipeline::Null(inner) => inner.hash(),
        }
    }

    pub fn debug_name(&self) -> &str {
        match self {
            KilnPipeline::Null(inner) => inner.debug_name(),
        }
    }

    pub fn null_pipeline(&self) -> Option<&KilnPipelineNull> {
        match self {
            KilnPipeline::Null(inner) => Some(inner),
        }
    }
}

impl std::fmt::Debug for KilnPipeline {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        f.debug_struct("KilnPipeline")
            .field("debug_name", &self.debug_name())
            .field("hash", &self.hash())
            .finish()
    }
}
