use crate::{ResourceCache, ResourceHash, SrbCache};
use kiln_api::{
    KilnDeviceContext, KilnGraphicsPipelineDef, KilnPipeline, KilnResult, PipelineStateDesc,
};
use std::sync::Arc;

/// A cached backend pipeline object together with the descriptor hash it was built from
pub struct PipelineState {
    hash: ResourceHash,
    pipeline: KilnPipeline,
}

impl PipelineState {
    pub fn hash(&self) -> ResourceHash {
        self.hash
    }

    pub fn pipeline(&self) -> &KilnPipeline {
        &self.pipeline
    }
}

/// Acquire-or-build cache for backend pipeline objects, keyed by descriptor hash.
/// An unchanged hash never reaches the device a second time.
pub struct PipelineStateCache {
    device_context: KilnDeviceContext,
    pipelines: ResourceCache<PipelineState>,
}

impl PipelineStateCache {
    pub fn new(device_context: &KilnDeviceContext) -> Self {
        PipelineStateCache {
            device_context: device_context.clone(),
            pipelines: ResourceCache::new("pipeline state"),
        }
    }

    /// Cache lookup only, used by the SRB cache which requires the pipeline to already
    /// exist
    pub fn get(
        &self,
        hash: ResourceHash,
    ) -> Option<Arc<PipelineState>> {
        self.pipelines.get(hash)
    }

    #[profiling::function]
    pub fn acquire(
        &self,
        desc: &PipelineStateDesc,
    ) -> KilnResult<Arc<PipelineState>> {
        let hash = ResourceHash::from_raw(desc.to_hash()?);
        self.pipelines.get_or_create(hash, || {
            let pipeline = self
                .device_context
                .create_graphics_pipeline(&KilnGraphicsPipelineDef {
                    desc,
                    hash: hash.as_u64(),
                })
                .map_err(|e| {
                    log::error!(
                        "Failed to create pipeline '{}' (hash {:x}): {:?}",
                        desc.debug_name,
                        hash.as_u64(),
                        e
                    );
                    e
                })?;

            Ok(PipelineState { hash, pipeline })
        })
    }

    /// Drops every cached pipeline. The SRB cache must be cleared first, its entries
    /// hold bindings against these pipelines.
    pub fn clear(&self) {
        self.pipelines.clear();
    }

    /// Clears the SRB cache and then this cache, in that order
    pub fn release_all(
        &self,
        srbs: &SrbCache,
    ) {
        srbs.clear();
        self.clear();
    }

    pub fn create_count(&self) -> u64 {
        self.pipelines.create_count()
    }
}
