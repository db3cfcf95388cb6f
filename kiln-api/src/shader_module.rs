use crate::backends::null::KilnShaderModuleNull;
use crate::{ShaderReflection, ShaderStage, ShaderVariationHash};

/// One compiled stage, backend-specific
#[derive(Clone)]
pub enum KilnShaderModule {
    Null(KilnShaderModuleNull),
}

impl KilnShaderModule {
    pub fn null_shader_module(&self) -> Option<&KilnShaderModuleNull> {
        match self {
            KilnShaderModule::Null(inner) => Some(inner),
        }
    }
}

/// A compiled shader stage plus everything the caches need to key on it: the content
/// hash derived from source, defines, and backend, and the reflection table.
///
/// Two variations compiled from identical inputs carry identical content hashes, so
/// pipeline hashes stay stable across shader reloads.
pub struct ShaderVariation {
    stage: ShaderStage,
    name: String,
    defines: Vec<String>,
    content_hash: ShaderVariationHash,
    reflection: ShaderReflection,
    module: KilnShaderModule,
}

impl ShaderVariation {
    pub fn new(
        stage: ShaderStage,
        name: String,
        defines: Vec<String>,
        content_hash: ShaderVariationHash,
        reflection: ShaderReflection,
        module: KilnShaderModule,
    ) -> Self {
        ShaderVariation {
            stage,
            name,
            defines,
            content_hash,
            reflection,
            module,
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    pub fn content_hash(&self) -> ShaderVariationHash {
        self.content_hash
    }

    pub fn reflection(&self) -> &ShaderReflection {
        &self.reflection
    }

    pub fn module(&self) -> &KilnShaderModule {
        &self.module
    }
}

impl std::fmt::Debug for ShaderVariation {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        f.debug_struct("ShaderVariation")
            .field("stage", &self.stage)
            .field("name", &self.name)
            .field("defines", &self.defines)
            .field("content_hash", &self.content_hash)
            .finish()
    }
}
