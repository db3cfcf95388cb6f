use kiln_api::{KilnError, KilnResult, ShaderVariationDef};
use serde::{Deserialize, Serialize};

const COOKED_SHADER_MAGIC: [u8; 4] = *b"KSHD";
const COOKED_SHADER_VERSION: u32 = 2;

/// On-disk cache of one compiled shader variation, used to skip recompilation. The
/// embedded hash is the variation's content hash for the backend it was cooked for; a
/// reader whose expected hash differs must reject the file and recompile rather than
/// trust mismatched bytecode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CookedShaderPackage {
    pub variation_def: ShaderVariationDef,
    pub shader_hash: u64,
    #[serde(with = "serde_bytes")]
    pub bytecode: Vec<u8>,
}

impl CookedShaderPackage {
    pub fn write_to_bytes(&self) -> KilnResult<Vec<u8>> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&COOKED_SHADER_MAGIC);
        bytes.extend_from_slice(&COOKED_SHADER_VERSION.to_le_bytes());
        let payload = bincode::serialize(self)
            .map_err(|e| KilnError::StringError(format!("Failed to cook shader: {}", e)))?;
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    pub fn read_from_bytes(
        data: &[u8],
        expected_hash: Option<u64>,
    ) -> KilnResult<CookedShaderPackage> {
        if data.len() < 8 || data[0..4] != COOKED_SHADER_MAGIC {
            return Err(KilnError::ShaderBytecodeMismatch(
                "Cooked shader data does not begin with the expected magic bytes".to_string(),
            ));
        }

        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version != COOKED_SHADER_VERSION {
            return Err(KilnError::ShaderBytecodeMismatch(format!(
                "Cooked shader version {} does not match expected version {}",
                version, COOKED_SHADER_VERSION
            )));
        }

        let package: CookedShaderPackage = bincode::deserialize(&data[8..]).map_err(|e| {
            KilnError::ShaderBytecodeMismatch(format!("Failed to decode cooked shader: {}", e))
        })?;

        if let Some(expected_hash) = expected_hash {
            if package.shader_hash != expected_hash {
                return Err(KilnError::ShaderBytecodeMismatch(format!(
                    "Cooked shader '{}' has hash {:x}, expected {:x}; it must be recompiled",
                    package.variation_def.name, package.shader_hash, expected_hash
                )));
            }
        }

        Ok(package)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use kiln_api::ShaderStage;

    fn package() -> CookedShaderPackage {
        CookedShaderPackage {
            variation_def: ShaderVariationDef {
                stage: ShaderStage::Pixel,
                name: "Basic".to_string(),
                source: "void main() {}".to_string(),
                defines: vec!["ALPHAMASK".to_string()],
                reflection: Default::default(),
            },
            shader_hash: 0xfeed,
            bytecode: vec![1, 2, 3, 4],
        }
    }

    #[test]
    fn round_trips_with_matching_hash() {
        let bytes = package().write_to_bytes().unwrap();
        let loaded = CookedShaderPackage::read_from_bytes(&bytes, Some(0xfeed)).unwrap();
        assert_eq!(loaded, package());
    }

    #[test]
    fn rejects_mismatched_hash() {
        let bytes = package().write_to_bytes().unwrap();
        let result = CookedShaderPackage::read_from_bytes(&bytes, Some(0xbeef));
        assert!(matches!(result, Err(KilnError::ShaderBytecodeMismatch(_))));
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut bytes = package().write_to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(CookedShaderPackage::read_from_bytes(&bytes, None).is_err());

        let mut bytes = package().write_to_bytes().unwrap();
        bytes[4] = 0xff;
        assert!(CookedShaderPackage::read_from_bytes(&bytes, None).is_err());
    }
}
