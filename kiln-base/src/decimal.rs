use std::hash::Hasher;

// This is an f32 that supports Hash and Eq. Generally this is dangerous, but here we're
// not doing any sort of fp-arithmetic and not expecting NaN. Values come from fixed
// render-state configuration (depth bias, anisotropy) that must hash deterministically.
#[derive(Debug, Copy, Clone, Default)]
pub struct DecimalF32(pub f32);

impl From<DecimalF32> for f32 {
    fn from(value: DecimalF32) -> f32 {
        value.0
    }
}

impl PartialEq for DecimalF32 {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.0 == other.0
    }
}

impl Eq for DecimalF32 {}

impl std::hash::Hash for DecimalF32 {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        let bits: u32 = self.0.to_bits();
        bits.hash(state);
    }
}
