/// FNV-1a accumulator for simulation state hashes.
///
/// Floats are hashed by bit pattern, so two states hash equal only if every
/// field is bit-identical.
#[derive(Debug, Clone)]
pub struct StateHasher {
    h: u64,
}

impl Default for StateHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHasher {
    pub fn new() -> Self {
        Self {
            h: 0xcbf2_9ce4_8422_2325, // FNV offset basis
        }
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.h ^= b as u64;
            self.h = self.h.wrapping_mul(0x0100_0000_01b3);
        }
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.bytes(&v.to_bits().to_le_bytes())
    }

    pub fn f32s(&mut self, vs: &[f32]) -> &mut Self {
        for &v in vs {
            self.f32(v);
        }
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.bytes(&[v as u8])
    }

    pub fn finish(&self) -> u64 {
        self.h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_is_offset_basis() {
        assert_eq!(StateHasher::new().finish(), 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn order_matters() {
        let a = StateHasher::new().f32(1.0).f32(2.0).finish();
        let b = StateHasher::new().f32(2.0).f32(1.0).finish();
        assert_ne!(a, b);
    }

    #[test]
    fn same_fields_same_hash() {
        let a = StateHasher::new().u32(7).bool(true).f32s(&[0.5, 0.25]).finish();
        let b = StateHasher::new().u32(7).bool(true).f32s(&[0.5, 0.25]).finish();
        assert_eq!(a, b);
    }
}
