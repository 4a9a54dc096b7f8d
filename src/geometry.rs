use crate::error::SimError;

/// Width of a trace address in bits.
pub const ADDRESS_BITS: u32 = u64::BITS;

/// Shape of the simulated cache: `2^s` sets of `E` lines holding `2^b`-byte blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    set_bits: u32,
    associativity: usize,
    block_bits: u32,
}

/// An address split into the fields the cache looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub tag: u64,
    pub set_index: usize,
    pub block_offset: u64,
}

impl Geometry {
    pub fn new(set_bits: u32, associativity: usize, block_bits: u32) -> Result<Geometry, SimError> {
        if associativity == 0 {
            return Err(SimError::Config(
                "associativity (E) must be at least 1".to_string(),
            ));
        }
        if set_bits
            .checked_add(block_bits)
            .map_or(true, |bits| bits > ADDRESS_BITS)
        {
            return Err(SimError::Config(format!(
                "set index bits ({}) + block offset bits ({}) exceed the {}-bit address width",
                set_bits, block_bits, ADDRESS_BITS
            )));
        }
        let line_count = 1usize
            .checked_shl(set_bits)
            .and_then(|sets| sets.checked_mul(associativity));
        if line_count.is_none() {
            return Err(SimError::Config(format!(
                "cache with 2^{} sets of {} lines is too large",
                set_bits, associativity
            )));
        }

        Ok(Geometry {
            set_bits,
            associativity,
            block_bits,
        })
    }

    pub fn set_bits(&self) -> u32 {
        self.set_bits
    }

    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }

    /// Lines per set (E).
    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn set_count(&self) -> usize {
        1 << self.set_bits
    }

    pub fn block_size(&self) -> u128 {
        1 << self.block_bits
    }

    pub fn line_count(&self) -> usize {
        self.set_count() * self.associativity
    }

    /// Split `address` into tag, set index and block offset.
    pub fn decompose(&self, address: u64) -> Address {
        let block_offset = address & low_mask(self.block_bits);
        let set_index = shr(address, self.block_bits) & low_mask(self.set_bits);
        let tag = shr(address, self.set_bits + self.block_bits);
        Address {
            tag,
            // set_count() fits in usize, so every masked index does too
            set_index: set_index as usize,
            block_offset,
        }
    }
}

fn low_mask(bits: u32) -> u64 {
    match 1u64.checked_shl(bits) {
        Some(bit) => bit - 1,
        None => u64::MAX,
    }
}

fn shr(value: u64, bits: u32) -> u64 {
    value.checked_shr(bits).unwrap_or(0)
}
