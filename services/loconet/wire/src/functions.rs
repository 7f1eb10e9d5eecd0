//! Locomotive function state (F0 to F68).

use serde::{Deserialize, Serialize};

/// Highest function number a group can hold.
pub const MAX_FUNCTION: usize = 68;

/// Bitset of locomotive functions indexed by function number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionGroup {
    bits: u128,
}

impl FunctionGroup {
    /// Create a group with every function off
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group from a raw bitset, bit `n` being function `n`
    pub fn from_bits(bits: u128) -> Self {
        Self {
            bits: bits & Self::valid_mask(),
        }
    }

    /// Raw bitset
    pub fn bits(&self) -> u128 {
        self.bits
    }

    /// State of function `index`; out of range functions read as off
    pub fn get(&self, index: usize) -> bool {
        index <= MAX_FUNCTION && self.bits & (1u128 << index) != 0
    }

    /// Set function `index`; out of range functions are ignored
    pub fn set(&mut self, index: usize, on: bool) {
        if index > MAX_FUNCTION {
            return;
        }
        if on {
            self.bits |= 1u128 << index;
        } else {
            self.bits &= !(1u128 << index);
        }
    }

    /// Builder form of [`FunctionGroup::set`]
    pub fn with(mut self, index: usize, on: bool) -> Self {
        self.set(index, on);
        self
    }

    /// Pack `count` consecutive functions starting at `first` into a byte,
    /// lowest function in bit 0.
    pub fn pack(&self, first: usize, count: usize) -> u8 {
        (0..count.min(8))
            .filter(|offset| self.get(first + offset))
            .fold(0u8, |byte, offset| byte | (1 << offset))
    }

    /// Numbers of the functions that are on
    pub fn active(&self) -> Vec<usize> {
        (0..=MAX_FUNCTION).filter(|index| self.get(*index)).collect()
    }

    fn valid_mask() -> u128 {
        (1u128 << (MAX_FUNCTION + 1)) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let mut functions = FunctionGroup::new();
        assert!(!functions.get(0));
        functions.set(0, true);
        functions.set(68, true);
        functions.set(69, true);
        assert!(functions.get(0));
        assert!(functions.get(68));
        assert!(!functions.get(69));
        assert_eq!(functions.active(), vec![0, 68]);
        functions.set(0, false);
        assert_eq!(functions.active(), vec![68]);
    }

    #[test]
    fn test_pack() {
        let functions = FunctionGroup::new().with(13, true).with(15, true).with(20, true);
        assert_eq!(functions.pack(13, 8), 0b1000_0101);
        assert_eq!(functions.pack(21, 8), 0);
    }

    #[test]
    fn test_from_bits_masks_high_bits() {
        let functions = FunctionGroup::from_bits(u128::MAX);
        assert_eq!(functions.active().len(), MAX_FUNCTION + 1);
    }
}
