//! Bit-packed array for storing fixed-width integer values in a compact `Vec<u64>`.
//!
//! Each element occupies exactly `bits` bits (1 to 32). Elements are packed
//! back to back, so an element may straddle two adjacent words: its low bits
//! sit at the top of one word and its high bits at the bottom of the next.
//!
//! Width and length are fixed at construction. Changing the width means
//! allocating a new array and copying.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Widest supported element.
pub const MAX_BITS: u8 = 32;

/// Errors returned by [`BitPackedArray`] writes and reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitPackedError {
    /// The value needs more than `bits` bits. The array is left unchanged.
    #[error("value {value} does not fit in {bits} bits")]
    ValueTooWide {
        /// The rejected value.
        value: u32,
        /// Element width of the array.
        bits: u8,
    },
    /// The index is past the end of the array.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The rejected index.
        index: usize,
        /// Array length.
        len: usize,
    },
    /// Raw words do not match the width and length.
    #[error("expected {expected} words, got {actual}")]
    WordCountMismatch {
        /// Words required by `bits * len`.
        expected: usize,
        /// Words supplied.
        actual: usize,
    },
    /// The element width is outside `1..=32`.
    #[error("bits must be in 1..={MAX_BITS}, got {0}")]
    InvalidWidth(u8),
}

/// A compact array where each element is stored using a fixed number of bits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBitPackedArray")]
pub struct BitPackedArray {
    /// Raw storage. Elements are packed into 64-bit words.
    data: Vec<u64>,
    /// Bits per element (1 to 32).
    bits: u8,
    /// Total number of logical elements.
    len: usize,
}

/// Unvalidated serde form; checked by `TryFrom` before use.
#[derive(Deserialize)]
struct RawBitPackedArray {
    data: Vec<u64>,
    bits: u8,
    len: usize,
}

impl TryFrom<RawBitPackedArray> for BitPackedArray {
    type Error = BitPackedError;

    fn try_from(raw: RawBitPackedArray) -> Result<Self, Self::Error> {
        if !(1..=MAX_BITS).contains(&raw.bits) {
            return Err(BitPackedError::InvalidWidth(raw.bits));
        }
        Self::from_raw(raw.bits, raw.len, raw.data)
    }
}

impl BitPackedArray {
    /// Creates a new array with `len` elements, all initialized to zero.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is not in `1..=32`.
    pub fn new(bits: u8, len: usize) -> Self {
        assert!(
            (1..=MAX_BITS).contains(&bits),
            "bits must be in 1..={MAX_BITS}, got {bits}"
        );
        Self {
            data: vec![0u64; Self::word_count_for(bits, len)],
            bits,
            len,
        }
    }

    /// Number of words backing `len` elements of `bits` bits: `ceil(len * bits / 64)`.
    pub fn word_count_for(bits: u8, len: usize) -> usize {
        (len as u64 * u64::from(bits)).div_ceil(64) as usize
    }

    /// Largest value an element can hold.
    pub fn max_value(&self) -> u32 {
        ((1u64 << self.bits) - 1) as u32
    }

    fn mask(&self) -> u64 {
        (1u64 << self.bits) - 1
    }

    /// Returns the value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn get(&self, index: usize) -> u32 {
        assert!(index < self.len, "index {index} out of bounds for length {}", self.len);
        let bit_index = index as u64 * u64::from(self.bits);
        let word = (bit_index / 64) as usize;
        let offset = (bit_index % 64) as u32;
        let mut value = self.data[word] >> offset;
        if offset + u32::from(self.bits) > 64 {
            value |= self.data[word + 1] << (64 - offset);
        }
        (value & self.mask()) as u32
    }

    /// Sets the value at the given index.
    ///
    /// # Errors
    ///
    /// [`BitPackedError::IndexOutOfBounds`] if `index >= len`, and
    /// [`BitPackedError::ValueTooWide`] if `value > max_value()`. Values are
    /// never truncated.
    pub fn set(&mut self, index: usize, value: u32) -> Result<(), BitPackedError> {
        if index >= self.len {
            return Err(BitPackedError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        if value > self.max_value() {
            return Err(BitPackedError::ValueTooWide {
                value,
                bits: self.bits,
            });
        }
        let mask = self.mask();
        let value = u64::from(value);
        let bit_index = index as u64 * u64::from(self.bits);
        let word = (bit_index / 64) as usize;
        let offset = (bit_index % 64) as u32;
        self.data[word] = (self.data[word] & !(mask << offset)) | (value << offset);
        if offset + u32::from(self.bits) > 64 {
            // High part spills into the next word.
            let low_bits = 64 - offset;
            let high_mask = mask >> low_bits;
            let next = word + 1;
            self.data[next] = (self.data[next] & !high_mask) | (value >> low_bits);
        }
        Ok(())
    }

    /// Iterates every element in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Returns the number of bits per element.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Returns the number of logical elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the size of the backing storage in bytes (not counting struct overhead).
    pub fn storage_bytes(&self) -> usize {
        self.data.len() * 8
    }

    /// Returns a reference to the raw `u64` storage words.
    pub fn raw_data(&self) -> &[u64] {
        &self.data
    }

    /// Rebuilds an array from raw words.
    ///
    /// # Errors
    ///
    /// [`BitPackedError::WordCountMismatch`] if `data` does not have exactly
    /// [`word_count_for(bits, len)`](Self::word_count_for) words.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is not in `1..=32`.
    pub fn from_raw(bits: u8, len: usize, data: Vec<u64>) -> Result<Self, BitPackedError> {
        assert!(
            (1..=MAX_BITS).contains(&bits),
            "bits must be in 1..={MAX_BITS}, got {bits}"
        );
        let expected = Self::word_count_for(bits, len);
        if data.len() != expected {
            return Err(BitPackedError::WordCountMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, bits, len })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
