//! Block palettes: indirection between small storage codes and block states.
//!
//! Code 0 is the air sentinel in every palette and never maps to a state.
//!
//! - [`LinearPalette`] is region-local. Codes are handed out in first-insertion
//!   order, so a palette of width `b` holds at most `2^b - 1` states. Growing
//!   its width in place keeps every existing code.
//! - [`GlobalPalette`] covers the whole registry: the code of state `n` is
//!   `n + 1`, and its width is the registry-wide width.

use rustc_hash::FxHashMap;

use crate::block::BlockStateId;

/// Storage code meaning "no block".
pub const AIR_CODE: u32 = 0;

/// Widest width at which a storage keeps a [`LinearPalette`].
pub const MAX_LINEAR_BITS: u8 = 8;

// ---------------------------------------------------------------------------
// Linear
// ---------------------------------------------------------------------------

/// Insertion-ordered, region-local palette.
#[derive(Clone, Debug)]
pub struct LinearPalette {
    bits_per_block: u8,
    /// `states[i]` is the state stored under code `i + 1`.
    states: Vec<BlockStateId>,
    codes: FxHashMap<BlockStateId, u32>,
}

impl LinearPalette {
    /// Creates an empty palette of the given width.
    pub fn new(bits_per_block: u8) -> Self {
        debug_assert!(
            (1..=MAX_LINEAR_BITS).contains(&bits_per_block),
            "linear palette width {bits_per_block} out of range"
        );
        Self {
            bits_per_block,
            states: Vec::new(),
            codes: FxHashMap::default(),
        }
    }

    /// Rebuilds a palette from its states in code order.
    ///
    /// Returns `None` if the list has duplicates or does not fit the width.
    pub fn from_states(bits_per_block: u8, states: Vec<BlockStateId>) -> Option<Self> {
        let mut palette = Self::new(bits_per_block);
        if states.len() > palette.capacity() {
            return None;
        }
        for id in states {
            if palette.codes.contains_key(&id) {
                return None;
            }
            palette.code_or_insert(id)?;
        }
        Some(palette)
    }

    /// Width of the codes this palette hands out.
    pub fn bits_per_block(&self) -> u8 {
        self.bits_per_block
    }

    /// Maximum number of distinct states (`2^bits - 1`).
    pub fn capacity(&self) -> usize {
        (1usize << self.bits_per_block) - 1
    }

    /// Number of states currently assigned a code.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if no state has been assigned a code yet.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns `true` if no further state can be inserted at this width.
    pub fn is_full(&self) -> bool {
        self.states.len() >= self.capacity()
    }

    /// Returns the code of `id` without inserting it.
    pub fn code_of(&self, id: BlockStateId) -> Option<u32> {
        self.codes.get(&id).copied()
    }

    /// Returns the code of `id`, assigning the next free code if there is room.
    pub fn code_or_insert(&mut self, id: BlockStateId) -> Option<u32> {
        if let Some(code) = self.code_of(id) {
            return Some(code);
        }
        if self.is_full() {
            return None;
        }
        self.states.push(id);
        let code = self.states.len() as u32;
        self.codes.insert(id, code);
        Some(code)
    }

    /// Returns the state stored under `code`.
    pub fn state_at(&self, code: u32) -> Option<BlockStateId> {
        let index = (code as usize).checked_sub(1)?;
        self.states.get(index).copied()
    }

    /// Widens the palette in place. Existing codes keep their meaning.
    pub fn grow(&mut self, bits_per_block: u8) {
        debug_assert!(
            bits_per_block >= self.bits_per_block && bits_per_block <= MAX_LINEAR_BITS,
            "cannot grow linear palette from {} to {bits_per_block} bits",
            self.bits_per_block
        );
        self.bits_per_block = bits_per_block;
    }

    /// States in code order (code 1 first).
    pub fn states(&self) -> &[BlockStateId] {
        &self.states
    }
}

// ---------------------------------------------------------------------------
// Global
// ---------------------------------------------------------------------------

/// Registry-wide palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalPalette {
    bits_per_block: u8,
    state_count: u32,
}

impl GlobalPalette {
    /// Creates the palette for a registry with `state_count` states.
    pub fn new(bits_per_block: u8, state_count: u32) -> Self {
        Self {
            bits_per_block,
            state_count,
        }
    }

    /// Registry-wide width.
    pub fn bits_per_block(&self) -> u8 {
        self.bits_per_block
    }

    /// Returns the code of `id`, or `None` if the registry has no such state
    /// or its code does not fit the width.
    pub fn code_of(&self, id: BlockStateId) -> Option<u32> {
        if id.0 >= self.state_count {
            return None;
        }
        let code = id.0 + 1;
        (u64::from(code) < (1u64 << self.bits_per_block)).then_some(code)
    }

    /// Returns the state stored under `code`.
    pub fn state_at(&self, code: u32) -> Option<BlockStateId> {
        let id = code.checked_sub(1)?;
        (id < self.state_count).then_some(BlockStateId(id))
    }
}

// ---------------------------------------------------------------------------
// BlockPalette
// ---------------------------------------------------------------------------

/// The palette a storage is currently encoding through.
#[derive(Clone, Debug)]
pub enum BlockPalette {
    /// Region-local palette.
    Linear(LinearPalette),
    /// Registry-wide palette.
    Global(GlobalPalette),
}

impl BlockPalette {
    /// Width of the codes this palette produces.
    pub fn bits_per_block(&self) -> u8 {
        match self {
            BlockPalette::Linear(palette) => palette.bits_per_block(),
            BlockPalette::Global(palette) => palette.bits_per_block(),
        }
    }

    /// Returns the code for `id`, inserting it into a linear palette with room.
    ///
    /// `None` means the palette is saturated (linear) or does not know the
    /// state (global).
    pub fn code_for(&mut self, id: BlockStateId) -> Option<u32> {
        match self {
            BlockPalette::Linear(palette) => palette.code_or_insert(id),
            BlockPalette::Global(palette) => palette.code_of(id),
        }
    }

    /// Returns the code for `id` without modifying the palette.
    pub fn lookup(&self, id: BlockStateId) -> Option<u32> {
        match self {
            BlockPalette::Linear(palette) => palette.code_of(id),
            BlockPalette::Global(palette) => palette.code_of(id),
        }
    }

    /// Decodes a code. [`AIR_CODE`] and unassigned codes yield `None`.
    pub fn state_for(&self, code: u32) -> Option<BlockStateId> {
        match self {
            BlockPalette::Linear(palette) => palette.state_at(code),
            BlockPalette::Global(palette) => palette.state_at(code),
        }
    }

    /// Returns `true` for the region-local variant.
    pub fn is_linear(&self) -> bool {
        matches!(self, BlockPalette::Linear(_))
    }

    /// Returns `true` for the registry-wide variant.
    pub fn is_global(&self) -> bool {
        matches!(self, BlockPalette::Global(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
