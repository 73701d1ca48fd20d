//! Palette-compressed block storage for one 16×16×16 region.
//!
//! A [`BlockStorage`] keeps a [`BlockPalette`] and a [`BitPackedArray`] of
//! 4096 codes. It starts on a small linear palette and widens on demand: when a
//! write meets a saturated palette the storage grows by one bit, moving to the
//! registry's global palette once the width passes [`MAX_LINEAR_BITS`]. Every
//! widening re-encodes all cells, decoding through the old palette and encoding
//! through the new one. Widths never shrink.
//!
//! Coordinates are region-local and wrap (`x & 15`), so no write can land
//! outside the region.

use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::bit_packed::{BitPackedArray, BitPackedError};
use crate::block::{BlockState, BlockStateId};
use crate::palette::{AIR_CODE, BlockPalette, LinearPalette, MAX_LINEAR_BITS};
use crate::registry::{BlockRegistry, MIN_BITS_PER_BLOCK};

/// Side length of a region in blocks.
pub const REGION_EDGE: usize = 16;

/// Number of cells in a region (16³).
pub const REGION_VOLUME: usize = REGION_EDGE * REGION_EDGE * REGION_EDGE;

/// Errors returned by storage writes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No palette, not even the global one, can encode the state. The state
    /// was not produced by this storage's registry.
    #[error("block state {state} ({id}) cannot be encoded at {bits} bits per block")]
    PaletteInconsistency {
        /// Display form of the rejected state.
        state: String,
        /// Its ID.
        id: BlockStateId,
        /// Palette width at the time of the failure.
        bits: u8,
    },
    /// A stored code does not decode through the active palette.
    #[error("cell {index} holds code {code} unknown to the palette")]
    CorruptCell {
        /// Linear cell index.
        index: usize,
        /// The undecodable code.
        code: u32,
    },
    /// A code did not fit the packed array.
    #[error(transparent)]
    BitPacked(#[from] BitPackedError),
}

impl StorageError {
    /// Returns `true` for errors that mean the storage and its registry are
    /// mismatched. Such writes must not be retried.
    pub fn is_fatal(&self) -> bool {
        match self {
            StorageError::PaletteInconsistency { .. } => true,
            StorageError::CorruptCell { .. } => true,
            StorageError::BitPacked(_) => true,
        }
    }
}

/// Converts region-local coordinates to a cell index (`y` major, then `z`, then `x`).
pub fn cell_index(x: i32, y: i32, z: i32) -> usize {
    ((y & 15) << 8 | (z & 15) << 4 | (x & 15)) as usize
}

/// Block storage for one region.
#[derive(Clone, Debug)]
pub struct BlockStorage {
    registry: Arc<BlockRegistry>,
    palette: BlockPalette,
    cells: BitPackedArray,
    /// Number of non-air cells; reset by every write.
    block_count: OnceLock<u16>,
}

impl BlockStorage {
    /// Creates an empty (all air) storage on a linear palette of
    /// [`MIN_BITS_PER_BLOCK`] bits.
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self::with_bits_per_block(registry, MIN_BITS_PER_BLOCK)
    }

    /// Creates an empty storage at the requested width.
    ///
    /// The width is clamped to `MIN_BITS_PER_BLOCK..=registry.bits_per_block()`;
    /// widths above [`MAX_LINEAR_BITS`] start on the global palette.
    pub fn with_bits_per_block(registry: Arc<BlockRegistry>, bits_per_block: u8) -> Self {
        let bits = bits_per_block.clamp(MIN_BITS_PER_BLOCK, registry.bits_per_block());
        let palette = if bits <= MAX_LINEAR_BITS {
            BlockPalette::Linear(LinearPalette::new(bits))
        } else {
            BlockPalette::Global(registry.global_palette())
        };
        Self::from_raw_parts(registry, palette, BitPackedArray::new(bits, REGION_VOLUME))
    }

    /// Assembles a storage from parts that are already consistent.
    pub(crate) fn from_raw_parts(
        registry: Arc<BlockRegistry>,
        palette: BlockPalette,
        cells: BitPackedArray,
    ) -> Self {
        debug_assert_eq!(palette.bits_per_block(), cells.bits());
        debug_assert_eq!(cells.len(), REGION_VOLUME);
        Self {
            registry,
            palette,
            cells,
            block_count: OnceLock::new(),
        }
    }

    /// Returns `true` if the cell holds a block (any non-air code).
    pub fn has_block(&self, x: i32, y: i32, z: i32) -> bool {
        self.cells.get(cell_index(x, y, z)) != AIR_CODE
    }

    /// Returns the block state at `(x, y, z)`, or `None` for air.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<&BlockState> {
        self.block_at(cell_index(x, y, z))
    }

    /// Returns the block state in the cell at `index`, or `None` for air.
    pub fn block_at(&self, index: usize) -> Option<&BlockState> {
        let code = self.cells.get(index);
        if code == AIR_CODE {
            return None;
        }
        let id = self.palette.state_for(code)?;
        self.registry.by_id(id).ok()
    }

    /// Writes a block state (or air, for `None`) at `(x, y, z)`.
    ///
    /// Widens the palette when the state has no code yet and the palette is
    /// full.
    ///
    /// # Errors
    ///
    /// [`StorageError::PaletteInconsistency`] if the state does not belong to
    /// this storage's registry. The cell is left unchanged.
    pub fn set_block(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        state: Option<&BlockState>,
    ) -> Result<(), StorageError> {
        let code = match state {
            None => AIR_CODE,
            Some(state) => self.code_for(state)?,
        };
        self.block_count = OnceLock::new();
        self.cells.set(cell_index(x, y, z), code)?;
        Ok(())
    }

    /// Resolves the code for `state`, widening the palette once if needed.
    fn code_for(&mut self, state: &BlockState) -> Result<u32, StorageError> {
        if !self.registry.contains(state) {
            return Err(self.inconsistency(state));
        }
        if let Some(code) = self.palette.code_for(state.id()) {
            return Ok(code);
        }
        self.resize(self.palette.bits_per_block() + 1)?;
        match self.palette.code_for(state.id()) {
            Some(code) => Ok(code),
            None => Err(self.inconsistency(state)),
        }
    }

    fn inconsistency(&self, state: &BlockState) -> StorageError {
        let bits = self.palette.bits_per_block();
        tracing::error!(
            "Block state {} ({}) has no palette code at {} bits per block",
            state,
            state.id(),
            bits
        );
        StorageError::PaletteInconsistency {
            state: state.to_string(),
            id: state.id(),
            bits,
        }
    }

    /// Widens the storage to `bits_per_block`, re-encoding every cell.
    ///
    /// The width is clamped to `MIN_BITS_PER_BLOCK..=registry.bits_per_block()`.
    /// Up to [`MAX_LINEAR_BITS`] the linear palette grows in place and keeps
    /// its codes; beyond it the storage switches to the global palette. A
    /// request that does not widen the storage is a no-op.
    ///
    /// Returns `true` if the width changed. On error nothing is modified.
    pub fn resize(&mut self, bits_per_block: u8) -> Result<bool, StorageError> {
        let bits = bits_per_block.clamp(MIN_BITS_PER_BLOCK, self.registry.bits_per_block());
        let old_bits = self.palette.bits_per_block();
        if bits <= old_bits {
            return Ok(false);
        }

        let mut palette = if bits <= MAX_LINEAR_BITS {
            match &self.palette {
                BlockPalette::Linear(current) => {
                    let mut grown = current.clone();
                    grown.grow(bits);
                    BlockPalette::Linear(grown)
                }
                BlockPalette::Global(_) => BlockPalette::Linear(LinearPalette::new(bits)),
            }
        } else {
            BlockPalette::Global(self.registry.global_palette())
        };

        let mut cells = BitPackedArray::new(palette.bits_per_block(), REGION_VOLUME);
        for (index, code) in self.cells.iter().enumerate() {
            if code == AIR_CODE {
                continue;
            }
            let id = self
                .palette
                .state_for(code)
                .ok_or(StorageError::CorruptCell { index, code })?;
            let new_code = palette
                .code_for(id)
                .ok_or_else(|| StorageError::PaletteInconsistency {
                    state: id.to_string(),
                    id,
                    bits: palette.bits_per_block(),
                })?;
            cells.set(index, new_code)?;
        }

        tracing::debug!(
            "Resized block storage from {} to {} bits per block ({} palette)",
            old_bits,
            palette.bits_per_block(),
            if palette.is_global() { "global" } else { "linear" }
        );
        self.palette = palette;
        self.cells = cells;
        Ok(true)
    }

    /// Sets every cell to `state` (or air), keeping the current palette width.
    pub fn fill(&mut self, state: Option<&BlockState>) -> Result<(), StorageError> {
        let code = match state {
            None => AIR_CODE,
            Some(state) => self.code_for(state)?,
        };
        let mut cells = BitPackedArray::new(self.cells.bits(), REGION_VOLUME);
        if code != AIR_CODE {
            for index in 0..REGION_VOLUME {
                cells.set(index, code)?;
            }
        }
        self.cells = cells;
        self.block_count = OnceLock::new();
        Ok(())
    }

    /// Number of non-air cells, recomputed lazily after writes.
    pub fn block_count(&self) -> u16 {
        *self
            .block_count
            .get_or_init(|| self.cells.iter().filter(|&code| code != AIR_CODE).count() as u16)
    }

    /// Returns `true` if every cell is air.
    pub fn is_empty(&self) -> bool {
        self.block_count() == 0
    }

    /// Current width of the stored codes.
    pub fn bits_per_block(&self) -> u8 {
        self.palette.bits_per_block()
    }

    /// The active palette.
    pub fn palette(&self) -> &BlockPalette {
        &self.palette
    }

    /// The packed cell codes.
    pub fn cells(&self) -> &BitPackedArray {
        &self.cells
    }

    /// The registry this storage encodes against.
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
