//! Wire form of a [`BlockStorage`] and the matching read-back path.
//!
//! ## Binary layout
//!
//! | Field | Encoding |
//! |-------|----------|
//! | Word count | VarInt (7-bit groups, least significant first, `0x80` = more) |
//! | Words | `count` × `u64`, big-endian |
//!
//! The stream carries no width and no palette. Whoever reads it back must know
//! the storage's palette through a side channel; [`PaletteSnapshot`] is that
//! side channel, and [`StorageSnapshot`] bundles both halves into a serde value
//! a tag-based document can embed.
//!
//! Code 0 is air in both palette modes. Linear-mode words hold palette codes
//! (`states[i]` is code `i + 1`); global-mode words hold `state_id + 1`.

use std::io::{self, Read, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bit_packed::{BitPackedArray, BitPackedError};
use crate::block::BlockStateId;
use crate::palette::{AIR_CODE, BlockPalette, LinearPalette, MAX_LINEAR_BITS};
use crate::registry::{BlockRegistry, MIN_BITS_PER_BLOCK};
use crate::storage::{BlockStorage, REGION_VOLUME};

/// Longest VarInt encoding of a `u32`.
const MAX_VARINT_LEN: usize = 5;

/// Errors that can occur while reading a storage back.
#[derive(Debug, Error)]
pub enum StorageSerError {
    /// The reader failed or ended early.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// A VarInt ran past five bytes.
    #[error("varint is longer than {MAX_VARINT_LEN} bytes")]
    VarIntTooLong,
    /// The word count does not match the palette width.
    #[error("expected {expected} words, got {actual}")]
    WordCountMismatch {
        /// Words required by the palette width.
        expected: usize,
        /// Words announced by the stream.
        actual: usize,
    },
    /// The palette width is not usable with this registry.
    #[error("invalid palette width: {0}")]
    InvalidWidth(u8),
    /// The linear palette lists duplicate states or more than fit its width.
    #[error("linear palette has duplicate entries or exceeds its capacity")]
    InvalidPalette,
    /// The palette names a state the registry does not have.
    #[error("unknown block state: {0}")]
    UnknownState(BlockStateId),
    /// A cell holds a code the palette cannot decode.
    #[error("cell {index} holds code {code} unknown to the palette")]
    InvalidCode {
        /// Linear cell index.
        index: usize,
        /// The undecodable code.
        code: u32,
    },
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Everything needed to decode the words of a serialized storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaletteSnapshot {
    /// A region-local palette; `states[i]` is stored under code `i + 1`.
    Linear {
        /// Palette width.
        bits_per_block: u8,
        /// States in code order.
        states: Vec<BlockStateId>,
    },
    /// The registry-wide palette.
    Global {
        /// Registry width at the time of writing.
        bits_per_block: u8,
    },
}

impl PaletteSnapshot {
    /// Width of the codes described by this snapshot.
    pub fn bits_per_block(&self) -> u8 {
        match self {
            PaletteSnapshot::Linear { bits_per_block, .. } => *bits_per_block,
            PaletteSnapshot::Global { bits_per_block } => *bits_per_block,
        }
    }
}

/// A storage as plain data: its palette plus its packed words.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSnapshot {
    /// Palette needed to decode `data`.
    pub palette: PaletteSnapshot,
    /// Packed cell codes.
    pub data: Vec<u64>,
}

// ---------------------------------------------------------------------------
// VarInt
// ---------------------------------------------------------------------------

/// Writes `value` as a VarInt.
pub fn write_varint<W: Write>(writer: &mut W, mut value: u32) -> io::Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut len = 0;
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf[len] = byte;
            len += 1;
            break;
        }
        buf[len] = byte | 0x80;
        len += 1;
    }
    writer.write_all(&buf[..len])
}

/// Reads a VarInt written by [`write_varint`].
pub fn read_varint<R: Read>(reader: &mut R) -> Result<u32, StorageSerError> {
    let mut value = 0u32;
    for i in 0..MAX_VARINT_LEN {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        value |= u32::from(byte[0] & 0x7F) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(StorageSerError::VarIntTooLong)
}

/// Number of bytes [`write_varint`] produces for `value`.
pub fn varint_len(value: u32) -> usize {
    let bits = (u32::BITS - value.leading_zeros()).max(1) as usize;
    bits.div_ceil(7)
}

// ---------------------------------------------------------------------------
// BlockStorage
// ---------------------------------------------------------------------------

impl BlockStorage {
    /// Writes the word count followed by every packed word.
    pub fn serialize<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        let words = self.cells().raw_data();
        write_varint(sink, words.len() as u32)?;
        for word in words {
            sink.write_all(&word.to_be_bytes())?;
        }
        Ok(())
    }

    /// Size in bytes of [`serialize`](Self::serialize)'s output.
    pub fn serialized_len(&self) -> usize {
        let words = self.cells().raw_data().len();
        varint_len(words as u32) + words * 8
    }

    /// Describes the active palette so the words can be decoded later.
    pub fn palette_snapshot(&self) -> PaletteSnapshot {
        match self.palette() {
            BlockPalette::Linear(palette) => PaletteSnapshot::Linear {
                bits_per_block: palette.bits_per_block(),
                states: palette.states().to_vec(),
            },
            BlockPalette::Global(palette) => PaletteSnapshot::Global {
                bits_per_block: palette.bits_per_block(),
            },
        }
    }

    /// Captures the palette and the packed words.
    pub fn snapshot(&self) -> StorageSnapshot {
        StorageSnapshot {
            palette: self.palette_snapshot(),
            data: self.cells().raw_data().to_vec(),
        }
    }

    /// Reads a storage written by [`serialize`](Self::serialize).
    ///
    /// # Errors
    ///
    /// Fails if the stream is short, the word count disagrees with the
    /// palette width, or the palette and cells do not decode against
    /// `registry`.
    pub fn deserialize<R: Read>(
        registry: Arc<BlockRegistry>,
        palette: &PaletteSnapshot,
        reader: &mut R,
    ) -> Result<Self, StorageSerError> {
        let bits = palette.bits_per_block();
        check_width(&registry, palette)?;
        let expected = BitPackedArray::word_count_for(bits, REGION_VOLUME);
        let count = read_varint(reader)? as usize;
        if count != expected {
            return Err(StorageSerError::WordCountMismatch {
                expected,
                actual: count,
            });
        }
        let mut words = Vec::with_capacity(count);
        let mut buf = [0u8; 8];
        for _ in 0..count {
            reader.read_exact(&mut buf)?;
            words.push(u64::from_be_bytes(buf));
        }
        rebuild(registry, palette, words)
    }

    /// Restores a storage from a [`StorageSnapshot`].
    pub fn from_snapshot(
        registry: Arc<BlockRegistry>,
        snapshot: StorageSnapshot,
    ) -> Result<Self, StorageSerError> {
        check_width(&registry, &snapshot.palette)?;
        rebuild(registry, &snapshot.palette, snapshot.data)
    }
}

fn check_width(registry: &BlockRegistry, palette: &PaletteSnapshot) -> Result<(), StorageSerError> {
    let valid = match palette {
        PaletteSnapshot::Linear { bits_per_block, .. } => {
            (MIN_BITS_PER_BLOCK..=MAX_LINEAR_BITS).contains(bits_per_block)
                && *bits_per_block <= registry.bits_per_block()
        }
        PaletteSnapshot::Global { bits_per_block } => *bits_per_block == registry.bits_per_block(),
    };
    if valid {
        Ok(())
    } else {
        Err(StorageSerError::InvalidWidth(palette.bits_per_block()))
    }
}

fn rebuild(
    registry: Arc<BlockRegistry>,
    snapshot: &PaletteSnapshot,
    words: Vec<u64>,
) -> Result<BlockStorage, StorageSerError> {
    let palette = match snapshot {
        PaletteSnapshot::Linear {
            bits_per_block,
            states,
        } => {
            if let Some(&unknown) = states.iter().find(|&&id| registry.by_id(id).is_err()) {
                return Err(StorageSerError::UnknownState(unknown));
            }
            let palette = LinearPalette::from_states(*bits_per_block, states.clone())
                .ok_or(StorageSerError::InvalidPalette)?;
            BlockPalette::Linear(palette)
        }
        PaletteSnapshot::Global { .. } => BlockPalette::Global(registry.global_palette()),
    };

    let cells = BitPackedArray::from_raw(palette.bits_per_block(), REGION_VOLUME, words)
        .map_err(|e| match e {
            BitPackedError::WordCountMismatch { expected, actual } => {
                StorageSerError::WordCountMismatch { expected, actual }
            }
            _ => StorageSerError::InvalidWidth(snapshot.bits_per_block()),
        })?;
    if let Some((index, code)) = cells
        .iter()
        .enumerate()
        .find(|&(_, code)| code != AIR_CODE && palette.state_for(code).is_none())
    {
        return Err(StorageSerError::InvalidCode { index, code });
    }

    tracing::trace!(
        "Rebuilt block storage at {} bits per block",
        palette.bits_per_block()
    );
    Ok(BlockStorage::from_raw_parts(registry, palette, cells))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::BlockProperty;

    fn registry() -> Arc<BlockRegistry> {
        let mut builder = BlockRegistry::builder();
        builder.register("core:stone".parse().unwrap(), vec![], vec![]).unwrap();
        builder
            .register(
                "core:wool".parse().unwrap(),
                vec![BlockProperty::integer("color", 0, 299)],
                vec![0.into()],
            )
            .unwrap();
        Arc::new(builder.build())
    }

    fn populated(registry: &Arc<BlockRegistry>, distinct: usize) -> BlockStorage {
        let mut storage = BlockStorage::new(Arc::clone(registry));
        for i in 0..REGION_VOLUME {
            let state = &registry.states()[i % distinct];
            let (x, y, z) = ((i % 16) as i32, (i / 256) as i32, ((i / 16) % 16) as i32);
            if i < distinct || i % 3 != 0 {
                storage.set_block(x, y, z, Some(state)).unwrap();
            }
        }
        storage
    }

    fn assert_same_blocks(a: &BlockStorage, b: &BlockStorage) {
        for index in 0..REGION_VOLUME {
            assert_eq!(a.block_at(index), b.block_at(index), "cell {index}");
        }
    }

    #[test]
    fn test_varint_encoding() {
        let cases: [(u32, &[u8]); 5] = [
            (0, &[0x00]),
            (127, &[0x7F]),
            (128, &[0x80, 0x01]),
            (300, &[0xAC, 0x02]),
            (u32::MAX, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];
        for (value, expected) in cases {
            let mut buf = Vec::new();
            write_varint(&mut buf, value).unwrap();
            assert_eq!(buf, expected, "value {value}");
            assert_eq!(varint_len(value), expected.len());
            assert_eq!(read_varint(&mut buf.as_slice()).unwrap(), value);
        }
    }

    #[test]
    fn test_varint_too_long() {
        let bytes = [0xFFu8; 6];
        assert!(matches!(
            read_varint(&mut bytes.as_slice()),
            Err(StorageSerError::VarIntTooLong)
        ));
    }

    #[test]
    fn test_serialize_layout() {
        let registry = registry();
        let mut storage = BlockStorage::new(Arc::clone(&registry));
        let stone = &registry.states()[0];
        storage.set_block(0, 0, 0, Some(stone)).unwrap();

        let mut bytes = Vec::new();
        storage.serialize(&mut bytes).unwrap();
        // 4096 cells × 4 bits = 256 words.
        assert_eq!(&bytes[..2], &[0x80, 0x02]);
        assert_eq!(bytes.len(), 2 + 256 * 8);
        assert_eq!(bytes.len(), storage.serialized_len());
        // Cell 0 holds code 1 in the low bits of the first (big-endian) word.
        assert_eq!(&bytes[2..10], &1u64.to_be_bytes());
    }

    #[test]
    fn test_global_words_hold_state_id_plus_one() {
        let registry = registry();
        let mut storage = BlockStorage::with_bits_per_block(Arc::clone(&registry), 9);
        assert!(storage.palette().is_global());
        storage.set_block(0, 0, 0, Some(&registry.states()[7])).unwrap();
        storage.set_block(1, 0, 0, Some(&registry.states()[0])).unwrap();

        let mut bytes = Vec::new();
        storage.serialize(&mut bytes).unwrap();
        // 4096 cells × 9 bits = 576 words.
        assert_eq!(&bytes[..2], &[0xC0, 0x04]);
        // Cell 0 = 7 + 1, cell 1 = 0 + 1 in the next 9-bit field.
        assert_eq!(&bytes[2..10], &(8u64 | 1 << 9).to_be_bytes());
    }

    #[test]
    fn test_roundtrip_linear_and_global() {
        let registry = registry();
        for distinct in [1usize, 15, 16, 200, 301] {
            let storage = populated(&registry, distinct);
            let palette = storage.palette_snapshot();
            let mut bytes = Vec::new();
            storage.serialize(&mut bytes).unwrap();

            let restored =
                BlockStorage::deserialize(Arc::clone(&registry), &palette, &mut bytes.as_slice())
                    .unwrap_or_else(|e| panic!("deserialize failed for {distinct} states: {e}"));
            assert_eq!(restored.bits_per_block(), storage.bits_per_block());
            assert_eq!(restored.block_count(), storage.block_count());
            assert_same_blocks(&storage, &restored);
        }
    }

    #[test]
    fn test_snapshot_embeds_in_ron_document() {
        let registry = registry();
        let storage = populated(&registry, 20);
        let snapshot = storage.snapshot();
        let text = ron::to_string(&snapshot).unwrap();
        let parsed: StorageSnapshot = ron::from_str(&text).unwrap();
        assert_eq!(parsed, snapshot);

        let restored = BlockStorage::from_snapshot(Arc::clone(&registry), parsed).unwrap();
        assert_same_blocks(&storage, &restored);
    }

    #[test]
    fn test_restored_storage_keeps_growing() {
        let registry = registry();
        let storage = populated(&registry, 15);
        let mut restored =
            BlockStorage::from_snapshot(Arc::clone(&registry), storage.snapshot()).unwrap();
        restored
            .set_block(0, 0, 0, Some(&registry.states()[100]))
            .unwrap();
        assert_eq!(restored.bits_per_block(), 5);
        assert_eq!(restored.block_at(1), storage.block_at(1));
    }

    #[test]
    fn test_word_count_mismatch() {
        let registry = registry();
        let storage = populated(&registry, 4);
        let mut bytes = Vec::new();
        storage.serialize(&mut bytes).unwrap();
        let wrong = PaletteSnapshot::Linear {
            bits_per_block: 5,
            states: Vec::new(),
        };
        let result =
            BlockStorage::deserialize(Arc::clone(&registry), &wrong, &mut bytes.as_slice());
        assert!(matches!(
            result,
            Err(StorageSerError::WordCountMismatch {
                expected: 320,
                actual: 256
            })
        ));
    }

    #[test]
    fn test_truncated_stream() {
        let registry = registry();
        let storage = populated(&registry, 4);
        let mut bytes = Vec::new();
        storage.serialize(&mut bytes).unwrap();
        bytes.truncate(100);
        let result = BlockStorage::deserialize(
            Arc::clone(&registry),
            &storage.palette_snapshot(),
            &mut bytes.as_slice(),
        );
        assert!(matches!(result, Err(StorageSerError::Io(_))));
    }

    #[test]
    fn test_invalid_palettes_rejected() {
        let registry = registry();
        let words = vec![0u64; 256];
        let unknown = StorageSnapshot {
            palette: PaletteSnapshot::Linear {
                bits_per_block: 4,
                states: vec![BlockStateId(5000)],
            },
            data: words.clone(),
        };
        assert!(matches!(
            BlockStorage::from_snapshot(Arc::clone(&registry), unknown),
            Err(StorageSerError::UnknownState(BlockStateId(5000)))
        ));

        let duplicate = StorageSnapshot {
            palette: PaletteSnapshot::Linear {
                bits_per_block: 4,
                states: vec![BlockStateId(1), BlockStateId(1)],
            },
            data: words.clone(),
        };
        assert!(matches!(
            BlockStorage::from_snapshot(Arc::clone(&registry), duplicate),
            Err(StorageSerError::InvalidPalette)
        ));

        let wrong_global = StorageSnapshot {
            palette: PaletteSnapshot::Global { bits_per_block: 14 },
            data: words,
        };
        assert!(matches!(
            BlockStorage::from_snapshot(Arc::clone(&registry), wrong_global),
            Err(StorageSerError::InvalidWidth(14))
        ));
    }

    #[test]
    fn test_undecodable_code_rejected() {
        let registry = registry();
        let mut words = vec![0u64; 256];
        // Cell 1 holds code 3, but the palette only assigns codes 1 and 2.
        words[0] = 3 << 4;
        let snapshot = StorageSnapshot {
            palette: PaletteSnapshot::Linear {
                bits_per_block: 4,
                states: vec![BlockStateId(0), BlockStateId(1)],
            },
            data: words,
        };
        assert!(matches!(
            BlockStorage::from_snapshot(Arc::clone(&registry), snapshot),
            Err(StorageSerError::InvalidCode { index: 1, code: 3 })
        ));
    }
}
