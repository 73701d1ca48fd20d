//! Block registry with mixed-radix state IDs, and paletted 16×16×16 block storage.

pub mod bit_packed;
pub mod block;
pub mod catalog;
pub mod identifier;
pub mod palette;
pub mod property;
pub mod registry;
pub mod storage;
pub mod storage_serial;

pub use bit_packed::{BitPackedArray, BitPackedError};
pub use block::{BlockDefinition, BlockState, BlockStateId};
pub use catalog::{BlockCatalog, CatalogBlock, CatalogError};
pub use identifier::{DEFAULT_NAMESPACE, Identifier, IdentifierError};
pub use palette::{AIR_CODE, BlockPalette, GlobalPalette, LinearPalette, MAX_LINEAR_BITS};
pub use property::{BlockProperty, PropertyKind, PropertyParseError, PropertyValue};
pub use registry::{
    BlockRegistry, BlockRegistryBuilder, GlobalBits, MAX_BITS_PER_BLOCK, MIN_BITS_PER_BLOCK,
    RegistryError,
};
pub use storage::{BlockStorage, REGION_EDGE, REGION_VOLUME, StorageError, cell_index};
pub use storage_serial::{PaletteSnapshot, StorageSerError, StorageSnapshot};
