//! Registry construction, random region fill, and region export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use thiserror::Error;
use voxstate_blocks::{
    BlockCatalog, BlockRegistry, BlockStorage, CatalogError, GlobalBits, PaletteSnapshot,
    REGION_EDGE, StorageError,
};
use voxstate_config::Config;

/// Catalog registered when the config names none.
pub const DEMO_CATALOG: &str = r#"(
    blocks: [
        (name: "core:stone"),
        (name: "core:dirt"),
        (
            name: "core:grass",
            properties: [(name: "snowy", kind: Boolean)],
            defaults: {"snowy": "false"},
        ),
        (
            name: "core:log",
            properties: [(name: "axis", kind: Enumeration(["x", "y", "z"]))],
            defaults: {"axis": "y"},
        ),
        (
            name: "core:wool",
            properties: [(name: "color", kind: Integer(min: 0, max: 15))],
        ),
        (
            name: "core:furnace",
            properties: [
                (name: "facing", kind: Enumeration(["north", "east", "south", "west"])),
                (name: "lit", kind: Boolean),
            ],
            defaults: {"facing": "north"},
        ),
        (
            name: "core:wheat",
            properties: [(name: "age", kind: Integer(min: 0, max: 7))],
        ),
    ],
)"#;

/// Share of random writes that clear a cell instead of placing a block.
const AIR_CHANCE: f64 = 0.1;

/// Errors that end an inspection run.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The catalog could not be loaded or registered.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// A block write failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Writing the output files failed.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
    /// The palette sidecar could not be serialized.
    #[error("failed to serialize palette: {0}")]
    Ron(#[from] ron::Error),
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectReport {
    /// Registered blocks.
    pub blocks: usize,
    /// Registered states.
    pub states: u32,
    /// Registry-wide bits per block.
    pub global_bits: u8,
    /// Final bits per block of the region.
    pub bits_per_block: u8,
    /// Whether the region ended on the global palette.
    pub global_palette: bool,
    /// Non-air cells.
    pub block_count: u16,
    /// Size of the serialized region.
    pub serialized_bytes: usize,
}

/// Builds the registry from the configured catalog, or [`DEMO_CATALOG`].
pub fn build_registry(config: &Config) -> Result<Arc<BlockRegistry>, InspectError> {
    let catalog = match &config.registry.catalog {
        Some(path) => BlockCatalog::load(path)?,
        None => BlockCatalog::from_ron_str(DEMO_CATALOG)?,
    };
    let global_bits = match config.registry.global_bits {
        Some(bits) => GlobalBits::Fixed(bits),
        None => GlobalBits::Computed,
    };
    let mut builder = BlockRegistry::builder().with_global_bits(global_bits);
    catalog.register_into(&mut builder)?;
    Ok(Arc::new(builder.build()))
}

/// Performs `writes` random block writes with a seeded RNG.
pub fn fill_region(
    registry: &Arc<BlockRegistry>,
    initial_bits: u8,
    seed: u64,
    writes: usize,
) -> Result<BlockStorage, StorageError> {
    let mut storage = BlockStorage::with_bits_per_block(Arc::clone(registry), initial_bits);
    let states = registry.states();
    if states.is_empty() {
        return Ok(storage);
    }
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let edge = REGION_EDGE as i32;
    for _ in 0..writes {
        let (x, y, z) = (
            rng.gen_range(0..edge),
            rng.gen_range(0..edge),
            rng.gen_range(0..edge),
        );
        let state = if rng.gen_bool(AIR_CHANCE) {
            None
        } else {
            Some(&states[rng.gen_range(0..states.len())])
        };
        storage.set_block(x, y, z, state)?;
    }
    Ok(storage)
}

/// Path of the RON palette written beside the serialized region.
pub fn palette_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".palette.ron");
    PathBuf::from(name)
}

/// Writes the serialized region to `output` and its palette to [`palette_path`].
pub fn write_region(storage: &BlockStorage, output: &Path) -> Result<(), InspectError> {
    let mut writer = BufWriter::new(File::create(output)?);
    storage.serialize(&mut writer)?;
    writer.flush()?;

    let palette = ron::ser::to_string_pretty(
        &storage.palette_snapshot(),
        ron::ser::PrettyConfig::new().depth_limit(2),
    )?;
    std::fs::write(palette_path(output), palette)?;
    tracing::info!(
        "Wrote {} bytes to {}",
        storage.serialized_len(),
        output.display()
    );
    Ok(())
}

/// Runs a full inspection: registry, random fill, report, optional export.
pub fn run(
    config: &Config,
    seed: u64,
    writes: usize,
    output: Option<&Path>,
) -> Result<InspectReport, InspectError> {
    let registry = build_registry(config)?;
    tracing::info!(
        "Registry: {} blocks, {} states, {} bits per block",
        registry.block_count(),
        registry.state_count(),
        registry.bits_per_block()
    );

    let storage = fill_region(
        &registry,
        config.storage.initial_bits_per_block,
        seed,
        writes,
    )?;
    let palette = match storage.palette_snapshot() {
        PaletteSnapshot::Linear { states, .. } => format!("linear, {} entries", states.len()),
        PaletteSnapshot::Global { .. } => "global".to_string(),
    };
    tracing::info!(
        "Region: {} blocks, {} bits per block ({} palette)",
        storage.block_count(),
        storage.bits_per_block(),
        palette
    );

    if let Some(output) = output {
        write_region(&storage, output)?;
    }

    Ok(InspectReport {
        blocks: registry.block_count(),
        states: registry.state_count(),
        global_bits: registry.bits_per_block(),
        bits_per_block: storage.bits_per_block(),
        global_palette: storage.palette().is_global(),
        block_count: storage.block_count(),
        serialized_bytes: storage.serialized_len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog_registers() {
        let registry = build_registry(&Config::default()).unwrap();
        assert_eq!(registry.block_count(), 7);
        // stone, dirt, grass(2), log(3), wool(16), furnace(8), wheat(8)
        assert_eq!(registry.state_count(), 39);
        assert_eq!(registry.bits_per_block(), 6);
    }

    #[test]
    fn test_fixed_global_bits_from_config() {
        let mut config = Config::default();
        config.registry.global_bits = Some(12);
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.bits_per_block(), 12);
    }

    #[test]
    fn test_missing_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.registry.catalog = Some(dir.path().join("nope.ron"));
        assert!(matches!(
            build_registry(&config),
            Err(InspectError::Catalog(CatalogError::Io(_)))
        ));
    }

    #[test]
    fn test_fill_is_deterministic() {
        let registry = build_registry(&Config::default()).unwrap();
        let a = fill_region(&registry, 4, 9, 2_000).unwrap();
        let b = fill_region(&registry, 4, 9, 2_000).unwrap();
        assert_eq!(a.cells(), b.cells());
        assert_eq!(a.palette_snapshot(), b.palette_snapshot());
        assert!(a.block_count() > 0);
    }

    #[test]
    fn test_run_writes_readable_region() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("region.bin");
        let config = Config::default();
        let report = run(&config, 3, 4_096, Some(output.as_path())).unwrap();
        assert_eq!(report.blocks, 7);
        assert!(!report.global_palette);

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(bytes.len(), report.serialized_bytes);
        let palette: PaletteSnapshot =
            ron::from_str(&std::fs::read_to_string(palette_path(&output)).unwrap()).unwrap();

        let registry = build_registry(&config).unwrap();
        let restored =
            BlockStorage::deserialize(registry, &palette, &mut bytes.as_slice()).unwrap();
        assert_eq!(restored.block_count(), report.block_count);
        assert_eq!(restored.bits_per_block(), report.bits_per_block);
    }

    #[test]
    fn test_palette_path_appends_suffix() {
        assert_eq!(
            palette_path(Path::new("out/region.bin")),
            PathBuf::from("out/region.bin.palette.ron")
        );
    }
}
