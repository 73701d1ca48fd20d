//! Command-line argument parsing for the voxstate tools.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// voxstate command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(
    name = "voxstate-inspect",
    about = "Build a block registry and inspect a paletted region"
)]
pub struct CliArgs {
    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// RON block catalog to register.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Fixed registry-wide bits per block.
    #[arg(long)]
    pub global_bits: Option<u8>,

    /// Bits per block a new region starts at.
    #[arg(long)]
    pub initial_bits: Option<u8>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write the serialized region to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Seed for the random fill.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Number of random block writes.
    #[arg(long, default_value_t = 4096)]
    pub fill: usize,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref catalog) = args.catalog {
            self.registry.catalog = Some(catalog.clone());
        }
        if let Some(bits) = args.global_bits {
            self.registry.global_bits = Some(bits);
        }
        if let Some(bits) = args.initial_bits {
            self.storage.initial_bits_per_block = bits;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            catalog: Some(PathBuf::from("blocks.ron")),
            global_bits: Some(15),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.registry.catalog, Some(PathBuf::from("blocks.ron")));
        assert_eq!(config.registry.global_bits, Some(15));
        // Non-overridden fields retain defaults
        assert_eq!(config.storage.initial_bits_per_block, 4);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "voxstate-inspect",
            "--initial-bits",
            "6",
            "--log-level",
            "debug",
            "--seed",
            "7",
            "--fill",
            "100",
            "--output",
            "region.bin",
        ]);
        assert_eq!(args.initial_bits, Some(6));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.seed, 7);
        assert_eq!(args.fill, 100);
        assert_eq!(args.output, Some(PathBuf::from("region.bin")));

        let defaults = CliArgs::parse_from(["voxstate-inspect"]);
        assert_eq!(defaults.seed, 0);
        assert_eq!(defaults.fill, 4096);
    }
}
