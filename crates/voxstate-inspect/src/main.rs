//! `voxstate-inspect`: builds a block registry, fills a region with random
//! states and reports how the palette adapted.

mod inspect;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use voxstate_config::{CliArgs, Config};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args
        .config
        .clone()
        .or_else(Config::default_config_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    voxstate_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match inspect::run(&config, args.seed, args.fill, args.output.as_deref()) {
        Ok(report) => {
            info!(
                "Done: {} blocks / {} states (global width {}), region holds {} blocks \
                 at {} bits on the {} palette, {} bytes serialized",
                report.blocks,
                report.states,
                report.global_bits,
                report.block_count,
                report.bits_per_block,
                if report.global_palette { "global" } else { "linear" },
                report.serialized_bytes
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Inspection failed: {e}");
            ExitCode::FAILURE
        }
    }
}
