//! `strata` binary: build scene blocks from a layer manifest.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use strata_app::{AppDirs, Manifest, run_export};
use strata_config::{CliArgs, Config};
use strata_scene::BuildContext;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match AppDirs::resolve(args.config.as_deref()).and_then(|d| d.create().map(|()| d)) {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    strata_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = config.validate() {
        tracing::error!("invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    let Some(manifest_path) = args.manifest.as_deref() else {
        tracing::error!("no --manifest given, nothing to build");
        return ExitCode::FAILURE;
    };
    let manifest = match Manifest::load(manifest_path) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(path = %manifest_path.display(), "cannot read manifest: {e}");
            return ExitCode::FAILURE;
        }
    };
    let base_dir = manifest_path.parent().unwrap_or(Path::new("."));

    let cancel = Arc::new(AtomicBool::new(false));
    let ctx = BuildContext::from_config(&config)
        .with_cancel_flag(Arc::clone(&cancel))
        .with_progress(|current, total| tracing::debug!(current, total, "progress"));

    match run_export(&config, &manifest, base_dir, &ctx) {
        Ok(summary) if summary.warnings > 0 || summary.skipped_layers > 0 => {
            tracing::warn!(
                warnings = summary.warnings,
                skipped_layers = summary.skipped_layers,
                "export finished with warnings"
            );
            ExitCode::SUCCESS
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("export failed: {e}");
            ExitCode::FAILURE
        }
    }
}
