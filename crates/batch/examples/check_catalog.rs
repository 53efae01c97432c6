//! Checks every catalog model and prints the report.
//!
//! ```sh
//! cargo run -p ctrlprop-batch --example check_catalog -- batch.toml
//! ```
//!
//! The config path is optional; without it the defaults are used.

use std::{env, path::PathBuf, process::ExitCode};

use ctrlprop_batch::{BatchConfig, BatchError, ModelRegistry, init_tracing, run_batch};
use ctrlprop_models::catalog;

fn main() -> ExitCode {
    init_tracing();

    match run(env::args_os().nth(1).map(PathBuf::from)) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: Option<PathBuf>) -> Result<String, BatchError> {
    let config = match config_path {
        Some(path) => BatchConfig::from_path(&path)?,
        None => BatchConfig::default(),
    };
    let registry = ModelRegistry::from_catalog(catalog())?;
    Ok(run_batch(&config, &registry)?.to_text())
}
