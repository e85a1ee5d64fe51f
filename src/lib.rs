pub mod angles;
pub mod attenuation;
pub mod catalog;
mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod measurement;
pub mod naming;
pub mod patch_grid;
pub mod plan;
pub mod sweep;
pub mod transport;

pub use cli::SweepParams;

use crate::catalog::CommandCatalog;
use crate::config::SweepConfiguration;
use crate::error::ConfigError;

/// Builds the run configuration and catalog from files and command-line overrides.
pub fn load_run_inputs(
    params: &SweepParams,
) -> Result<(SweepConfiguration, CommandCatalog), ConfigError> {
    let mut config = match &params.config {
        Some(path) => SweepConfiguration::load(path)?,
        None => SweepConfiguration::default(),
    };
    if let Some(mode) = &params.mode {
        config.interface_mode = mode.parse()?;
    }
    if let Some(port) = &params.port {
        config.link.port = port.clone();
    }
    if let Some(save_path) = &params.save_path {
        config.save_path = save_path.clone();
    }
    config.validate()?;

    let catalog = match params.catalog.as_deref() {
        Some(path) => CommandCatalog::load(path)?,
        None => CommandCatalog::default(),
    };
    Ok((config, catalog))
}

