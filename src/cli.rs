use std::path::PathBuf;

use clap::Parser;
use log::info;

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct SweepParams {
    /// Sweep configuration file (TOML); built-in defaults when omitted
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Command-template catalog for the target hardware (TOML)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Interface mode: local, pointing_generator or message_forwarding
    #[arg(short = 'm', long)]
    pub mode: Option<String>,

    /// Serial port of the array link
    #[arg(short = 'p', long)]
    pub port: Option<String>,

    /// Directory receiving measurement artifacts
    #[arg(short = 'o', long)]
    pub save_path: Option<PathBuf>,

    /// Seed for randomized angle selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log commands instead of opening the serial port
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Skip the array power cycle before the first frequency
    #[arg(long, default_value_t = false)]
    pub skip_power_cycle: bool,

    /// Capture S-parameters with every measurement
    #[arg(long, default_value_t = false)]
    pub s_parameters: bool,
}

impl SweepParams {
    pub fn pretty_print(&self) {
        info!("Run options:");
        if let Some(config) = &self.config {
            info!("Configuration: {}", config.display());
        }
        match &self.catalog {
            Some(catalog) => info!("Command catalog: {}", catalog.display()),
            None => info!("Command catalog: built-in placeholders"),
        }
        match self.seed {
            Some(seed) => info!("Random seed: {}", seed),
            None => info!("Random seed: none"),
        }
        info!(
            "Dry run: {}, power cycle: {}, S-parameters: {}",
            self.dry_run, !self.skip_power_cycle, self.s_parameters
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let params = SweepParams::parse_from([
            "chamber_sweep",
            "--config",
            "run.toml",
            "-m",
            "pointing_generator",
            "--seed",
            "42",
            "--dry-run",
        ]);
        assert_eq!(params.config, Some(PathBuf::from("run.toml")));
        assert_eq!(params.mode.as_deref(), Some("pointing_generator"));
        assert_eq!(params.seed, Some(42));
        assert!(params.dry_run);
        assert!(!params.skip_power_cycle);
    }
}
