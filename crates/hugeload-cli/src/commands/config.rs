use anyhow::{Context, Result};
use clap::Args;
use hugeload_core::LoaderConfig;
use std::path::Path;

use super::OutputContext;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Only validate, do not print
    #[arg(long)]
    pub check: bool,
}

/// Print the configuration after file and environment overrides
pub fn execute(config_path: Option<&str>, args: ConfigArgs, output: &OutputContext) -> Result<()> {
    let config =
        LoaderConfig::load(config_path.map(Path::new)).context("failed to load configuration")?;

    if args.check {
        output.print_success("Configuration is valid");
        return Ok(());
    }
    if output.json {
        output.print_json(&config)
    } else {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("failed to render configuration")?
        );
        Ok(())
    }
}
