// argus_calib/src/main.rs

use anyhow::{Context, Result};
use argus_calib::{cli::Cli, config, report};
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    info!("Loading camera from {:?}", cli.config);
    let camera = config::load(&cli.config)
        .with_context(|| format!("Failed to load camera file {:?}", cli.config))?;
    let settings = cli.resolve(&camera.fit);

    let outcome = report::run(&camera, &settings)?;
    println!("{}", outcome.to_toml()?);
    Ok(())
}
