//! `myrtille [config.json] [output.png]`
//!
//! Renders the built-in Cornell box. The optional JSON file may set any
//! subset of the render configuration; missing fields keep their defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use myr_core::presets::cornell_box;
use myr_renderer::{render, RenderConfig};

const DEFAULT_OUTPUT: &str = "render.png";

fn load_config(path: &Path) -> Result<RenderConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => load_config(Path::new(&path))?,
        None => RenderConfig::default(),
    };
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    log::info!("Starting Myrtille");

    let scene = cornell_box().context("failed to build scene")?;
    let image = render(&scene, &config)?;
    image
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    log::info!("Wrote {}", output.display());
    Ok(())
}
