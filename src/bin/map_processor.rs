//! Map processor - decode a saved raw map payload and render it
//!
//! Usage:
//!   map_processor parse --map-file map_data.gz --api roborock
//!   map_processor parse --config map.toml --map-file map.b64 --api dreame
//!
//! Writes `<map-file>.png` and `<map-file>.json` next to the input.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use chitra_map::config::MapConfig;
use chitra_map::{decode_map, render_map, Result, Vendor};

/// Robot vacuum map decoder
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a raw map file and write PNG + JSON attributes
    Parse {
        /// TOML style configuration (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Raw map payload as downloaded from the cloud
        #[arg(short, long)]
        map_file: PathBuf,

        /// Map format: roborock, viomi, roidmi, dreame or valetudo
        #[arg(short, long, default_value = "roborock")]
        api: Vendor,
    },
}

fn load_config(path: Option<&Path>) -> Result<MapConfig> {
    match path {
        Some(path) => {
            log::info!("Using config: {}", path.display());
            Ok(MapConfig::load(path)?)
        }
        None => Ok(MapConfig::default()),
    }
}

fn output_path(map_file: &Path, extension: &str) -> PathBuf {
    let mut name = map_file.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn parse(config: Option<&Path>, map_file: &Path, vendor: Vendor) -> Result<()> {
    let config = load_config(config)?;
    let palette = config.palette()?;
    let render_config = config.render_config();

    let raw = std::fs::read(map_file)?;
    log::info!("Read {} bytes from {}", raw.len(), map_file.display());

    let snapshot = decode_map(vendor, &raw, &palette, &render_config);
    if snapshot.image.is_empty() {
        log::warn!(
            "No map image: {}",
            snapshot.image.message.as_deref().unwrap_or("unknown reason")
        );
    }
    let rendered = render_map(&snapshot, &palette, &render_config);

    let png_path = output_path(map_file, "png");
    rendered.save_png(&png_path)?;
    log::info!(
        "Wrote {} ({}x{})",
        png_path.display(),
        rendered.image.width(),
        rendered.image.height()
    );

    let json_path = output_path(map_file, "json");
    std::fs::write(&json_path, rendered.attributes.to_json()?)?;
    log::info!("Wrote {}", json_path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.cmd {
        Command::Parse {
            config,
            map_file,
            api,
        } => parse(config.as_deref(), &map_file, api),
    }
}
