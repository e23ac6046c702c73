use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use gravity_law::config::GravityLawConfig;

/// Builds the three-sphere orbit scene and exports it as a binary glTF.
#[derive(Parser, Debug)]
#[command(name = "gravity-law", version, about)]
struct Args {
    /// Output .glb path (overrides the configured one)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory holding default.toml and user.toml
    #[arg(short, long, default_value = "config")]
    config: PathBuf,

    /// Last animation frame
    #[arg(long)]
    end_frame: Option<i32>,

    /// Bake subdivision modifiers into the exported meshes
    #[arg(long)]
    apply_modifiers: bool,

    /// Write MikkTSpace tangents
    #[arg(long)]
    export_tangents: bool,
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = Args::parse();
    let mut config = GravityLawConfig::load_from(&args.config)?;

    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(end_frame) = args.end_frame {
        config.end_frame = end_frame;
    }
    config.export.apply_modifiers |= args.apply_modifiers;
    config.export.export_tangents |= args.export_tangents;

    log::debug!("{:#?}", config);

    gravity_law::gravity_law::run(&config)
}
