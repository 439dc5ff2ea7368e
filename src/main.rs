// Orrery 3D: a solar-system visualizer in Rust

// Module declarations
mod app;
mod assets;
mod camera;
mod config;
mod error;
mod focus;
mod labels;
mod math;
mod orbit;
mod overlay;
mod pick;
mod renderer;
mod scene;
mod view;

use std::path::PathBuf;

use clap::Parser;
use log::info;
use winit::event_loop::EventLoop;

use crate::config::OrreryConfig;
use crate::error::AppError;

#[derive(Debug, Parser)]
#[command(name = "orrery", about = "Sun, planets and a starfield with pick-to-zoom")]
struct Args {
    /// TOML file with the orbit descriptor table; built-in planets when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory that texture references are resolved against.
    #[arg(long, default_value = "textures")]
    texture_dir: PathBuf,

    /// Overrides `time_scale` from the config.
    #[arg(long)]
    time_scale: Option<f32>,

    /// Body to fly to on startup.
    #[arg(long)]
    focus: Option<String>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => OrreryConfig::load_from_path(path)?,
        None => {
            info!("no config given, using built-in planets");
            OrreryConfig::default()
        }
    };
    let config = config.with_time_scale(args.time_scale)?;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    // Create event loop
    let event_loop = EventLoop::new()?;

    let app = app::App::new(config, args.texture_dir, &event_loop).await?;
    if let Some(name) = args.focus {
        app.command_sender().focus_by_name(name);
    }

    // Run the frame loop until the window closes
    app.run(event_loop)
}
