//! Application entry point for the circle-growth control surface.
//!
//! This binary parses the command line, installs logging, loads the panel
//! settings and delegates everything interactive to [`ControlSurface`].

mod form;
mod settings;
mod surface;

use std::path::PathBuf;

use clap::Parser;
use surface::ControlSurface;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "circles-view")]
#[command(about = "Control surface for the circle-growth simulation")]
struct Cli {
    /// TOML file with the initial form values and export directory
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory exported CSV files are written to
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

/// Starts the native eframe application.
///
/// ### Returns
/// - `Ok(())` if the application runs to completion without errors.
/// - `Err` if eframe fails to create the native window or event loop.
fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circles_view=info,circles_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut panel = match settings::load(cli.settings.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to load settings: {e:#}");
            std::process::exit(1);
        }
    };
    if let Some(dir) = cli.export_dir {
        panel.export_dir = dir;
    }
    info!("exports go to {}", panel.export_dir.display());

    eframe::run_native(
        "Circles",
        eframe::NativeOptions::default(),
        Box::new(|_cc| Ok(Box::new(ControlSurface::new(panel)))),
    )
}
