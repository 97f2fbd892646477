use std::path::Path;

use clap::Parser;
use eframe::egui;

use retropaint::app::{RetroPaintApp, SURFACE_HEIGHT, SURFACE_WIDTH};
use retropaint::cli::{self, CliArgs};
use retropaint::colors::ColorTable;
use retropaint::{log_err, log_info, logger};

/// Name ↔ RGB mapping consulted by the custom-color readout. Missing file is
/// fatal: the table is a startup dependency, not a runtime-recoverable one.
const COLOR_MAP_PATH: &str = "./assets/colormap.csv";

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if CliArgs::is_cli_mode() {
        let args = CliArgs::parse();
        std::process::exit(cli::run(args));
    }

    // -- GUI mode --------------------------------------------------------

    // Session log (overwrites the previous session's file)
    logger::init();

    let color_table = match ColorTable::load(Path::new(COLOR_MAP_PATH)) {
        Ok(table) => table,
        Err(e) => {
            log_err!("failed to open color map {}: {}", COLOR_MAP_PATH, e);
            let _ = rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title("RetroPaint")
                .set_description(&format!(
                    "Could not open the color map file:\n{}\n\n{}",
                    COLOR_MAP_PATH, e
                ))
                .show();
            std::process::exit(1);
        }
    };
    log_info!("color table loaded: {} entries", color_table.len());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([SURFACE_WIDTH as f32, SURFACE_HEIGHT as f32])
            .with_title("RetroPaint"),
        ..Default::default()
    };

    eframe::run_native(
        "RetroPaint",
        options,
        Box::new(|cc| Box::new(RetroPaintApp::new(cc, color_table))),
    )
}
