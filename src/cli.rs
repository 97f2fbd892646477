// ============================================================================
// RetroPaint CLI — headless pixel-data export via command-line arguments
// ============================================================================
//
// Usage examples:
//   retropaint --input pixel_data.csv --output drawing.png
//   retropaint -i pixel_data.csv                    (writes pixel_data.png)
//   retropaint -i old_save.csv -o out.bmp --width 1920 --height 1080
//
// No GUI is opened in CLI mode. Rendering runs synchronously on the current
// thread: records are replayed onto a fresh canvas and the drawable region
// is encoded with the `image` crate (format inferred from the extension).

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::canvas::{Canvas, TOOLBAR_HEIGHT};
use crate::io::{apply_records, load_pixel_data};

/// RetroPaint headless exporter.
///
/// Render a saved pixel-data CSV to an image file without opening the GUI.
#[derive(Parser, Debug)]
#[command(
    name = "retropaint",
    about = "RetroPaint headless pixel-data exporter",
    long_about = "Render a pixel-data CSV (one `x,y,r,g,b` record per line, as written\n\
                  by the Save button) to a PNG or BMP image without opening a window.\n\n\
                  Example:\n  \
                  retropaint --input pixel_data.csv --output drawing.png"
)]
pub struct CliArgs {
    /// Pixel-data CSV file to render.
    #[arg(short, long, value_name = "PIXELS.csv")]
    pub input: PathBuf,

    /// Output image path. Format inferred from the extension (png, bmp).
    /// Defaults to the input path with a `.png` extension.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Canvas width the file was saved from.
    #[arg(long, default_value_t = 1280, value_name = "PIXELS")]
    pub width: u32,

    /// Canvas height the file was saved from.
    #[arg(long, default_value_t = 720, value_name = "PIXELS")]
    pub height: u32,

    /// Rows reserved at the top of the canvas (the toolbar strip).
    #[arg(long, default_value_t = TOOLBAR_HEIGHT, value_name = "ROWS")]
    pub reserved_top: u32,

    /// Print record counts and timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when a CLI-mode flag is present in the real process
    /// arguments. Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

/// Run the export and return an OS exit code (`0` success, `1` failure).
pub fn run(args: CliArgs) -> i32 {
    let started = std::time::Instant::now();

    let records = match load_pixel_data(&args.input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: could not read '{}': {}", args.input.display(), e);
            return 1;
        }
    };

    let mut canvas = Canvas::new(args.width, args.height, args.reserved_top);
    let applied = apply_records(&mut canvas, &records);

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.input));

    if let Err(e) = canvas.drawable_image().save(&output) {
        eprintln!("error: could not write '{}': {}", output.display(), e);
        return 1;
    }

    if args.verbose {
        println!(
            "{} records read, {} drawn, {}x{} image written to {} in {:.2?}",
            records.len(),
            applied,
            canvas.width(),
            canvas.drawable_height(),
            output.display(),
            started.elapsed()
        );
    } else {
        println!("wrote {}", output.display());
    }
    0
}

/// Input path with its extension swapped for `.png`.
fn default_output(input: &Path) -> PathBuf {
    input.with_extension("png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_swaps_extension_for_png() {
        assert_eq!(
            default_output(Path::new("saves/pixel_data.csv")),
            PathBuf::from("saves/pixel_data.png")
        );
        assert_eq!(
            default_output(Path::new("drawing")),
            PathBuf::from("drawing.png")
        );
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = CliArgs::parse_from(["retropaint", "-i", "pixels.csv"]);
        assert_eq!(args.input, PathBuf::from("pixels.csv"));
        assert_eq!(args.width, 1280);
        assert_eq!(args.height, 720);
        assert_eq!(args.reserved_top, TOOLBAR_HEIGHT);
        assert!(args.output.is_none());
    }
}
