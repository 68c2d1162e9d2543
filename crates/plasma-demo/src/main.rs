//! Plasma Demo — command line front end for exposure fusion and adjustments.
//!
//! Loads images, runs one of the core pipelines and writes PNGs. Operator
//! parameters come from an optional JSON file; `RUST_LOG` controls logging.

mod commands;
mod config;
mod error;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueHint};
use tracing::error;

use crate::commands::Adjustments;
use crate::config::DemoConfig;
use crate::error::DemoResult;

#[derive(Parser)]
#[command(author, version, about = "Exposure fusion and photo adjustments")]
struct Cli {
    /// JSON file with operator parameters. Missing fields keep their defaults.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Downscale inputs so the longer edge fits. 0 keeps full size.
    /// Falls back to PLASMA_MAX_EDGE.
    #[arg(long, global = true)]
    max_edge: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fuse a bracketed exposure stack into one image
    Fuse {
        /// Exposures, any order
        #[arg(required = true, num_args = 1.., value_hint = ValueHint::FilePath)]
        inputs: Vec<PathBuf>,

        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: PathBuf,
    },

    /// Apply slider adjustments to one image
    Filter(FilterArgs),

    /// Edge-preserving smoothing with the configured bilateral grid
    Bilateral {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,

        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: PathBuf,
    },

    /// Write the Laplacian pyramid of an image, one PNG per level
    Pyramid {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output: PathBuf,

        /// Number of levels. Defaults to the depth fusion would use.
        #[arg(long)]
        levels: Option<usize>,

        /// Multiplier for detail bands
        #[arg(long, default_value_t = 4.0)]
        gain: f32,
    },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: PathBuf,

    #[arg(long, allow_hyphen_values = true)]
    exposure: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    contrast: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    saturation: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    temperature: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    tint: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    highlights: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    shadows: Option<f32>,

    /// Share of the tonal range highlights and shadows act on, in [0, 1]
    #[arg(long, default_value_t = 1.0)]
    tonal_range: f32,

    #[arg(long, allow_hyphen_values = true)]
    clarity: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    texture: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    sharpen: Option<f32>,

    /// Tone curve outputs at x = -1, -1/3, 1/3, 1
    #[arg(long, num_args = 4, allow_hyphen_values = true)]
    curve: Option<Vec<f32>>,

    /// 3D LUT in .cube format, applied last
    #[arg(long, value_hint = ValueHint::FilePath)]
    lut: Option<PathBuf>,

    /// 1D LUT stored as an image strip
    #[arg(long, value_hint = ValueHint::FilePath)]
    lut_strip: Option<PathBuf>,
}

impl FilterArgs {
    fn adjustments(&self) -> Adjustments {
        Adjustments {
            exposure: self.exposure,
            contrast: self.contrast,
            saturation: self.saturation,
            temperature: self.temperature,
            tint: self.tint,
            highlights: self.highlights,
            shadows: self.shadows,
            tonal_range: self.tonal_range,
            clarity: self.clarity,
            texture: self.texture,
            sharpen: self.sharpen,
            curve: self
                .curve
                .as_deref()
                .and_then(|c| <[f32; 4]>::try_from(c).ok()),
            lut_cube: self.lut.clone(),
            lut_strip: self.lut_strip.clone(),
        }
    }
}

fn run(cli: Cli) -> DemoResult<()> {
    let config = DemoConfig::load(cli.config.as_deref(), cli.max_edge)?;
    match cli.command {
        Command::Fuse { inputs, output } => commands::fuse(&inputs, &output, &config),
        Command::Filter(args) => {
            commands::filter(&args.input, &args.output, &args.adjustments(), &config)
        }
        Command::Bilateral { input, output } => commands::bilateral(&input, &output, &config),
        Command::Pyramid {
            input,
            output,
            levels,
            gain,
        } => commands::pyramid(&input, &output, levels, gain, &config),
    }
}

fn main() -> ExitCode {
    logging::init_tracing();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
