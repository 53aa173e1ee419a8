//! Command-line interface for agriscan
//!
//! Headless damage analysis: calibrates a photo, runs a scripted
//! refinement session with the given HSV range and commits the result.

use agriscan::refinement::{NullDisplay, ScriptedActions, ScriptedParameters};
use agriscan::{
    load_and_calibrate, FileResultSink, OperatorAction, RawParameters, RefinementLoop, ScanConfig,
    ScanError,
};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "agriscan")]
#[command(about = "Estimate damaged crop area from a field photo", long_about = None)]
struct Args {
    /// Photo containing the crop and the white reference marker
    image: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory receiving the annotated frame and its JSON sidecar
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Hue range, 0-180
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values_t = [0, 180])]
    hue: Vec<i32>,

    /// Saturation range, 0-255
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values_t = [0, 255])]
    saturation: Vec<i32>,

    /// Value range, 0-255
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values_t = [0, 255])]
    value: Vec<i32>,

    /// Denoise strength
    #[arg(short, long, default_value_t = 0)]
    blur: i32,

    /// Print the result without writing files
    #[arg(long)]
    dry_run: bool,

    /// Log every refinement stage
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn parameters(&self) -> RawParameters {
        RawParameters {
            hue_min: self.hue[0],
            hue_max: self.hue[1],
            saturation_min: self.saturation[0],
            saturation_max: self.saturation[1],
            value_min: self.value[0],
            value_max: self.value[1],
            blur: self.blur,
        }
    }
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(error) = run(&args) {
        eprintln!("Analysis failed: {}", error);
        eprintln!("{}", error.user_message());
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), ScanError> {
    let config = match &args.config {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };

    let (image, calibration) = load_and_calibrate(&args.image, &config)?;
    eprintln!(
        "Marker: {} pixels = {} m^2",
        calibration.reference_pixel_count(),
        calibration.reference_area()
    );

    let parameters = ScriptedParameters::constant(args.parameters());
    let actions = ScriptedActions::new([OperatorAction::CommitAndExit]);

    if args.dry_run {
        let mut session = RefinementLoop::from_config(
            &config,
            image,
            calibration,
            parameters,
            actions,
            agriscan::refinement::MemorySink::new(),
            NullDisplay,
        )?;
        session.run()?;
        for result in session.sink().results() {
            print_result(result)?;
        }
    } else {
        let directory = args
            .output
            .clone()
            .unwrap_or_else(|| config.output.results_dir.clone());
        let mut session = RefinementLoop::from_config(
            &config,
            image,
            calibration,
            parameters,
            actions,
            FileResultSink::new(directory),
            NullDisplay,
        )?;
        let report = session.run()?;
        if report.commits == 0 {
            return Err(ScanError::PersistenceFailure {
                message: "result was not saved".to_string(),
                source: None,
            });
        }
        for path in session.sink().written() {
            eprintln!("Saved {}", path.display());
            let sidecar = path.with_extension("json");
            let json = std::fs::read_to_string(&sidecar).map_err(|e| {
                ScanError::persistence(format!("Failed to read {}", sidecar.display()), e)
            })?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn print_result(result: &agriscan::DamageResult) -> Result<(), ScanError> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| ScanError::persistence("Failed to serialize result", e))?;
    println!("{}", json);
    Ok(())
}
