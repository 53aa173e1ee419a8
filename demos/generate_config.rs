//! Write the default agriscan configuration as JSON
//!
//! Prints the file when no path is given, so it can be piped or redirected.

use agriscan::{ScanConfig, ScanError};
use std::path::PathBuf;
use std::process;

fn main() {
    let target = std::env::args_os().nth(1).map(PathBuf::from);

    if let Err(error) = write_defaults(target) {
        eprintln!("Could not write configuration: {}", error);
        process::exit(2);
    }
}

fn write_defaults(target: Option<PathBuf>) -> Result<(), ScanError> {
    let config = ScanConfig::default();

    let Some(path) = target else {
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| ScanError::config("Failed to serialize configuration", e))?;
        println!("{}", json);
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ScanError::config(format!("Failed to create {}", parent.display()), e))?;
    }
    config.to_json_file(&path)?;

    let marker = &config.marker;
    eprintln!("Wrote {}", path.display());
    eprintln!(
        "  resolution {}x{}, marker {} m^2 in H[{}-{}] S[{}-{}] V[{}-{}]",
        config.working_resolution.width,
        config.working_resolution.height,
        marker.reference_area,
        marker.lower.hue,
        marker.upper.hue,
        marker.lower.saturation,
        marker.upper.saturation,
        marker.lower.value,
        marker.upper.value
    );
    eprintln!(
        "  blur up to {}, overlay alpha {:.2}, results in {}",
        config.refinement.max_denoise,
        config.overlay.alpha,
        config.output.results_dir.display()
    );
    Ok(())
}
