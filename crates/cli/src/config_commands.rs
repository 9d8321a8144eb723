use std::path::Path;

use {
    anyhow::Result,
    realay_config::{RealayConfig, Severity, ValidationResult},
};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Validate the active configuration and print diagnostics.
pub fn doctor(config: &RealayConfig, explicit: Option<&Path>, verbose: bool) -> Result<()> {
    let mut result = realay_config::validate(config);
    result.config_path = explicit
        .map(Path::to_path_buf)
        .or_else(realay_config::find_config_file);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let shown = print_diagnostics(&result, verbose);

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn print_diagnostics(result: &ValidationResult, verbose: bool) -> usize {
    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };
        eprintln!(
            "  {BOLD}{color}{}{RESET} {}: {}",
            d.severity, d.path, d.message
        );
        shown += 1;
    }
    shown
}
