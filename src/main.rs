//! ic3d-synth: builds a 3D model of an SMD IC package from parameter files.
//!
//! Exit status is 0 on success, otherwise the ordinal of the failure kind
//! (see [`SynthError::exit_code`]). When `rc_file` is configured the same
//! number is written there.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use ic3d_synth::config;
use ic3d_synth::error::SynthError;
use ic3d_synth::params::{load_param_files, OutputPaths};
use ic3d_synth::pipeline;

/// Exit status for an unusable run configuration.
const CONFIG_EXIT_CODE: u8 = 2;

/// Parametric 3D model synthesizer for surface-mount IC packages.
///
/// Reads the global parameter file and the component file it names, builds
/// the package solid, and writes the native document, a STEP file and a
/// description log next to the model.
#[derive(Parser, Debug)]
#[command(name = "ic3d-synth")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Global parameter file
    #[arg(value_name = "PARAMS_FILE")]
    params_file: PathBuf,

    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises tracing: filtered events to stderr, and everything from
/// debug up to the debug file when one is open.
fn init_tracing(level: Level, debug_file: Option<File>) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let stderr = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);
    let file = debug_file.map(|f| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(f))
            .with_filter(LevelFilter::DEBUG)
    });

    tracing_subscriber::registry().with(stderr).with(file).init();
}

/// Creates the debug file next to the model. Failure only loses the file.
fn open_debug_file(paths: &OutputPaths) -> Option<File> {
    let opened = std::fs::create_dir_all(&paths.model_dir).and_then(|()| File::create(&paths.debug_file));
    match opened {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("Cannot open debug file {}: {e}", paths.debug_file.display());
            None
        }
    }
}

fn log_failure(e: &SynthError) {
    error!(error = %e, code = e.exit_code(), "Synthesis failed");
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        error!(cause = %cause, "Caused by");
        source = cause.source();
    }
}

/// Entry point for the ic3d-synth command.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nExpected config at: {}", default_path.display());
                }
            }
            return ExitCode::from(CONFIG_EXIT_CODE);
        }
    };

    let loaded = load_param_files(&args.params_file);
    let debug_file = match &loaded {
        Ok((_, paths)) if cfg.output.debug_file => open_debug_file(paths),
        _ => None,
    };
    init_tracing(get_log_level(args.verbose, args.quiet, &cfg.logging.level), debug_file);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        params = %args.params_file.display(),
        "Starting ic3d-synth"
    );

    let result = loaded
        .map_err(SynthError::from)
        .and_then(|(params, paths)| pipeline::run(&params, &paths, &cfg));
    let code = match result {
        Ok(outcome) => {
            for path in &outcome.written {
                info!(path = %path.display(), "Wrote");
            }
            0
        }
        Err(e) => {
            log_failure(&e);
            e.exit_code()
        }
    };

    if let Some(rc_file) = &cfg.rc_file {
        if let Err(e) = std::fs::write(rc_file, code.to_string()) {
            error!(path = %rc_file.display(), error = %e, "Cannot write return code file");
        }
    }
    ExitCode::from(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(get_log_level(3, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
    }
}
