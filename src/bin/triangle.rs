use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use simple_triangle::app::{AppConfig, BackendKind, Engine};
use simple_triangle::triangle::TriangleApp;
use simple_triangle::{build_info, health};

/// Draws a single triangle until Escape is pressed or the window closes
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration profile (overrides APP_PROFILE)
    #[arg(long)]
    profile: Option<String>,

    /// Run without a window on the headless backend
    #[arg(long)]
    headless: bool,

    /// Number of frames to run headless
    #[arg(long, requires = "headless")]
    frames: Option<u64>,

    /// Run the health checks and exit
    #[arg(long)]
    health: bool,
}

fn load_config(args: &Args) -> AppConfig {
    let loaded = match &args.profile {
        Some(profile) => AppConfig::load(profile),
        None => AppConfig::load_from_env(),
    };

    let mut config = loaded.unwrap_or_else(|e| {
        let profile = args.profile.as_deref().unwrap_or("release");
        // The subscriber is not installed yet
        eprintln!("Failed to load config profile '{profile}', using built-in defaults: {e}");
        AppConfig::builtin(profile)
    });

    if args.headless {
        config.graphics.backend = BackendKind::Headless;
    }
    if let Some(frames) = args.frames {
        config.graphics.headless_frames = frames;
    }
    config
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = load_config(&args);
    init_tracing(&config);

    info!(
        version = %build_info::version_string(),
        commit = build_info::git_sha_short(),
        built = build_info::BUILD_TIMESTAMP,
        "Simple Triangle starting"
    );

    if args.health {
        let report = health::run_all_checks();
        health::print_report(&report);
        return ExitCode::from(report.exit_code() as u8);
    }

    if config.graphics.backend == BackendKind::Headless && config.graphics.headless_frames == 0 {
        warn!("Headless run with a frame limit of 0; the application will not update");
    }

    match Engine::new(config, Box::new(TriangleApp::new())).run() {
        Ok(()) => {
            info!("Engine finished successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Engine run failed");
            eprintln!("Error: Engine did not successfully finish running.");
            ExitCode::FAILURE
        }
    }
}
