mod commands;

use clap::{Parser, ValueEnum};
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE};
use std::path::PathBuf;
use std::process::ExitCode;
use wpsite_core::{Settings, SiteController, ToggleAction};
use wpsite_runtime::{Platform, SystemElevator, SystemRunner};
use wpsite_schema::{SiteName, ToolConfig};

const SKIP_PREREQS_ENV: &str = "WPSITE_SKIP_PREREQS";

#[derive(Debug, Parser)]
#[command(
    name = "wpsite",
    version,
    about = "Provision and manage local WordPress sites behind NGINX",
    after_help = "With no ACTION the site is created (or re-provisioned) and started."
)]
struct Cli {
    /// Site name; also the hostname and directory name.
    site_name: Option<String>,

    /// What to do with an existing site.
    #[arg(value_enum)]
    action: Option<Action>,

    /// Directory that holds one subdirectory per site (default: current directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Tool configuration file (default: $WPSITE_CONFIG or ~/.config/wpsite/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Action {
    /// Start the site's containers.
    Enable,
    /// Stop the site's containers.
    Disable,
    /// Tear down containers and remove the site, its NGINX link and hosts entry.
    Delete,
    /// Show the site's state and host integration.
    Status,
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("WPSITE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let Some(raw_name) = cli.site_name.as_deref() else {
        eprintln!("error: please provide a site name");
        eprintln!("usage: wpsite [OPTIONS] <SITE_NAME> [enable|disable|delete|status]");
        return ExitCode::from(EXIT_FAILURE);
    };
    let name = match SiteName::parse(raw_name) {
        Ok(name) => name,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let config = match ToolConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let root = match cli.root {
        Some(root) => root,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("error: cannot determine current directory: {e}");
                return ExitCode::from(EXIT_FAILURE);
            }
        },
    };

    let platform = Platform::detect();
    tracing::debug!("detected platform: {platform}");
    let system = SystemRunner::new();
    let spinner_slot = commands::SpinnerSlot::default();
    let runner = commands::PausingRunner::new(&system, &spinner_slot);
    let elevator = SystemElevator::new(&runner, platform.clone(), config.elevation);
    let settings = Settings {
        root,
        config,
        skip_prereqs: std::env::var(SKIP_PREREQS_ENV).as_deref() == Ok("1"),
    };
    let controller = SiteController::new(settings, platform, &runner, &elevator);
    let json_output = cli.json;

    let result = match cli.action {
        None => commands::create::run(&controller, &name, json_output, &spinner_slot),
        Some(Action::Enable) => {
            commands::toggle::run(&controller, &name, ToggleAction::Enable, json_output)
        }
        Some(Action::Disable) => {
            commands::toggle::run(&controller, &name, ToggleAction::Disable, json_output)
        }
        Some(Action::Delete) => commands::delete::run(&controller, &name, json_output),
        Some(Action::Status) => commands::status::run(&controller, &name, json_output),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(failure) => {
            eprintln!("error: {}", failure.message);
            ExitCode::from(failure.code)
        }
    }
}
