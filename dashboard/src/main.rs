//! Kautoploy Dashboard - Entry Point
//!
//! Terminal client of the Kautoploy deployment platform: lists projects,
//! triggers deployments and follows build logs while builds run.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use kautodash::app::options::AppOptions;
use kautodash::app::run::{run, Command};
use kautodash::errors::DashboardError;
use kautodash::logs::{init_logging, LogLevel, LogOptions};
use kautodash::storage::layout::StorageLayout;
use kautodash::storage::session::{clear_session, load_session, save_session, AuthSession};
use kautodash::storage::settings::Settings;
use kautodash::utils::version_info;

use tracing::{error, info, warn};

const USAGE: &str = "\
Usage: kautodash <command> [options]

Commands:
  --projects                          List projects
  --deploy --project=ID               Trigger a deployment
  --logs --project=ID                 Follow the logs of the latest run
  --history --project=ID [--build=ID] List builds or follow one build
  --login --token=TOKEN [--email=E]   Store an access token
  --logout                            Forget the stored token
  --version                           Print version info

Options:
  --base-url=URL                      Backend API base URL
  --log-level=LEVEL                   trace, debug, info, warn or error";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize version info: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    let layout = StorageLayout::default();
    let session_file = layout.session_file();

    if cli_args.contains_key("logout") {
        return match clear_session(&session_file).await {
            Ok(()) => {
                println!("Logged out");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to clear session: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if cli_args.contains_key("login") {
        let session = AuthSession {
            token: cli_args.get("token").cloned().unwrap_or_default(),
            email: cli_args.get("email").cloned(),
        };
        return match save_session(&session_file, &session).await {
            Ok(()) => {
                println!("Session stored in {}", session_file.path().display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to store session: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let command = match parse_command(&cli_args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    // Retrieve the settings file
    let mut settings = match Settings::load(&layout.settings_file()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(base_url) = cli_args.get("base-url") {
        settings.backend.base_url = base_url.clone();
    }
    if let Some(level) = cli_args.get("log-level") {
        match level.parse::<LogLevel>() {
            Ok(level) => settings.log_level = level,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
    }

    // Initialize logging; the guard flushes the file writer on exit
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_to_file.then(|| layout.logs_dir()),
        json_format: settings.log_json,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let token = match load_session(&session_file).await {
        Ok(Some(session)) => Some(session.secret()),
        Ok(None) => {
            warn!("Not logged in, requests are sent without a token");
            None
        }
        Err(e) => {
            warn!("Unable to read session file: {}", e);
            None
        }
    };

    let options = AppOptions::from_settings(&settings, token);
    info!("Running kautodash {} with options: {:?}", version.version, options);
    match run(command, options, await_shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to run the dashboard: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_command(cli_args: &HashMap<String, String>) -> Result<Command, DashboardError> {
    let id_arg = |name: &str| -> Result<i64, DashboardError> {
        let raw = cli_args
            .get(name)
            .ok_or_else(|| DashboardError::ConfigError(format!("--{name}=ID is required")))?;
        raw.parse()
            .map_err(|_| DashboardError::ConfigError(format!("Invalid --{name} value: {raw}")))
    };

    if cli_args.contains_key("projects") {
        Ok(Command::Projects)
    } else if cli_args.contains_key("deploy") {
        Ok(Command::Deploy {
            project_id: id_arg("project")?,
        })
    } else if cli_args.contains_key("logs") {
        Ok(Command::Logs {
            project_id: id_arg("project")?,
        })
    } else if cli_args.contains_key("history") {
        let build_id = if cli_args.contains_key("build") {
            Some(id_arg("build")?)
        } else {
            None
        };
        Ok(Command::History {
            project_id: id_arg("project")?,
            build_id,
        })
    } else {
        Err(DashboardError::ConfigError("No command given".to_string()))
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return std::future::pending().await;
        }
        info!("Ctrl+C received, shutting down...");
    }
}
