use airsent::{commands, error_display, AppConfig, ConfigManager, APP_NAME};
use airsent_cli::{Args, Command};
use clap::{CommandFactory, Parser};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so that stdout carries only command output.
/// RUST_LOG takes precedence over `--debug`.
fn init_tracing(debug: bool) {
    let default = if debug { "airsent=debug" } else { "airsent=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let config_manager = ConfigManager::new(APP_NAME)?;
        match config_manager.write_default_config(args.force) {
            Ok(path) => {
                println!("Wrote default configuration to {}", path.display());
                return Ok(Some(()));
            }
            Err(e) => {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn run(command: Command) -> Result<()> {
    let config = AppConfig::load(APP_NAME)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Clean(args) => {
            commands::run_clean(&args, &config, &mut out)?;
        }
        Command::Query(args) => {
            commands::run_query(&args, &config, &mut out)?;
        }
        Command::Info(args) => commands::run_info(&args, &config, &mut out)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    if let Err(e) = run(command) {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {}", error_display::user_message_from_report(&e));
        std::process::exit(1);
    }
    Ok(())
}
