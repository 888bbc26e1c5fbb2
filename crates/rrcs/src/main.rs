mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Crates whose events `-v` turns up. Everything else stays at `warn`
/// until `-vvv`.
const OWN_TARGETS: [&str; 3] = ["rrcs", "rrcs_core", "rrcs_api"];

/// Overrides the `-v` defaults when set. Falls back to `RUST_LOG`.
const LOG_ENV: &str = "RRCS_LOG";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Filter directives for `-v` count: own crates step up one level per
/// flag, dependencies only open up at trace.
fn default_directives(verbosity: u8) -> String {
    let (own, deps) = match verbosity {
        0 => ("warn", "warn"),
        1 => ("info", "warn"),
        2 => ("debug", "warn"),
        _ => ("trace", "debug"),
    };
    std::iter::once(deps.to_owned())
        .chain(OWN_TARGETS.iter().map(|target| format!("{target}={own}")))
        .collect::<Vec<_>>()
        .join(",")
}

fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "rrcs", &mut std::io::stdout());
            Ok(())
        }
        cmd => {
            let controller_config = config::build_controller_config(&cli.global)?;
            tracing::debug!(command = ?cmd, "dispatching to server");
            commands::dispatch(cmd, controller_config, &cli.global).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_default_is_warn_everywhere() {
        assert_eq!(
            default_directives(0),
            "warn,rrcs=warn,rrcs_core=warn,rrcs_api=warn"
        );
    }

    #[test]
    fn verbosity_raises_own_crates_before_dependencies() {
        assert_eq!(
            default_directives(2),
            "warn,rrcs=debug,rrcs_core=debug,rrcs_api=debug"
        );
        assert!(default_directives(5).starts_with("debug,rrcs=trace"));
        for level in 0..4 {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }
}
