//! Long-running mode: full connect, print what the server pushes.

use std::sync::Arc;

use chrono::Local;
use owo_colors::OwoColorize;

use rrcs_core::{
    ConnectionState, Controller, ControllerConfig, FeedbackGroup, HostSink, TranscriptEntry,
};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

/// Prints host callbacks as timestamped lines. Transcript entries go to
/// stdout as JSON lines so they can be piped and replayed.
struct PrintingHost {
    color: bool,
    quiet: bool,
}

impl PrintingHost {
    fn line(&self, what: &str, detail: &str) {
        if self.quiet {
            return;
        }
        let ts = Local::now().format("%H:%M:%S%.3f");
        if self.color {
            eprintln!("{} {} {detail}", ts.dimmed(), what.cyan());
        } else {
            eprintln!("{ts} {what} {detail}");
        }
    }
}

impl HostSink for PrintingHost {
    fn check_feedbacks(&self, groups: &[FeedbackGroup]) {
        let names: Vec<String> = groups.iter().map(ToString::to_string).collect();
        self.line("changed", &names.join(", "));
    }

    fn set_connection_status(&self, state: ConnectionState, message: Option<&str>) {
        self.line("status", &format!("{state} {}", message.unwrap_or_default()));
    }

    fn record_action(&self, entry: &TranscriptEntry) {
        output::print_output(&output::render_json(entry, true), false);
    }
}

pub async fn handle(
    mut config: ControllerConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(local_host) = args.local_host {
        config.primary.local_host = local_host;
        config.notifications = true;
    }
    if let Some(port) = args.local_port {
        config.primary.local_port = port;
    }

    let host = Arc::new(PrintingHost {
        color: output::should_color(&global.color),
        quiet: global.quiet,
    });
    let controller = Controller::new(config, host);
    controller.set_recording(args.record);
    controller.connect().await?;

    tokio::signal::ctrl_c().await?;

    controller.disconnect().await;
    Ok(())
}
