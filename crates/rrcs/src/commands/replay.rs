//! Transcript replay.

use std::io;

use serde::Serialize;

use rrcs_core::{ActionInvocation, ControllerConfig, TranscriptEntry};

use crate::cli::{GlobalOpts, ReplayArgs};
use crate::error::CliError;
use crate::output;

use super::oneshot;

#[derive(Debug, Serialize)]
struct ReplaySummary {
    accepted: usize,
    total: usize,
}

/// One entry per non-blank line.
fn parse_transcript(text: &str) -> Result<Vec<TranscriptEntry>, CliError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| CliError::Validation {
                field: format!("transcript line {}", n + 1),
                reason: e.to_string(),
            })
        })
        .collect()
}

pub async fn handle(
    config: ControllerConfig,
    args: ReplayArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let text = if args.file.as_os_str() == "-" {
        io::read_to_string(io::stdin())?
    } else {
        std::fs::read_to_string(&args.file)?
    };
    let entries = parse_transcript(&text)?;
    let total = entries.len();

    let accepted = oneshot(config, "Replay", |c| async move {
        let mut accepted = 0;
        for entry in entries {
            let description = entry.description.clone();
            if c.replay(&ActionInvocation::from(entry)).await {
                accepted += 1;
            } else {
                tracing::warn!(%description, "replayed action not accepted");
            }
        }
        Some(accepted)
    })
    .await?;

    let summary = ReplaySummary { accepted, total };
    let out = output::render_single(
        &global.output,
        &summary,
        |s| format!("replayed {}/{} actions", s.accepted, s.total),
        |s| format!("{}\t{}", s.accepted, s.total),
    );
    output::print_output(&out, global.quiet);

    if accepted < total {
        return Err(CliError::rejected(format!(
            "{} of {total} replayed actions",
            total - accepted
        )));
    }
    Ok(())
}
