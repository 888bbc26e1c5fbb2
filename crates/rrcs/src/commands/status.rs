//! Link health: one keepalive cycle, then a table of links.

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::Tabled;

use rrcs_core::{ConnectionState, ControllerConfig, LinkStatus};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::oneshot;

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "Link")]
    id: String,
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "Healthy")]
    healthy: String,
    #[tabled(rename = "Active")]
    active: String,
}

#[derive(Debug, Serialize)]
struct Status {
    state: ConnectionState,
    links: Vec<LinkStatus>,
}

fn row(link: &LinkStatus, color: bool) -> LinkRow {
    LinkRow {
        id: link.id.to_string(),
        server: format!("{}:{}", link.host, link.port),
        healthy: output::on_off(link.healthy, color),
        active: if link.active { "*".into() } else { String::new() },
    }
}

fn state_label(state: ConnectionState, color: bool) -> String {
    if !color {
        return state.to_string();
    }
    match state {
        ConnectionState::Ok => state.green().to_string(),
        ConnectionState::Degraded => state.yellow().to_string(),
        ConnectionState::ConnectionFailure | ConnectionState::BadConfig => {
            state.red().to_string()
        }
        _ => state.to_string(),
    }
}

pub async fn handle(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let status = oneshot(config, "GetAlive", |c| async move {
        let state = c.check_links().await?;
        Some(Status {
            state,
            links: c.link_status(),
        })
    })
    .await?;

    let out = output::render_single(
        &global.output,
        &status,
        |s| {
            let rows: Vec<LinkRow> = s.links.iter().map(|l| row(l, color)).collect();
            format!(
                "{}\n{}",
                state_label(s.state, color),
                tabled::Table::new(rows).with(tabled::settings::Style::rounded())
            )
        },
        |s| s.state.to_string(),
    );
    output::print_output(&out, global.quiet);

    if status.state == ConnectionState::ConnectionFailure {
        return Err(CliError::ConnectionFailed {
            url: status
                .links
                .iter()
                .map(|l| format!("{}:{}", l.host, l.port))
                .collect::<Vec<_>>()
                .join(", "),
            source: "no link answered GetAlive".into(),
        });
    }
    Ok(())
}
