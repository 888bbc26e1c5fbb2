//! Crosspoint command handlers.

use serde::Serialize;
use tabled::Tabled;

use rrcs_core::{ControllerConfig, Crosspoint, XpMethod};

use crate::cli::{GlobalOpts, XpArgs, XpCommand};
use crate::error::CliError;
use crate::output;

use super::oneshot;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct XpState {
    src: String,
    dst: String,
    active: bool,
}

impl XpState {
    fn new(xp: &Crosspoint, active: bool) -> Self {
        Self {
            src: xp.src.to_string(),
            dst: xp.dst.to_string(),
            active,
        }
    }
}

#[derive(Tabled)]
struct XpRow {
    #[tabled(rename = "Source")]
    src: String,
    #[tabled(rename = "Destination")]
    dst: String,
}

fn detail(state: &XpState, color: bool) -> String {
    format!(
        "{} -> {}  {}",
        state.src,
        state.dst,
        output::on_off(state.active, color)
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ControllerConfig,
    args: XpArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    match args.command {
        XpCommand::Set {
            src,
            dst,
            method,
            priority,
        } => {
            let xp = Crosspoint::new(src, dst);
            let method = XpMethod::from(method);
            let active = oneshot(config, method.rpc_method(), |c| async move {
                c.set_crosspoint(method, xp, priority).await
            })
            .await?;
            let state = XpState::new(&xp, active);
            let out = output::render_single(
                &global.output,
                &state,
                |s| detail(s, color),
                |s| output::on_off(s.active, false),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        XpCommand::Get { src, dst } => {
            let xp = Crosspoint::new(src, dst);
            let active = oneshot(config, "GetXpStatus", |c| async move {
                c.get_crosspoint(xp).await
            })
            .await?;
            let state = XpState::new(&xp, active);
            let out = output::render_single(
                &global.output,
                &state,
                |s| detail(s, color),
                |s| output::on_off(s.active, false),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        XpCommand::List => {
            let active = oneshot(config, "GetAllActiveXps", |c| async move {
                c.get_all_active_crosspoints().await?;
                let snapshot = c.store().crosspoints_snapshot();
                let mut active: Vec<Crosspoint> = snapshot
                    .iter()
                    .filter(|(_, on)| **on)
                    .map(|(xp, _)| *xp)
                    .collect();
                active.sort();
                Some(active)
            })
            .await?;

            let states: Vec<XpState> = active.iter().map(|xp| XpState::new(xp, true)).collect();
            let out = output::render_list(
                &global.output,
                &states,
                |s| XpRow {
                    src: s.src.clone(),
                    dst: s.dst.clone(),
                },
                |s| format!("{} {}", s.src, s.dst),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
