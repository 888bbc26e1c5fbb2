//! Logic-source command handlers.

use serde::Serialize;
use tabled::Tabled;

use rrcs_core::{ControllerConfig, LogicSource};

use crate::cli::{GlobalOpts, LogicArgs, LogicCommand};
use crate::error::CliError;
use crate::output;

use super::oneshot;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LogicRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "State")]
    state: String,
}

#[derive(Debug, Serialize)]
struct LogicState {
    object_id: u32,
    state: bool,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ControllerConfig,
    args: LogicArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    match args.command {
        LogicCommand::List => {
            let sources = oneshot(config, "GetAllLogicSources", |c| async move {
                c.get_all_logic_sources().await?;
                let table = c.store().logic_snapshot();
                Some(table.sources.values().cloned().collect::<Vec<LogicSource>>())
            })
            .await?;

            let out = output::render_list(
                &global.output,
                &sources,
                |s| LogicRow {
                    id: s.object_id,
                    name: s.name.clone(),
                    alias: s.alias.clone(),
                    state: output::on_off(s.state, color),
                },
                |s| format!("{}\t{}\t{}", s.object_id, s.name, u8::from(s.state)),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LogicCommand::Set { id, state } => {
            let state = oneshot(config, "SetLogicSource", |c| async move {
                c.set_logic_source(id, state.is_on()).await
            })
            .await?;

            let result = LogicState {
                object_id: id,
                state,
            };
            let out = output::render_single(
                &global.output,
                &result,
                |r| format!("logic source {}  {}", r.object_id, output::on_off(r.state, color)),
                |r| output::on_off(r.state, false),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
