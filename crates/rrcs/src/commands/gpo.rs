//! GP output command handlers.

use serde::Serialize;

use rrcs_core::ControllerConfig;

use crate::cli::{GlobalOpts, GpoArgs, GpoCommand};
use crate::error::CliError;
use crate::output;

use super::oneshot;

#[derive(Debug, Serialize)]
struct GpoState {
    addr: String,
    state: bool,
}

pub async fn handle(
    config: ControllerConfig,
    args: GpoArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (addr, state) = match args.command {
        GpoCommand::Set { addr, state } => {
            let state = oneshot(config, "SetGPOutput", |c| async move {
                c.set_gp_output(addr, state.is_on()).await
            })
            .await?;
            (addr, state)
        }
        GpoCommand::Get { addr } => {
            let state = oneshot(config, "GetGPOutput", |c| async move {
                c.get_gp_output(addr).await
            })
            .await?;
            (addr, state)
        }
    };

    let color = output::should_color(&global.color);
    let result = GpoState {
        addr: addr.to_string(),
        state,
    };
    let out = output::render_single(
        &global.output,
        &result,
        |r| format!("gpo {}  {}", r.addr, output::on_off(r.state, color)),
        |r| output::on_off(r.state, false),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
