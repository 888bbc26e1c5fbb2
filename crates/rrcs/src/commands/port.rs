//! Port command handlers.

use tabled::Tabled;

use rrcs_core::{ControllerConfig, Port};

use crate::cli::{GlobalOpts, PortArgs, PortCommand};
use crate::error::CliError;
use crate::output;

use super::oneshot;

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Direction")]
    direction: &'static str,
}

fn direction(port: &Port) -> &'static str {
    match (port.input, port.output) {
        (true, true) => "in/out",
        (true, false) => "in",
        (false, true) => "out",
        (false, false) => "-",
    }
}

pub async fn handle(
    config: ControllerConfig,
    args: PortArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PortCommand::List => {
            let ports = oneshot(config, "GetAllPorts", |c| async move {
                c.get_all_ports().await?;
                Some(c.store().ports().ports.clone())
            })
            .await?;

            let out = output::render_list(
                &global.output,
                &ports,
                |p| PortRow {
                    address: p.address.to_string(),
                    label: p.label.clone(),
                    name: p.name.clone(),
                    direction: direction(p),
                },
                |p| format!("{}\t{}\t{}", p.address, p.title(), direction(p)),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
