//! Panel key command handlers.

use rrcs_core::{ControllerConfig, KeyLabelOp, KeyRef};

use crate::cli::{GlobalOpts, KeyArgs, KeyCommand, KeyTarget};
use crate::error::CliError;
use crate::output;

use super::oneshot;

impl From<&KeyTarget> for KeyRef {
    fn from(t: &KeyTarget) -> Self {
        Self {
            panel: t.panel,
            is_input: t.input,
            page: t.page,
            expansion_panel: t.expansion_panel,
            key: t.key,
            is_virtual: t.is_virtual,
        }
    }
}

pub async fn handle(
    config: ControllerConfig,
    args: KeyArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        KeyCommand::Press {
            target,
            release,
            trigger,
            pool,
        } => {
            let key = KeyRef::from(&target);
            let payload = oneshot(config, "PressKeyEx", |c| async move {
                c.press_key(key, !release, trigger, pool).await
            })
            .await?;
            let out = output::render_single(
                &global.output,
                &payload,
                |p| format!("{p:?}"),
                |p| format!("{p:?}"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        KeyCommand::Lock {
            target,
            unlock,
            pool,
        } => {
            let key = KeyRef::from(&target);
            oneshot(config, "LockKey", |c| async move {
                c.lock_key(key, !unlock, pool).await
            })
            .await?;
            if !global.quiet {
                eprintln!("Key {}", if unlock { "unlocked" } else { "locked" });
            }
            Ok(())
        }

        KeyCommand::Label {
            target,
            method,
            label,
            marker,
        } => {
            // validate before connecting; an invalid label is never sent
            let op = KeyLabelOp::build(method, label.as_deref(), marker).map_err(|e| {
                CliError::Validation {
                    field: "label".into(),
                    reason: e.to_string(),
                }
            })?;
            let key = KeyRef::from(&target);
            oneshot(config, method.rpc_method(), |c| async move {
                c.label_and_marker(key, op).await
            })
            .await?;
            if !global.quiet {
                eprintln!("{method} applied");
            }
            Ok(())
        }
    }
}
