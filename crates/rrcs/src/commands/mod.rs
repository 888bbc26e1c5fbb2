//! Command dispatch: bridges CLI args -> controller operations -> output.

pub mod config_cmd;
pub mod gpo;
pub mod key;
pub mod logic;
pub mod port;
pub mod replay;
pub mod status;
pub mod watch;
pub mod xp;

use std::future::Future;

use rrcs_core::{Controller, ControllerConfig, CoreError};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: ControllerConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Xp(args) => xp::handle(config, args, global).await,
        Command::Port(args) => port::handle(config, args, global).await,
        Command::Logic(args) => logic::handle(config, args, global).await,
        Command::Gpo(args) => gpo::handle(config, args, global).await,
        Command::Key(args) => key::handle(config, args, global).await,
        Command::Status => status::handle(config, global).await,
        Command::Watch(args) => watch::handle(config, args, global).await,
        Command::Replay(args) => replay::handle(config, args, global).await,
        // handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

/// Run one operation on a short-lived connection. `None` from the
/// operation becomes [`CliError::Rejected`].
pub(crate) async fn oneshot<F, Fut, T>(
    config: ControllerConfig,
    operation: &str,
    f: F,
) -> Result<T, CliError>
where
    F: FnOnce(Controller) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let result = Controller::oneshot_quiet(config, |controller| async move {
        Ok::<_, CoreError>(f(controller).await)
    })
    .await?;
    result.ok_or_else(|| CliError::rejected(operation))
}
