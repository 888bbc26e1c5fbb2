//! Clap derive structures for the `rrcs` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use rrcs_core::{
    Address, GpioAddress, KeyLabelMethod, XpMethod, resolve_address, resolve_gpio_address,
};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// rrcs -- drive a Riedel RRCS server from the command line
#[derive(Debug, Parser)]
#[command(
    name = "rrcs",
    version,
    about = "Control Riedel intercom matrices through an RRCS server",
    long_about = "Sets and reads crosspoints, logic sources, GP outputs and panel keys\n\
        through the RRCS XML-RPC interface. `watch` keeps a live mirror and\n\
        prints changes as the server pushes them.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "RRCS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// RRCS server host (overrides profile)
    #[arg(long, env = "RRCS_HOST", global = true)]
    pub host: Option<String>,

    /// RRCS server port (overrides profile)
    #[arg(long, env = "RRCS_PORT", global = true)]
    pub port: Option<u16>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "RRCS_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Per-call timeout in seconds (overrides profile)
    #[arg(long, env = "RRCS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set, kill and list crosspoints
    Xp(XpArgs),

    /// List matrix ports
    Port(PortArgs),

    /// List and set logic sources
    Logic(LogicArgs),

    /// Set and read GP outputs
    Gpo(GpoArgs),

    /// Press, lock and label panel keys
    Key(KeyArgs),

    /// Probe every configured link and show its health
    Status,

    /// Stay connected and print changes pushed by the server
    Watch(WatchArgs),

    /// Run the actions of a transcript written by `watch --record`
    Replay(ReplayArgs),

    /// Inspect the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared value types ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Parse a dotted, one-based `net.node.port`.
pub fn parse_address(raw: &str) -> Result<Address, String> {
    resolve_address(raw).ok_or_else(|| format!("'{raw}' is not a valid net.node.port address"))
}

/// Parse a dotted, one-based `node.port`.
pub fn parse_gpio(raw: &str) -> Result<GpioAddress, String> {
    resolve_gpio_address(raw).ok_or_else(|| format!("'{raw}' is not a valid node.port address"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CROSSPOINTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct XpArgs {
    #[command(subcommand)]
    pub command: XpCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum XpMethodArg {
    Set,
    Prio,
    Destruct,
    Kill,
}

impl From<XpMethodArg> for XpMethod {
    fn from(arg: XpMethodArg) -> Self {
        match arg {
            XpMethodArg::Set => Self::Set,
            XpMethodArg::Prio => Self::SetPrio,
            XpMethodArg::Destruct => Self::SetDestruct,
            XpMethodArg::Kill => Self::Kill,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum XpCommand {
    /// Set (or kill) a crosspoint
    Set {
        /// Source, net.node.port
        #[arg(value_parser = parse_address)]
        src: Address,
        /// Destination, net.node.port
        #[arg(value_parser = parse_address)]
        dst: Address,
        #[arg(long, short = 'm', default_value = "prio")]
        method: XpMethodArg,
        /// Priority for prio/destruct (default 1)
        #[arg(long)]
        priority: Option<u32>,
    },

    /// Read one crosspoint
    Get {
        #[arg(value_parser = parse_address)]
        src: Address,
        #[arg(value_parser = parse_address)]
        dst: Address,
    },

    /// List all active crosspoints
    #[command(alias = "ls")]
    List,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PORTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PortArgs {
    #[command(subcommand)]
    pub command: PortCommand,
}

#[derive(Debug, Subcommand)]
pub enum PortCommand {
    /// List ports with their direction
    #[command(alias = "ls")]
    List,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOGIC SOURCES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LogicArgs {
    #[command(subcommand)]
    pub command: LogicCommand,
}

#[derive(Debug, Subcommand)]
pub enum LogicCommand {
    /// List logic sources and their state
    #[command(alias = "ls")]
    List,

    /// Set a logic source
    Set {
        /// Object id
        id: u32,
        state: Switch,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  GP OUTPUTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct GpoArgs {
    #[command(subcommand)]
    pub command: GpoCommand,
}

#[derive(Debug, Subcommand)]
pub enum GpoCommand {
    /// Set a GP output
    Set {
        /// node.port
        #[arg(value_parser = parse_gpio)]
        addr: GpioAddress,
        state: Switch,
    },

    /// Read a GP output
    Get {
        #[arg(value_parser = parse_gpio)]
        addr: GpioAddress,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PANEL KEYS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub command: KeyCommand,
}

/// Which key on which panel.
#[derive(Debug, Args)]
pub struct KeyTarget {
    /// Panel port, net.node.port
    #[arg(value_parser = parse_address)]
    pub panel: Address,

    /// Key number
    pub key: u32,

    #[arg(long, default_value = "0")]
    pub page: u32,

    #[arg(long, default_value = "0")]
    pub expansion_panel: u32,

    /// Address an input-side key
    #[arg(long)]
    pub input: bool,

    /// Address a virtual key
    #[arg(long = "virtual")]
    pub is_virtual: bool,
}

#[derive(Debug, Subcommand)]
pub enum KeyCommand {
    /// Press (or release) a key
    Press {
        #[command(flatten)]
        target: KeyTarget,
        /// Send a release instead of a press
        #[arg(long)]
        release: bool,
        #[arg(long, default_value = "0")]
        trigger: u32,
        /// Pool port, -1..=32
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        pool: i32,
    },

    /// Lock (or unlock) a key
    Lock {
        #[command(flatten)]
        target: KeyTarget,
        #[arg(long)]
        unlock: bool,
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        pool: i32,
    },

    /// Set or clear a key label and marker
    Label {
        #[command(flatten)]
        target: KeyTarget,
        #[arg(long, short = 'm', value_parser = parse_label_method, default_value = "setKeyLabel")]
        method: KeyLabelMethod,
        /// Up to eight characters
        #[arg(long)]
        label: Option<String>,
        /// 1..=128
        #[arg(long)]
        marker: Option<i64>,
    },
}

fn parse_label_method(raw: &str) -> Result<KeyLabelMethod, String> {
    raw.parse().map_err(|_| {
        format!(
            "'{raw}' is not one of setKeyLabel, setKeyMarker, setKeyLabelAndMarker, \
             clearKeyLabel, clearKeyMarker, clearKeyLabelAndMarker"
        )
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Print a replayable transcript entry for every change the server pushes
    #[arg(long)]
    pub record: bool,

    /// Address announced to the server for notifications (overrides profile)
    #[arg(long)]
    pub local_host: Option<String>,

    /// Local notification port (overrides profile)
    #[arg(long)]
    pub local_port: Option<u16>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REPLAY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Transcript file, one JSON entry per line (`-` reads stdin)
    pub file: PathBuf,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn addresses_parse_one_based() {
        assert_eq!(parse_address("1.2.3"), Ok(Address::new(1, 2, 2)));
        assert!(parse_address("1.2.0").is_err());
        assert_eq!(parse_gpio("4.1"), Ok(GpioAddress::new(4, 0)));
    }

    #[test]
    fn label_method_is_camel_case() {
        assert_eq!(
            parse_label_method("setKeyLabelAndMarker"),
            Ok(KeyLabelMethod::SetKeyLabelAndMarker)
        );
        assert!(parse_label_method("SetKeyLabel").is_err());
    }
}
