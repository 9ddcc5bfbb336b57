use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "wl",
    version,
    about = "Embedded QuickJS runtime and WebAssembly plugin host",
    long_about = None
)]
pub struct Cli {
    /// Raises log verbosity, repeat for more (`WL_LOG` takes precedence).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluates JavaScript and prints the completion value.
    Eval(EvalCommandOpts),
    /// Sends a request to an endpoint of a WebAssembly plugin.
    #[command(arg_required_else_help = true)]
    Invoke(InvokeCommandOpts),
}

#[derive(Debug, Parser)]
pub struct EvalCommandOpts {
    #[arg(value_name = "FILE", conflicts_with = "code")]
    /// Path of the script to run. Reads stdin when neither a file nor
    /// `-e` is given.
    pub input: Option<PathBuf>,

    #[arg(short = 'e', long = "eval", value_name = "CODE")]
    /// Source code to run instead of a file.
    pub code: Option<String>,
}

#[derive(Debug, Parser)]
pub struct InvokeCommandOpts {
    #[arg(value_name = "PLUGIN")]
    /// Path of the plugin, either `.wasm` or `.wat`.
    pub plugin: PathBuf,

    #[arg(value_name = "ENDPOINT")]
    /// Name of the endpoint to call.
    pub endpoint: String,

    #[arg(long, value_name = "JSON")]
    /// Request payload as JSON. Defaults to `null`.
    pub payload: Option<String>,

    #[arg(long)]
    /// Does not wait for a response.
    pub fire_and_forget: bool,

    #[arg(long, value_name = "NAME")]
    /// Overrides the exported handler function.
    pub export: Option<String>,

    #[arg(long, value_name = "N")]
    /// Caps the fuel the plugin may burn.
    pub fuel: Option<u64>,
}
