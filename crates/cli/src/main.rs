mod commands;
mod logging;
mod payload;

use std::fs;
use std::io::{self, Read};

use anyhow::{Context as _, Result};
use clap::Parser;
use wl_bridge::Request;
use wl_host::{Host, HostConfig};
use wl_js_rt::{Context, Runtime, ValueKind};

use crate::commands::{Cli, Command, EvalCommandOpts, InvokeCommandOpts};

fn main() -> Result<()> {
    let args = Cli::parse();
    logging::init(args.verbose);

    match &args.command {
        Command::Eval(opts) => eval(opts),
        Command::Invoke(opts) => invoke(opts),
    }
}

fn eval(opts: &EvalCommandOpts) -> Result<()> {
    let (name, code) = match (&opts.code, &opts.input) {
        (Some(code), _) => ("<eval>".to_string(), code.clone()),
        (None, Some(path)) => (
            path.display().to_string(),
            fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        (None, None) => {
            let mut code = String::new();
            io::stdin()
                .read_to_string(&mut code)
                .context("failed to read script from stdin")?;
            ("<stdin>".to_string(), code)
        }
    };

    let rt = Runtime::new()?;
    let ctx = Context::new(&rt)?;
    let value = ctx.eval_named(&name, &code)?;
    ctx.execute_pending()?;

    if value.kind() != ValueKind::Undefined {
        println!("{}", value.to_string_lossy());
    }
    Ok(())
}

fn invoke(opts: &InvokeCommandOpts) -> Result<()> {
    let mut config = HostConfig::default();
    if let Some(export) = &opts.export {
        config.export = export.clone();
    }
    config.fuel = opts.fuel;

    let host = Host::new(config)?;
    let plugin = host
        .load_file(&opts.plugin)
        .with_context(|| format!("failed to load {}", opts.plugin.display()))?;

    let mut builder = Request::build(opts.endpoint.as_str());
    builder.fire_and_forget(opts.fire_and_forget);
    if let Some(json) = &opts.payload {
        builder.raw_payload(payload::from_json(json)?);
    }
    let request = builder.build();

    tracing::info!(id = %request.id(), endpoint = request.endpoint(), "sending request");
    match plugin.invoke(&request)? {
        Some(response) => {
            let payload = response.into_payload()?;
            println!("{}", payload::to_json(&payload)?);
        }
        None => tracing::info!("fire-and-forget request delivered"),
    }
    Ok(())
}
