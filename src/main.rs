//! wasm-serve - build a wasm32 example and serve it locally
//!
//! `cargo build --target wasm32-unknown-unknown`, then `wasm-bindgen
//! --target web`, then a static file server on port 8000.
//!
//! CHANGELOG:
//! - 10/16/2026 - Flags come from config overrides; a dead server exits 1
//! - 10/16/2026 - Initial CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use wasm_serve::config::{
    resolve_build, resolve_serve, BuildOverrides, ConfigFile, ServeConfig, ServeOverrides,
};
use wasm_serve::output::{format_error, OutputControls};
use wasm_serve::{pipeline, BoundServer, PipelineReport, StaticServer, SystemRunner};

/// Build a wasm32 cargo target with wasm-bindgen and serve it over HTTP.
#[derive(Parser, Debug)]
#[command(name = "wasm-serve")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Compact JSON output (no whitespace)
    #[arg(long, global = true)]
    compact: bool,

    /// Config file (default: $WASM_SERVE_CONFIG, then ./wasm-serve.json)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile and generate bindings, then exit
    Build(BuildOverrides),

    /// Serve an already-built output directory
    Serve(ServeOverrides),

    /// Build, then serve the output directory
    Run {
        #[command(flatten)]
        build: BuildOverrides,

        #[command(flatten)]
        serve: ServeOverrides,
    },
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    tracing::debug!(version = wasm_serve::VERSION, "starting wasm-serve");

    let output = OutputControls {
        json: cli.json,
        compact: cli.compact,
    };

    let result = ConfigFile::discover(cli.config.as_deref())
        .context("could not load configuration")
        .and_then(|file| {
            let file = file.unwrap_or_default();
            match cli.command {
                Command::Build(args) => cmd_build(&file, &args, &output),
                Command::Serve(args) => cmd_serve(&file, &args, &output),
                Command::Run { build, serve } => cmd_run(&file, &build, &serve, &output),
            }
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            if output.json {
                eprintln!("{}", format_error(&format!("{:#}", e)));
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::from(1)
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wasm_serve=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_build(file: &ConfigFile, args: &BuildOverrides, output: &OutputControls) -> Result<()> {
    let build = resolve_build(file, args);
    let mut report = PipelineReport::new(&build);
    let result = pipeline::run_build(&SystemRunner, &build, &mut report);
    output.print_report(&report);
    result?;
    Ok(())
}

fn cmd_serve(file: &ConfigFile, args: &ServeOverrides, output: &OutputControls) -> Result<()> {
    let serve = resolve_serve(file, args, None)?;
    let server = StaticServer::new(&serve)?;
    serve_until_killed(server, &serve, output)
}

fn cmd_run(
    file: &ConfigFile,
    build_args: &BuildOverrides,
    serve_args: &ServeOverrides,
    output: &OutputControls,
) -> Result<()> {
    let build = resolve_build(file, build_args);
    let serve = resolve_serve(file, serve_args, Some(&build))?;

    let mut report = PipelineReport::new(&build);
    let result = pipeline::build_and_prepare(&SystemRunner, &build, &serve, &mut report);
    output.print_report(&report);
    let server = result?;

    serve_until_killed(server, &serve, output)
}

fn serve_until_killed(
    server: StaticServer,
    serve: &ServeConfig,
    output: &OutputControls,
) -> Result<()> {
    let bound: BoundServer = server.bind()?;
    let addr = bound
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|| serve.addr());

    if output.json {
        println!(
            "{}",
            output.emit(&serde_json::json!({
                "serving": addr,
                "root": bound.root(),
            }))
        );
    } else {
        println!("Serving HTTP on {} (http://{}/) ...", addr, addr);
    }

    bound.serve_forever().context("server stopped")?;
    Ok(())
}
