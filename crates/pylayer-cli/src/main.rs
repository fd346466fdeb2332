use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use pylayer_core::{
    CommandContext, ExecutionOutcome, GlobalOptions, LayerRequest, SharedEffects, SystemEffects,
};
use serde_json::json;

mod cli;
mod output;
mod style;

use cli::LayerCli;
use output::{emit_output, OutputOptions};

const LIBRARY_PROMPT: &str = "Please enter the pip library names (separated by spaces): ";

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = LayerCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };

    let libraries = match &cli.libraries {
        Some(libraries) => libraries.clone(),
        None if cli.requirements_file.is_none() => prompt_for_libraries()?,
        None => Vec::new(),
    };
    let request = LayerRequest {
        libraries,
        requirements_file: cli.requirements_file.clone(),
        layer_name: cli.layer_name.clone(),
        runtime: cli.runtime.clone(),
        region: cli.region.clone(),
        upload: !cli.no_upload,
        out_dir: cli.out.clone(),
    };

    let effects: SharedEffects = Arc::new(SystemEffects::new());
    let ctx = CommandContext::new(&global, effects);
    let outcome = match pylayer_core::create_layer(&ctx, &request) {
        Ok(outcome) => outcome,
        Err(err) if cli.json => ExecutionOutcome::failure(
            format!("{err:#}"),
            json!({ "layer": request.layer_name }),
        ),
        Err(err) => return Err(eyre!("{err:?}")),
    };

    let opts = OutputOptions {
        quiet: cli.quiet,
        json: cli.json,
        no_color: cli.no_color,
    };
    let code = emit_output(&opts, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("pylayer={level},pylayer_core={level},pylayer_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Reads one line of whitespace-separated names; a blank line or EOF yields none.
fn prompt_for_libraries() -> Result<Vec<String>> {
    let mut stderr = io::stderr();
    write!(stderr, "{LIBRARY_PROMPT}")?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.split_whitespace().map(ToString::to_string).collect())
}
