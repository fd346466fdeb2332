use atty::Stream;
use color_eyre::Result;
use pylayer_core::{format_bytes, ExecutionOutcome};
use serde_json::Value;

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

/// Prints the outcome and returns the process exit code.
pub fn emit_output(opts: &OutputOptions, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.status.exit_code();
    let style = Style::new(opts.no_color, atty::is(Stream::Stdout));

    if opts.json {
        let payload = pylayer_core::to_json_response(outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !opts.quiet {
        if outcome.is_passthrough() {
            println!("{}", outcome.message);
        } else {
            println!("{}", style.status(&outcome.status, &outcome.message));
            if let Some(line) = archive_line(&outcome.details) {
                println!("{}", style.info(&line));
            }
        }
    }

    Ok(code)
}

fn archive_line(details: &Value) -> Option<String> {
    let archive = details.get("archive")?.as_object()?;
    let entries = archive.get("entries")?.as_u64()?;
    let bytes = archive.get("bytes")?.as_u64()?;
    let sha256 = archive.get("sha256")?.as_str()?;
    let noun = if entries == 1 { "file" } else { "files" };
    Some(format!(
        "  {entries} {noun}, {}, sha256 {}",
        format_bytes(bytes),
        &sha256[..sha256.len().min(12)]
    ))
}
