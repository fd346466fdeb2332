use std::path::PathBuf;

use clap::{value_parser, ArgAction, Parser};
use pylayer_core::{DEFAULT_REGION, DEFAULT_RUNTIME};

pub const PYLAYER_AFTER_HELP: &str = concat!(
    "Examples:\n",
    "  pylayer --libraries requests boto3 --layer-name http-tools\n",
    "  pylayer --requirements-file requirements.txt --layer-name deps --no-upload --out dist\n",
    "  pylayer --layer-name scratch            # prompts for library names\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "pylayer",
    author,
    version,
    about = "Install pip libraries into python/, zip them, and publish an AWS Lambda layer",
    after_help = PYLAYER_AFTER_HELP
)]
#[allow(clippy::struct_excessive_bools)]
pub struct LayerCli {
    #[arg(
        long,
        num_args = 1..,
        value_name = "NAME",
        help = "Pip libraries to install, one install pass each (prompted for when omitted)"
    )]
    pub libraries: Option<Vec<String>>,
    #[arg(
        long,
        value_name = "NAME",
        help = "Layer name; also the archive's base file name"
    )]
    pub layer_name: String,
    #[arg(
        long,
        value_name = "ID",
        default_value = DEFAULT_RUNTIME,
        help = "Compatible runtime declared on the published layer"
    )]
    pub runtime: String,
    #[arg(
        long,
        value_name = "REGION",
        default_value = DEFAULT_REGION,
        help = "AWS region to publish into"
    )]
    pub region: String,
    #[arg(long, help = "Build the archive but skip publishing it")]
    pub no_upload: bool,
    #[arg(
        long,
        value_name = "PATH",
        value_parser = value_parser!(PathBuf),
        help = "Requirements file installed in one extra pass"
    )]
    pub requirements_file: Option<PathBuf>,
    #[arg(
        long,
        value_name = "DIR",
        value_parser = value_parser!(PathBuf),
        help = "Where the archive is kept with --no-upload (default: current directory)"
    )]
    pub out: Option<PathBuf>,
    #[arg(short, long, help = "Suppress human output (errors still print to stderr)")]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q")]
    pub trace: bool,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes")]
    pub json: bool,
    #[arg(long, help = "Disable colored human output")]
    pub no_color: bool,
}
