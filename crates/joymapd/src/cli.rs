use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Debug, Subcommand, PartialEq)]
pub(crate) enum Command {
    /// Replay a YAML event script through the mapping engine.
    Replay {
        /// The script to replay
        script: PathBuf,
    },
    /// Show the stored device templates.
    Templates {
        /// Remove every stored template
        #[arg(long)]
        clear: bool,
    },
    /// Map live input devices in the foreground.
    #[cfg(feature = "sdl2")]
    Run,
}

/// Maps joysticks, keyboards and touch screens onto logical players.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Turn debugging information on
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// The directory containing joymap.yaml and stored templates
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// The command to run
    #[clap(subcommand)]
    pub command: Command,
}
