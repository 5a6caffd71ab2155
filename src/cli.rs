use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::keymap::Layout;

#[derive(Parser)]
#[command(name = "keyplay", about = "Play midicsv note events on a computer keyboard")]
pub struct Cli {
    /// Settings file (.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Key layout (default: from config, else piano)
    #[arg(long, global = true, value_enum)]
    pub layout: Option<Layout>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the pitch to key mapping
    Mapping,
    /// Report which notes of a song can be played
    Analyze {
        /// Path to a midicsv export
        csv: PathBuf,
    },
    /// List the keys a song presses, without timing
    Keys {
        /// Path to a midicsv export
        csv: PathBuf,
    },
    /// Play a song in real time
    Play(PlayArgs),
}

#[derive(clap::Args)]
pub struct PlayArgs {
    /// Path to a midicsv export
    pub csv: PathBuf,

    /// Playback speed multiplier (2.0 = twice as fast)
    #[arg(long)]
    pub tempo: Option<f64>,

    /// Tap keys instead of holding them
    #[arg(long, conflicts_with = "hold")]
    pub tap: bool,

    /// Hold keys for the note duration
    #[arg(long)]
    pub hold: bool,

    /// Skip the mapping and analysis reports
    #[arg(long)]
    pub quiet: bool,
}

impl PlayArgs {
    /// Tap mode requested on the command line, if any.
    pub fn tap_override(&self) -> Option<bool> {
        match (self.tap, self.hold) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
