use clap::{Parser, Subcommand};
use deckmix::CrossfadeMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deckmix", version, about = "Beat-synchronized two-deck mixing engine")]
pub struct Cli {
    /// Config file (defaults to ./deckmix.toml or the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Estimate BPM, beat grid and downbeat for audio files
    Analyze {
        /// Input audio files (WAV, MP3, FLAC, OGG)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Print full analyses as JSON
        #[arg(long)]
        json: bool,
    },

    /// Simulate a transition between two tracks and print the control samples
    Mix {
        /// Outgoing track
        from: PathBuf,

        /// Incoming track
        to: PathBuf,

        /// Transition length in beats of the outgoing track
        #[arg(short, long, default_value_t = 16)]
        beats: u32,

        /// Playback position of the outgoing track when the mix is requested (seconds)
        #[arg(short, long, default_value_t = 0.0)]
        position: f64,

        /// Tick interval in milliseconds
        #[arg(long, default_value_t = 50)]
        tick_ms: u64,

        /// Crossfade mode: volume or eq
        #[arg(long, default_value_t = CrossfadeMode::Volume)]
        mode: CrossfadeMode,

        /// Write samples to this JSON file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
