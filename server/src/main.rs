use std::path::PathBuf;

use clap::Parser;
use server::init::{self, HostConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Headless terrain sculpt and water simulation host", long_about = None)]
struct Args {
    /// RON scenario of timed sculpt/water actions
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// RON simulation settings (domain and water parameters)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Stop after this many frames. Runs forever when omitted.
    #[arg(short, long)]
    frames: Option<u64>,

    /// Directory snapshots are written to
    #[arg(short, long, default_value = "snapshots")]
    output: PathBuf,

    /// Write a snapshot every N frames (0 disables periodic snapshots)
    #[arg(long, default_value_t = 0)]
    snapshot_every: u64,

    /// Log statistics every N frames (0 disables them)
    #[arg(long, default_value_t = 60)]
    stats_every: u64,
}

fn main() {
    let args = Args::parse();

    if args.frames == Some(0) {
        eprintln!("Error: --frames must be at least 1.");
        std::process::exit(1);
    }

    let exit = init::init(HostConfig {
        scenario_path: args.scenario,
        settings_path: args.settings,
        frames: args.frames,
        output_dir: args.output,
        snapshot_every: args.snapshot_every,
        stats_every: args.stats_every,
    });

    if exit.is_error() {
        std::process::exit(1);
    }
}
