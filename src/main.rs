// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! `medai-inference` command-line tool.

use std::process;

use clap::Parser;

use medai_inference::cli::args::{Cli, Commands};
use medai_inference::cli::commands::{run_estimate, run_poses, run_reference};
use medai_inference::error;

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Estimate(args) => run_estimate(args),
        Commands::Reference(args) => run_reference(args),
        Commands::Poses => {
            run_poses();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("{err}");
        process::exit(1);
    }
}
