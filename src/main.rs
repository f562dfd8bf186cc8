mod args;
mod tally;

use clap::Parser;
use log::{debug, LevelFilter};

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
    debug!("args: {:?}", args);

    if let Err(e) = tally::run_tally_from_args(&args) {
        eprintln!("An error occured: {}", e);
        std::process::exit(1);
    }
}
