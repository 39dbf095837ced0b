/// Splits every scan of a directory into two overlapping partitions
use scan_preprocessing::batch::{BatchOptions, split_batch};
use scan_preprocessing::cli::{init_logging, parse_split_args, resolve_config};
use std::env;

fn main() {
    init_logging();
    if let Err(err) = run() {
        if err.is_guard() {
            eprintln!("Apparently, you have split the preprocessed data previously! Please check.");
        }
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> scan_preprocessing::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let args = parse_split_args(&args)?;
    let config = resolve_config(args.config.as_deref())?;

    let report = split_batch(&args.dir, &config.split, &BatchOptions::default())?;
    report.print_summary();
    Ok(())
}
