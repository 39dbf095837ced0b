/// Batch downsampling and outlier removal over a directory of scans
use scan_preprocessing::batch::{BatchOptions, preprocess_batch};
use scan_preprocessing::cli::{init_logging, parse_preprocess_args, resolve_config};
use std::env;

fn main() {
    init_logging();
    if let Err(err) = run() {
        if err.is_guard() {
            eprintln!("Apparently, you have preprocessed the input data previously! Please check.");
        }
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> scan_preprocessing::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let args = parse_preprocess_args(&args)?;
    let config = resolve_config(args.config.as_deref())?;

    let report = preprocess_batch(
        &args.input_dir,
        &args.output_dir,
        &config.preprocess,
        &BatchOptions::default(),
    )?;
    report.print_summary();
    Ok(())
}
