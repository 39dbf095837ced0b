/// Converts JSON box annotations into scaled per-frame text labels
use scan_preprocessing::batch::{BatchOptions, convert_labels};
use scan_preprocessing::cli::{init_logging, parse_label_args, resolve_convert_config};
use std::env;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> scan_preprocessing::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let args = parse_label_args(&args)?;
    let config = resolve_convert_config(args.scale, args.config.as_deref())?;

    let report = convert_labels(
        &args.input_dir,
        &args.output_dir,
        config.scale_factor,
        &BatchOptions::default(),
    )?;
    report.print_summary();
    println!("Text files created successfully.");
    Ok(())
}
